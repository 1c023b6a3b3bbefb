//! redisrqs CLI — operator interface to the queue.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

use redisrqs::config::Config;
use redisrqs::consumer::{self, FailurePolicy};
use redisrqs::engine::Engine;
use redisrqs::model::MessageId;
use redisrqs::reaper;
use redisrqs::store::{QueueStore, RedisStore};

#[derive(Parser)]
#[command(name = "redisrqs", about = "Reliable work queue on Redis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the consumer loop and reaper
    Serve {
        /// Retry dequeue failures after this many ms instead of exiting
        #[arg(long)]
        retry_backoff_ms: Option<u64>,
    },
    /// Enqueue a message and print its id
    Enqueue {
        topic: String,
        message: String,
    },
    /// Release (acknowledge) a claimed message
    Release {
        id: MessageId,
    },
    /// Return a claimed message to the back of the queue
    Requeue {
        id: MessageId,
    },
    /// Print pending/working/values sizes
    Stats,
    /// Clear all three queue structures
    Drain,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let store: Arc<dyn QueueStore> =
        Arc::new(RedisStore::connect(config.redis_url.expose_secret()).await?);
    let engine = Arc::new(Engine::new(Arc::clone(&store)));

    match cli.command {
        Command::Serve { retry_backoff_ms } => {
            let policy = match retry_backoff_ms {
                Some(ms) => FailurePolicy::Retry {
                    backoff: Duration::from_millis(ms),
                },
                None => FailurePolicy::Fatal,
            };
            let reaper = reaper::spawn(
                Arc::clone(&store),
                Arc::clone(engine.bus()),
                config.sweep_interval,
            );
            let mut consumer = consumer::spawn(Arc::clone(&engine), policy);

            let loop_result = tokio::select! {
                _ = tokio::signal::ctrl_c() => None,
                result = consumer.wait() => Some(result),
            };
            match loop_result {
                None => {
                    tracing::info!("interrupt received, shutting down");
                    consumer.shutdown();
                    reaper.shutdown();
                    consumer.wait().await?;
                }
                // Fail-fast: a fatal dequeue error exits the process.
                Some(result) => {
                    reaper.shutdown();
                    result?;
                }
            }
            Ok(())
        }
        Command::Enqueue { topic, message } => {
            let id = engine.enqueue(&topic, &message).await?;
            println!("{id}");
            Ok(())
        }
        Command::Release { id } => {
            engine.release(id).await?;
            println!("{id}");
            Ok(())
        }
        Command::Requeue { id } => {
            engine.requeue(id).await?;
            println!("{id}");
            Ok(())
        }
        Command::Stats => {
            println!("pending: {}", engine.pending_size().await?);
            println!("working: {}", engine.working_size().await?);
            println!("values:  {}", engine.values_size().await?);
            Ok(())
        }
        Command::Drain => {
            engine.drain_all().await?;
            Ok(())
        }
    }
}

use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use taskmill_core::{TaskArgs, TaskKwargs};
use taskmill_server::{Worker, WorkerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "taskmill")]
#[command(about = "Minimal distributed task queue server", long_about = None)]
struct Args {
    /// Address to bind the request socket to
    #[arg(short, long)]
    bind: Option<String>,

    /// Number of worker threads
    #[arg(short, long)]
    threads: Option<usize>,

    /// Result expiry in seconds
    #[arg(long)]
    expiry_secs: Option<u64>,

    /// Path to configuration file
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        WorkerConfig::from_file(config_path)?
    } else {
        WorkerConfig::default()
    };

    // Override with CLI args
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(expiry_secs) = args.expiry_secs {
        config.result_expiry_secs = expiry_secs;
    }

    let worker = Worker::bind(config).await?;

    // Built-in callables, mostly useful for smoke testing a deployment
    worker.register(
        "echo",
        |args: &TaskArgs, kwargs: &TaskKwargs| -> Result<serde_json::Value, String> {
            Ok(json!({ "args": args, "kwargs": kwargs }))
        },
    );
    worker.register(
        "sleep",
        |args: &TaskArgs, _: &TaskKwargs| -> Result<serde_json::Value, String> {
            let millis = args
                .first()
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(1000);
            std::thread::sleep(std::time::Duration::from_millis(millis));
            Ok(json!(millis))
        },
    );

    let worker = Arc::new(worker);

    // Handle shutdown signal
    let shutdown_worker = worker.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("received shutdown signal");
        shutdown_worker.shutdown();
    });

    worker.run().await?;

    Ok(())
}

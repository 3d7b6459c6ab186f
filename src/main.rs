//! Fleet status inspector
//!
//! Connects to the broker, lists the registered workers, and prints the
//! free/busy slot counts for every browser type. Useful for checking pool
//! health before pointing a batch of clients at it.
//!
//! Environment variables: the `APIARY_*` set understood by `Config`, plus
//! `RUST_LOG` for log filtering. An optional first argument names a TOML
//! config file.

use std::sync::Arc;

use apiary::broker::{Broker, RespBroker};
use apiary::pool::{keys, BrowserType};
use apiary::Config;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

const BROWSER_TYPES: [BrowserType; 3] =
    [BrowserType::Chrome, BrowserType::Firefox, BrowserType::Webkit];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing - respect RUST_LOG environment variable
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    info!("Apiary status v{}", apiary::VERSION);

    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)?,
        None => Config::from_env()?,
    };
    info!("Using broker at {}", config.broker_addr);

    let broker = Arc::new(RespBroker::from_config(&config)?);

    if let Err(e) = broker.ping().await {
        error!("Broker is not reachable: {}", e);
        return Err(e.into());
    }

    let mut workers = broker.set_members(&keys::registry()).await?;
    workers.sort();

    if workers.is_empty() {
        println!("No workers registered");
        return Ok(());
    }

    println!("{} worker(s) registered", workers.len());
    for worker in &workers {
        println!("{}", worker);
        for browser_type in BROWSER_TYPES {
            let free = broker.set_len(&keys::free(worker, browser_type)).await?;
            let busy = broker.set_len(&keys::busy(worker, browser_type)).await?;
            if free + busy > 0 {
                println!("  {:<8} {} free / {} busy", browser_type.to_string(), free, busy);
            }
        }
    }

    Ok(())
}

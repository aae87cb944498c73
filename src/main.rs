use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::info;

use fiyat_watcher::config::ProductsFile;
use fiyat_watcher::{AppConfig, Engine};

#[derive(Parser)]
#[command(name = "fiyat-watcher", about = "Price drop monitor for product pages")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Override the poll interval in seconds.
    #[arg(long, global = true)]
    interval: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the monitoring loop (the default).
    Run,
    /// Run a single sweep over all products, then exit.
    Once,
    /// Start tracking a product URL.
    Add {
        url: String,
        threshold: Decimal,
        #[arg(long)]
        name: Option<String>,
    },
    /// Stop tracking a product URL and delete its history.
    Remove { url: String },
    /// Change a product's threshold.
    SetThreshold { url: String, threshold: Decimal },
    /// List tracked products with their latest price.
    List,
    /// Print the recorded price history for a product.
    History { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fiyat_watcher=debug".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(interval) = cli.interval {
        config.scheduler.poll_interval_secs = interval;
        config.validate()?;
    }

    if let Some(parent) = db_parent_dir(&config.store.database_url) {
        std::fs::create_dir_all(parent)?;
    }

    let engine = Engine::from_config(&config).await?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            sync_products_file(&engine, &config).await?;
            info!("Starting Fiyat Watcher...");
            tokio::select! {
                _ = engine.run() => {}
                _ = tokio::signal::ctrl_c() => {}
            }
            info!("Shutting down...");
        }
        Command::Once => {
            sync_products_file(&engine, &config).await?;
            let outcomes = engine.run_once().await;
            for outcome in &outcomes {
                println!(
                    "{}  status={}  price={}  notified={}",
                    outcome.url,
                    outcome.status.as_str(),
                    outcome
                        .price
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    outcome.notified,
                );
            }
        }
        Command::Add {
            url,
            threshold,
            name,
        } => {
            let product = engine.add_product(&url, threshold, name).await?;
            println!("tracking {} (threshold ₺{})", product.url, product.threshold);
        }
        Command::Remove { url } => {
            engine.remove_product(&url).await?;
            println!("removed {url}");
        }
        Command::SetThreshold { url, threshold } => {
            engine.update_threshold(&url, threshold).await?;
            println!("threshold for {url} is now ₺{threshold}");
        }
        Command::List => {
            for product in engine.list_products().await? {
                println!(
                    "{}  threshold=₺{}  last={}  status={}",
                    product.url,
                    product.threshold,
                    product
                        .last_price
                        .map(|p| format!("₺{p}"))
                        .unwrap_or_else(|| "-".to_string()),
                    product.last_status.as_str(),
                );
            }
        }
        Command::History { url } => {
            for sample in engine.get_history(&url).await? {
                println!("{}  ₺{}", sample.timestamp.to_rfc3339(), sample.price);
            }
        }
    }

    Ok(())
}

/// Merge the JSON products file into the store before polling starts.
async fn sync_products_file(engine: &Engine, config: &AppConfig) -> Result<()> {
    let file = ProductsFile::load(&config.store.products_file)?;
    let merged = engine.store().merge_config(&file.products).await?;
    info!(
        path = %config.store.products_file,
        merged,
        "products file synchronized"
    );
    Ok(())
}

fn db_parent_dir(database_url: &str) -> Option<&std::path::Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    if path.starts_with(":memory:") {
        return None;
    }
    std::path::Path::new(path).parent().filter(|p| !p.as_os_str().is_empty())
}

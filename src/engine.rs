use std::path::PathBuf;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::config::{AppConfig, ProductEntry, ProductsFile};
use crate::extract::ExtractorRegistry;
use crate::fetcher::PageFetcher;
use crate::models::{PriceSample, Product};
use crate::monitor::{CycleOutcome, Monitor};
use crate::notify::{ConsoleNotifier, DiscordNotifier, Notifier};
use crate::store::ProductStore;
use crate::utils::error::{AppError, Result};

/// Ties the store, fetcher, and monitor together behind one handle.
pub struct Engine {
    store: Arc<ProductStore>,
    monitor: Arc<Monitor>,
    products_file: PathBuf,
}

impl Engine {
    /// Wires up every component from configuration. The console notifier is
    /// always active; Discord joins when a webhook is configured.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let store = Arc::new(
            ProductStore::connect(&config.store.database_url, config.store.max_connections)
                .await?,
        );
        let fetcher = Arc::new(PageFetcher::new(config.fetcher.clone())?);

        let mut notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(ConsoleNotifier)];
        if let Some(discord) = DiscordNotifier::from_config(&config.notifications.discord) {
            tracing::info!("discord notifications enabled");
            notifiers.push(Arc::new(discord));
        }

        let monitor = Arc::new(Monitor::new(
            store.clone(),
            fetcher,
            notifiers,
            config.scheduler.clone(),
        ));

        Ok(Self {
            store,
            monitor,
            products_file: PathBuf::from(&config.store.products_file),
        })
    }

    pub fn store(&self) -> &ProductStore {
        &self.store
    }

    /// Start tracking a URL. Rejects URLs that are not valid absolute URLs
    /// and thresholds that are not positive.
    pub async fn add_product(
        &self,
        url: &str,
        threshold: Decimal,
        name: Option<String>,
    ) -> Result<Product> {
        if url::Url::parse(url).is_err() {
            return Err(AppError::Validation(format!("invalid URL: {url}")));
        }
        if ExtractorRegistry::resolve(url).is_none() {
            tracing::warn!(url, "url has no extraction strategy, it will not be polled");
        }

        let product = self.store.add(url, threshold, name).await?;
        self.persist_products().await?;
        tracing::info!(url, threshold = %threshold, "product added");
        Ok(product)
    }

    /// Stop tracking a URL and drop its history.
    pub async fn remove_product(&self, url: &str) -> Result<()> {
        if !self.store.remove(url).await? {
            return Err(AppError::NotFound {
                resource: format!("product not tracked: {url}"),
            });
        }
        self.persist_products().await?;
        tracing::info!(url, "product removed");
        Ok(())
    }

    pub async fn update_threshold(&self, url: &str, threshold: Decimal) -> Result<()> {
        self.store.update_threshold(url, threshold).await?;
        self.persist_products().await?;
        tracing::info!(url, threshold = %threshold, "threshold updated");
        Ok(())
    }

    /// Rewrite the products file from the store after a mutation. The file is
    /// merged back in at the next startup, so it must reflect removals and
    /// threshold edits or they would be undone by the merge.
    async fn persist_products(&self) -> Result<()> {
        let products = self.store.list().await?;
        let entries = products
            .into_iter()
            .map(|p| {
                let name = (p.display_name != p.url).then_some(p.display_name);
                ProductEntry {
                    url: p.url,
                    threshold: p.threshold,
                    name,
                }
            })
            .collect();
        ProductsFile { products: entries }.save(&self.products_file)?;
        Ok(())
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.store.list().await?)
    }

    pub async fn get_history(&self, url: &str) -> Result<Vec<PriceSample>> {
        if self.store.get(url).await?.is_none() {
            return Err(AppError::NotFound {
                resource: format!("product not tracked: {url}"),
            });
        }
        Ok(self.store.history(url).await?)
    }

    /// Run a single sweep and return its outcomes. Backs the `once` command.
    pub async fn run_once(&self) -> Vec<CycleOutcome> {
        self.monitor.run_sweep().await
    }

    /// Run the polling loop until shutdown is requested.
    pub async fn run(&self) {
        self.monitor.clone().run().await;
    }
}

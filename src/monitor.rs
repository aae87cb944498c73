use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;

use crate::config::SchedulerConfig;
use crate::extract::ExtractorRegistry;
use crate::fetcher::PageFetcher;
use crate::models::{CheckStatus, PriceSample, Product};
use crate::notify::{Notifier, PriceAlert};
use crate::store::ProductStore;

/// What happened to one product in one sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleOutcome {
    pub url: String,
    pub status: CheckStatus,
    pub price: Option<Decimal>,
    /// False when the sample was discarded (product removed mid-cycle or a
    /// failed durable write) or the cycle failed before a price existed.
    pub recorded: bool,
    pub notified: bool,
    pub error: Option<String>,
}

impl CycleOutcome {
    fn failed(url: String, status: CheckStatus, error: String) -> Self {
        Self {
            url,
            status,
            price: None,
            recorded: false,
            notified: false,
            error: Some(error),
        }
    }
}

/// Drives periodic checks across all tracked products.
///
/// One timer, one sweep per tick; within a sweep, per-product cycles run on
/// a bounded worker pool and each cycle's sub-steps execute in sequence.
/// A product whose cycle is still in flight is skipped for the tick, which
/// keeps every product's history appends strictly ordered.
pub struct Monitor {
    store: Arc<ProductStore>,
    fetcher: Arc<PageFetcher>,
    notifiers: Vec<Arc<dyn Notifier>>,
    config: SchedulerConfig,
    in_flight: Mutex<HashSet<String>>,
}

impl Monitor {
    pub fn new(
        store: Arc<ProductStore>,
        fetcher: Arc<PageFetcher>,
        notifiers: Vec<Arc<dyn Notifier>>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            notifiers,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Run the polling loop until the task is dropped. The first sweep runs
    /// immediately; later sweeps follow the configured interval.
    pub async fn run(self: Arc<Self>) {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.poll_interval_secs,
            workers = self.config.max_concurrent_checks,
            "monitor started"
        );

        loop {
            ticker.tick().await;
            let outcomes = self.run_sweep().await;
            let notified = outcomes.iter().filter(|o| o.notified).count();
            let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
            tracing::info!(
                checked = outcomes.len(),
                notified,
                failed,
                "sweep complete"
            );
        }
    }

    /// One pass over every pollable product.
    pub async fn run_sweep(&self) -> Vec<CycleOutcome> {
        let products = match self.store.list().await {
            Ok(products) => products,
            Err(err) => {
                tracing::warn!(error = %err, "could not list products, skipping sweep");
                return Vec::new();
            }
        };

        let candidates: Vec<Product> = products
            .into_iter()
            .filter(|p| p.is_pollable())
            .filter(|p| self.claim(&p.url))
            .collect();

        stream::iter(candidates)
            .map(|product| self.run_cycle(product))
            .buffer_unordered(self.config.max_concurrent_checks)
            .collect()
            .await
    }

    async fn run_cycle(&self, product: Product) -> CycleOutcome {
        let url = product.url.clone();
        let outcome = self.check_product(product).await;
        self.release(&url);

        match &outcome.error {
            Some(error) => {
                tracing::warn!(url = %outcome.url, status = ?outcome.status, error, "check failed")
            }
            None => tracing::debug!(
                url = %outcome.url,
                price = ?outcome.price,
                notified = outcome.notified,
                "check complete"
            ),
        }
        outcome
    }

    /// Fetch → extract → evaluate → store for a single product. Failures are
    /// recorded on the product and never escape the cycle.
    async fn check_product(&self, product: Product) -> CycleOutcome {
        let url = product.url.clone();

        let Some(strategy) = ExtractorRegistry::resolve(&url) else {
            self.set_status(&url, CheckStatus::Unsupported).await;
            return CycleOutcome::failed(
                url,
                CheckStatus::Unsupported,
                "no extraction strategy for url".to_string(),
            );
        };

        let content = match self.fetcher.fetch(&url, strategy.source_id()).await {
            Ok(content) => content,
            Err(err) => {
                self.set_status(&url, CheckStatus::FetchFailed).await;
                return CycleOutcome::failed(url, CheckStatus::FetchFailed, err.to_string());
            }
        };

        let price = match strategy.extract_price(&content.body) {
            Ok(price) => price,
            Err(err) => {
                self.set_status(&url, CheckStatus::ParseFailed).await;
                return CycleOutcome::failed(url, CheckStatus::ParseFailed, err.to_string());
            }
        };

        // Fill in a display name from the page title if the user gave none.
        if product.display_name == product.url {
            if let Some(title) = strategy.extract_title(&content.body) {
                if let Err(err) = self.store.set_display_name(&url, &title).await {
                    tracing::warn!(url = %url, error = %err, "could not store display name");
                }
            }
        }

        let crossed = product.is_crossing(price);
        let sample = PriceSample::new(price);

        let recorded = match self.store.record_sample(&url, &sample, CheckStatus::Ok).await {
            Ok(recorded) => recorded,
            Err(err) => {
                // History may be silently incomplete; keep monitoring anyway.
                tracing::warn!(url = %url, error = %err, "durable write failed, sample lost");
                false
            }
        };

        // A removed product's result is discarded, including its alert.
        let notified = recorded && crossed;
        if notified {
            self.dispatch_alert(&product, price).await;
        }

        CycleOutcome {
            url,
            status: CheckStatus::Ok,
            price: Some(price),
            recorded,
            notified,
            error: None,
        }
    }

    async fn dispatch_alert(&self, product: &Product, price: Decimal) {
        let alert = PriceAlert {
            url: product.url.clone(),
            display_name: product.display_name.clone(),
            price,
            threshold: product.threshold,
        };
        for notifier in &self.notifiers {
            if let Err(err) = notifier.notify(&alert).await {
                tracing::warn!(
                    notifier = notifier.name(),
                    url = %alert.url,
                    error = %err,
                    "notification delivery failed"
                );
            }
        }
    }

    async fn set_status(&self, url: &str, status: CheckStatus) {
        if let Err(err) = self.store.mark_status(url, status).await {
            tracing::warn!(url = %url, error = %err, "could not record check status");
        }
    }

    fn claim(&self, url: &str) -> bool {
        self.in_flight.lock().unwrap().insert(url.to_string())
    }

    fn release(&self, url: &str) {
        self.in_flight.lock().unwrap().remove(url);
    }
}

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod console;
pub mod discord;

pub use console::ConsoleNotifier;
pub use discord::DiscordNotifier;

/// A threshold crossing for one product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceAlert {
    pub url: String,
    pub display_name: String,
    pub price: Decimal,
    pub threshold: Decimal,
}

impl PriceAlert {
    /// How far below the target the price landed.
    pub fn savings(&self) -> Decimal {
        self.threshold - self.price
    }
}

/// Delivery channel for price alerts. Fire-and-forget: a failed delivery is
/// logged by the caller and never stalls the monitoring loop.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, alert: &PriceAlert) -> anyhow::Result<()>;
}

use async_trait::async_trait;

use crate::notify::{Notifier, PriceAlert};

/// Writes alerts to the log. Always available; this is the headless stand-in
/// for a desktop message box.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    async fn notify(&self, alert: &PriceAlert) -> anyhow::Result<()> {
        tracing::info!(
            product = %alert.display_name,
            url = %alert.url,
            price = %alert.price,
            threshold = %alert.threshold,
            savings = %alert.savings(),
            "price dropped below threshold"
        );
        Ok(())
    }
}

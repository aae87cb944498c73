use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::config::DiscordConfig;
use crate::notify::{Notifier, PriceAlert};

/// Sends price-drop alerts to a Discord webhook as a rich embed.
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
    username: String,
}

impl DiscordNotifier {
    /// Returns None when no webhook is configured.
    pub fn from_config(config: &DiscordConfig) -> Option<Self> {
        let webhook_url = config.webhook_url.clone()?;
        Some(Self {
            client: Client::new(),
            webhook_url,
            username: config.username.clone(),
        })
    }

    fn create_payload(&self, alert: &PriceAlert) -> serde_json::Value {
        json!({
            "username": self.username,
            "embeds": [{
                "title": format!("💰 {}", truncate(&alert.display_name, 80)),
                "url": alert.url,
                "color": 0x00ff00,
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "fields": [
                    {
                        "name": "Current Price",
                        "value": format!("₺{}", alert.price),
                        "inline": true
                    },
                    {
                        "name": "Target Price",
                        "value": format!("₺{}", alert.threshold),
                        "inline": true
                    },
                    {
                        "name": "Savings",
                        "value": format!("₺{}", alert.savings()),
                        "inline": true
                    }
                ]
            }]
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(max_chars).collect();
        format!("{prefix}...")
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    async fn notify(&self, alert: &PriceAlert) -> anyhow::Result<()> {
        let payload = self.create_payload(alert);
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Discord webhook returned status {status}");
        }
        Ok(())
    }
}

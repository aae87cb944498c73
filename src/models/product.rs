use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::CheckStatus;

/// A tracked product. The url is the unique key; everything else hangs off it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub url: String,
    pub display_name: String,
    pub threshold: Decimal,

    /// Which extraction strategy this product resolves to ("amazon",
    /// "hepsiburada", "trendyol", "generic" or "unsupported").
    pub source_id: String,

    // Last-cycle metadata
    pub last_price: Option<Decimal>,
    pub last_check: Option<DateTime<Utc>>,
    pub last_status: CheckStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub url: String,
    pub threshold: Decimal,
    pub display_name: Option<String>,
    pub source_id: String,
}

impl Product {
    pub fn new(new_product: NewProduct) -> Self {
        let now = Utc::now();
        let display_name = new_product
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| new_product.url.clone());
        let last_status = if new_product.source_id == "unsupported" {
            CheckStatus::Unsupported
        } else {
            CheckStatus::Ok
        };

        Self {
            url: new_product.url,
            display_name,
            threshold: new_product.threshold,
            source_id: new_product.source_id,
            last_price: None,
            last_check: None,
            last_status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Unsupported products are parked until the registry gains a matching
    /// strategy and they are re-added.
    pub fn is_pollable(&self) -> bool {
        self.last_status != CheckStatus::Unsupported
    }

    /// Edge-triggered crossing test: fires only on the transition from
    /// above-threshold (or no prior sample) to at-or-below-threshold.
    /// The comparison is inclusive at the boundary.
    pub fn is_crossing(&self, new_price: Decimal) -> bool {
        if new_price > self.threshold {
            return false;
        }
        match self.last_price {
            None => true,
            Some(previous) => previous > self.threshold,
        }
    }
}

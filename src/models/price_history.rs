use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One observed price for a product. Samples are immutable once appended;
/// the store only ever appends them in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSample {
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl PriceSample {
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            timestamp: Utc::now(),
        }
    }

    pub fn at(price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self { price, timestamp }
    }
}

use serde::{Deserialize, Serialize};

pub mod price_history;
pub mod product;

// Re-exports for convenience
pub use price_history::*;
pub use product::*;

/// Outcome of the most recent check cycle for a product. Stored as TEXT via
/// `as_str`/`parse`, so the string forms below are part of the schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    FetchFailed,
    ParseFailed,
    Unsupported,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "ok",
            CheckStatus::FetchFailed => "fetch_failed",
            CheckStatus::ParseFailed => "parse_failed",
            CheckStatus::Unsupported => "unsupported",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(CheckStatus::Ok),
            "fetch_failed" => Some(CheckStatus::FetchFailed),
            "parse_failed" => Some(CheckStatus::ParseFailed),
            "unsupported" => Some(CheckStatus::Unsupported),
            _ => None,
        }
    }
}

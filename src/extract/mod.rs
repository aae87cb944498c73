use rust_decimal::Decimal;
use scraper::{Html, Selector};
use thiserror::Error;

pub mod parse;
pub mod registry;

pub use registry::ExtractorRegistry;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// No selector matched anything in the page. Usually markup drift.
    #[error("no price-bearing element found")]
    NotFound,

    /// A fragment matched but did not parse as a number.
    #[error("matched fragment is not a parseable price: {text:?}")]
    Malformed { text: String },
}

/// How to pull a price out of a page. One variant per supported site family,
/// plus a generic text-pattern fallback for everything else. Adding a site
/// means adding a rule to the registry table; nothing else changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStrategy {
    Selectors {
        source_id: &'static str,
        price_selectors: &'static [&'static str],
        title_selector: &'static str,
    },
    Generic,
}

impl ExtractionStrategy {
    pub fn source_id(&self) -> &'static str {
        match self {
            ExtractionStrategy::Selectors { source_id, .. } => source_id,
            ExtractionStrategy::Generic => "generic",
        }
    }

    /// Locate a price-bearing fragment and parse it to a numeric value.
    pub fn extract_price(&self, html: &str) -> Result<Decimal, ExtractError> {
        let document = Html::parse_document(html);
        match self {
            ExtractionStrategy::Selectors {
                price_selectors, ..
            } => {
                for raw in price_selectors.iter() {
                    // Selector syntax in the static table is fixed at compile
                    // time; a parse failure here means a broken table entry.
                    let Ok(selector) = Selector::parse(raw) else {
                        tracing::warn!(selector = raw, "invalid selector in registry table");
                        continue;
                    };
                    if let Some(element) = document.select(&selector).next() {
                        let text = element.text().collect::<Vec<_>>().join(" ");
                        let text = text.trim();
                        if text.is_empty() {
                            continue;
                        }
                        return parse::parse_price_text(text);
                    }
                }
                Err(ExtractError::NotFound)
            }
            ExtractionStrategy::Generic => {
                let text: String = document
                    .root_element()
                    .text()
                    .collect::<Vec<_>>()
                    .join(" ");
                parse::find_price_pattern(&text)
            }
        }
    }

    /// Extract the product title, used to fill in a display name the user
    /// did not supply. Best-effort; the generic strategy falls back to the
    /// first h1.
    pub fn extract_title(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let raw = match self {
            ExtractionStrategy::Selectors { title_selector, .. } => title_selector,
            ExtractionStrategy::Generic => "h1",
        };
        let selector = Selector::parse(raw).ok()?;
        let element = document.select(&selector).next()?;
        let title = element.text().collect::<Vec<_>>().join(" ");
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
        if title.is_empty() { None } else { Some(title) }
    }
}

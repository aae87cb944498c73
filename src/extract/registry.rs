use url::Url;

use crate::extract::ExtractionStrategy;

/// One supported site family: a host predicate plus the selector rules for
/// its product pages. Supporting a new site is one more entry here.
struct SiteRule {
    source_id: &'static str,
    host_pattern: &'static str,
    price_selectors: &'static [&'static str],
    title_selector: &'static str,
}

static SITE_RULES: &[SiteRule] = &[
    SiteRule {
        source_id: "amazon",
        host_pattern: "amazon",
        price_selectors: &[
            "span#priceblock_ourprice",
            "span#priceblock_dealprice",
            "span.a-price-whole",
            "span.a-offscreen",
        ],
        title_selector: "#productTitle",
    },
    SiteRule {
        source_id: "hepsiburada",
        host_pattern: "hepsiburada",
        price_selectors: &[
            r#"span[data-bind="markupText: currentPriceBeforePoint"]"#,
            "span#offering-price",
        ],
        title_selector: "h1.product-name",
    },
    SiteRule {
        source_id: "trendyol",
        host_pattern: "trendyol",
        price_selectors: &["span.prc-dsc", "span.prc-org", "span.product-price"],
        title_selector: "h1.pr-new-br",
    },
];

/// Maps a product URL to the extraction strategy for its site family.
pub struct ExtractorRegistry;

impl ExtractorRegistry {
    /// Resolve a URL to a strategy by domain match. Unknown http(s) hosts get
    /// the generic pattern fallback; a URL without a usable host resolves to
    /// nothing and the product is treated as unsupported.
    pub fn resolve(url: &str) -> Option<ExtractionStrategy> {
        let parsed = Url::parse(url).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        let host = parsed.host_str()?.to_ascii_lowercase();

        for rule in SITE_RULES {
            if host.contains(rule.host_pattern) {
                return Some(ExtractionStrategy::Selectors {
                    source_id: rule.source_id,
                    price_selectors: rule.price_selectors,
                    title_selector: rule.title_selector,
                });
            }
        }
        Some(ExtractionStrategy::Generic)
    }

    /// The source identifier a URL resolves to, "unsupported" when none does.
    pub fn source_id_for(url: &str) -> &'static str {
        match Self::resolve(url) {
            Some(strategy) => strategy.source_id(),
            None => "unsupported",
        }
    }
}

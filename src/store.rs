use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use thiserror::Error;

use crate::config::ProductEntry;
use crate::extract::ExtractorRegistry;
use crate::models::{CheckStatus, NewProduct, PriceSample, Product};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Product already tracked: {url}")]
    ProductExists { url: String },

    #[error("Product not tracked: {url}")]
    ProductNotFound { url: String },

    #[error("Threshold must be positive, got {0}")]
    InvalidThreshold(Decimal),

    #[error("Corrupt row for {url}: {message}")]
    CorruptRow { url: String, message: String },
}

/// Durable record of tracked products and their price history.
///
/// The store is the sole owner of product lifetime. Every mutation runs in
/// its own transaction, so readers never observe a partially-applied change,
/// and SQLite's synchronous-full journaling flushes each commit before the
/// call returns.
pub struct ProductStore {
    pool: SqlitePool,
}

impl ProductStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// In-memory store for tests. A single connection keeps the database
    /// alive and shared across tasks.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                url TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                threshold TEXT NOT NULL,
                source_id TEXT NOT NULL,
                last_price TEXT,
                last_check TEXT,
                last_status TEXT NOT NULL DEFAULT 'ok',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS price_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL REFERENCES products(url) ON DELETE CASCADE,
                price TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_price_history_url ON price_history(url, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Track a new product. The source id is resolved from the URL's domain
    /// at add time; unresolvable URLs are stored as unsupported and parked.
    pub async fn add(
        &self,
        url: &str,
        threshold: Decimal,
        display_name: Option<String>,
    ) -> Result<Product, StoreError> {
        if threshold <= Decimal::ZERO {
            return Err(StoreError::InvalidThreshold(threshold));
        }

        let product = Product::new(NewProduct {
            url: url.to_string(),
            threshold,
            display_name,
            source_id: ExtractorRegistry::source_id_for(url).to_string(),
        });

        let result = sqlx::query(
            r#"
            INSERT INTO products
                (url, display_name, threshold, source_id, last_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.url)
        .bind(&product.display_name)
        .bind(product.threshold.to_string())
        .bind(&product.source_id)
        .bind(product.last_status.as_str())
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(product),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::ProductExists {
                    url: url.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Remove a product and its history. Returns false when it was not
    /// tracked. Any in-flight cycle for the url commits against membership,
    /// so its sample is discarded rather than resurrected.
    pub async fn remove(&self, url: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM price_history WHERE url = ?")
            .bind(url)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM products WHERE url = ?")
            .bind(url)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_threshold(&self, url: &str, threshold: Decimal) -> Result<(), StoreError> {
        if threshold <= Decimal::ZERO {
            return Err(StoreError::InvalidThreshold(threshold));
        }
        let result =
            sqlx::query("UPDATE products SET threshold = ?, updated_at = ? WHERE url = ?")
                .bind(threshold.to_string())
                .bind(Utc::now())
                .bind(url)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound {
                url: url.to_string(),
            });
        }
        Ok(())
    }

    /// Append a successful cycle's sample and update last-check metadata in
    /// one transaction. Returns false if the product disappeared since the
    /// cycle started; the sample is then discarded, never inserted.
    pub async fn record_sample(
        &self,
        url: &str,
        sample: &PriceSample,
        status: CheckStatus,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE products SET last_price = ?, last_check = ?, last_status = ?, updated_at = ? \
             WHERE url = ?",
        )
        .bind(sample.price.to_string())
        .bind(sample.timestamp)
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(url)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Removed while the cycle was in flight.
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("INSERT INTO price_history (url, price, timestamp) VALUES (?, ?, ?)")
            .bind(url)
            .bind(sample.price.to_string())
            .bind(sample.timestamp)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Record a failed cycle: status and last-check only, history untouched.
    pub async fn mark_status(&self, url: &str, status: CheckStatus) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE products SET last_check = ?, last_status = ?, updated_at = ? WHERE url = ?",
        )
        .bind(Utc::now())
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(url)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fill in a discovered display name, but never overwrite one the user
    /// chose (anything that differs from the url placeholder).
    pub async fn set_display_name(&self, url: &str, name: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE products SET display_name = ?, updated_at = ? \
             WHERE url = ? AND display_name = url",
        )
        .bind(name)
        .bind(Utc::now())
        .bind(url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, url: &str) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query("SELECT * FROM products WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| product_from_row(&r)).transpose()
    }

    /// Snapshot of all tracked products, stable order.
    pub async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query("SELECT * FROM products ORDER BY created_at, url")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(product_from_row).collect()
    }

    /// Full price history for a product in chronological order.
    pub async fn history(&self, url: &str) -> Result<Vec<PriceSample>, StoreError> {
        let rows = sqlx::query(
            "SELECT price, timestamp FROM price_history WHERE url = ? ORDER BY timestamp, id",
        )
        .bind(url)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let price: String = row.try_get("price")?;
                let timestamp: DateTime<Utc> = row.try_get("timestamp")?;
                let price = Decimal::from_str(&price).map_err(|e| StoreError::CorruptRow {
                    url: url.to_string(),
                    message: format!("bad price {price:?}: {e}"),
                })?;
                Ok(PriceSample::at(price, timestamp))
            })
            .collect()
    }

    /// Merge the products config file into the store at startup: new urls are
    /// added, existing urls get their threshold refreshed, and re-added urls
    /// are re-resolved against the registry (the path out of unsupported).
    /// Existing history is kept, keyed by url.
    pub async fn merge_config(&self, entries: &[ProductEntry]) -> Result<usize, StoreError> {
        let mut merged = 0;
        for entry in entries {
            if entry.threshold <= Decimal::ZERO {
                tracing::warn!(url = %entry.url, threshold = %entry.threshold,
                    "skipping product with non-positive threshold");
                continue;
            }
            match self.get(&entry.url).await? {
                Some(existing) => {
                    let source_id = ExtractorRegistry::source_id_for(&entry.url);
                    let status = if source_id == "unsupported" {
                        CheckStatus::Unsupported
                    } else if existing.last_status == CheckStatus::Unsupported {
                        // Registry gained a matching strategy since last run.
                        CheckStatus::Ok
                    } else {
                        existing.last_status
                    };
                    sqlx::query(
                        "UPDATE products SET threshold = ?, source_id = ?, last_status = ?, \
                         updated_at = ? WHERE url = ?",
                    )
                    .bind(entry.threshold.to_string())
                    .bind(source_id)
                    .bind(status.as_str())
                    .bind(Utc::now())
                    .bind(&entry.url)
                    .execute(&self.pool)
                    .await?;
                }
                None => {
                    self.add(&entry.url, entry.threshold, entry.name.clone())
                        .await?;
                }
            }
            merged += 1;
        }
        Ok(merged)
    }
}

fn product_from_row(row: &SqliteRow) -> Result<Product, StoreError> {
    let url: String = row.try_get("url")?;

    let parse_decimal = |value: &str| -> Result<Decimal, StoreError> {
        Decimal::from_str(value).map_err(|e| StoreError::CorruptRow {
            url: url.clone(),
            message: format!("bad decimal {value:?}: {e}"),
        })
    };

    let threshold: String = row.try_get("threshold")?;
    let threshold = parse_decimal(&threshold)?;
    let last_price: Option<String> = row.try_get("last_price")?;
    let last_price = last_price.as_deref().map(parse_decimal).transpose()?;
    let status: String = row.try_get("last_status")?;
    let last_status = CheckStatus::parse(&status).ok_or_else(|| StoreError::CorruptRow {
        url: url.clone(),
        message: format!("unknown status {status:?}"),
    })?;

    Ok(Product {
        display_name: row.try_get("display_name")?,
        threshold,
        source_id: row.try_get("source_id")?,
        last_price,
        last_check: row.try_get("last_check")?,
        last_status,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        url,
    })
}

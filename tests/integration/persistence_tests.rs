use fiyat_watcher::config::{ProductEntry, ProductsFile};
use fiyat_watcher::models::CheckStatus;
use fiyat_watcher::store::ProductStore;
use rust_decimal::Decimal;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Products and their histories survive a process restart byte for byte.
#[tokio::test]
async fn test_restart_preserves_products_and_history() {
    let server = MockServer::start().await;
    let url = format!("{}/product", server.uri());
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("Kettle", "90")))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite://{}", dir.path().join("watch.db").display());

    {
        let store = std::sync::Arc::new(ProductStore::connect(&db_url, 2).await.unwrap());
        store
            .add(&url, dec("100"), Some("Kettle".to_string()))
            .await
            .unwrap();

        let notifier = RecordingNotifier::new();
        let monitor = test_monitor(store.clone(), notifier.clone());
        monitor.run_sweep().await;
        monitor.run_sweep().await;

        assert_eq!(store.history(&url).await.unwrap().len(), 2);
        assert_eq!(notifier.alerts().len(), 1);
    }

    // Fresh connection, same file: everything is still there.
    let store = ProductStore::connect(&db_url, 2).await.unwrap();
    let products = store.list().await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].url, url);
    assert_eq!(products[0].threshold, dec("100"));
    assert_eq!(products[0].last_price, Some(dec("90")));
    assert_eq!(products[0].last_status, CheckStatus::Ok);

    let history = store.history(&url).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|s| s.price == dec("90")));
    assert!(history[0].timestamp <= history[1].timestamp);
}

/// After a restart the edge trigger looks at the persisted last price, so a
/// price that was already below threshold does not re-alert.
#[tokio::test]
async fn test_no_duplicate_alert_after_restart() {
    let server = MockServer::start().await;
    let url = format!("{}/product", server.uri());
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("Kettle", "90")))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite://{}", dir.path().join("watch.db").display());

    {
        let store = std::sync::Arc::new(ProductStore::connect(&db_url, 2).await.unwrap());
        store.add(&url, dec("100"), None).await.unwrap();
        let notifier = RecordingNotifier::new();
        let monitor = test_monitor(store.clone(), notifier.clone());
        monitor.run_sweep().await;
        assert_eq!(notifier.alerts().len(), 1);
    }

    let store = std::sync::Arc::new(ProductStore::connect(&db_url, 2).await.unwrap());
    let notifier = RecordingNotifier::new();
    let monitor = test_monitor(store.clone(), notifier.clone());
    monitor.run_sweep().await;

    assert!(notifier.alerts().is_empty());
    assert_eq!(store.history(&url).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_products_file_merge_updates_store() {
    let store = test_store().await;
    store
        .add("https://www.trendyol.com/p/kettle-p-1", dec("120"), None)
        .await
        .unwrap();

    let file = ProductsFile {
        products: vec![
            // Existing product with a new threshold
            ProductEntry {
                url: "https://www.trendyol.com/p/kettle-p-1".to_string(),
                threshold: dec("99.90"),
                name: None,
            },
            // Brand new product
            ProductEntry {
                url: "https://www.amazon.com.tr/dp/B0NEW".to_string(),
                threshold: dec("450"),
                name: Some("Blender".to_string()),
            },
            // Invalid threshold, skipped with a warning
            ProductEntry {
                url: "https://www.amazon.com.tr/dp/B0BAD".to_string(),
                threshold: dec("0"),
                name: None,
            },
        ],
    };
    let merged = store.merge_config(&file.products).await.unwrap();
    assert_eq!(merged, 2);

    let products = store.list().await.unwrap();
    assert_eq!(products.len(), 2);

    let kettle = store
        .get("https://www.trendyol.com/p/kettle-p-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kettle.threshold, dec("99.90"));

    let blender = store
        .get("https://www.amazon.com.tr/dp/B0NEW")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(blender.display_name, "Blender");
    assert_eq!(blender.source_id, "amazon");
}

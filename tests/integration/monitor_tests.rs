use fiyat_watcher::models::CheckStatus;
use rust_decimal::Decimal;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

async fn serve_page(server: &MockServer, body: String) {
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/product"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// The canonical crossing scenario: threshold 100, observed prices
/// 150, 90, 80, 200, 50. Alerts fire on the second and fifth checks only,
/// and every check appends exactly one history sample.
#[tokio::test]
async fn test_edge_triggered_alerts_across_cycles() {
    let server = MockServer::start().await;
    let url = format!("{}/product", server.uri());

    let store = test_store().await;
    store
        .add(&url, dec("100"), Some("Kettle".to_string()))
        .await
        .unwrap();

    let notifier = RecordingNotifier::new();
    let monitor = test_monitor(store.clone(), notifier.clone());

    let prices = ["150", "90", "80", "200", "50"];
    let expected_alerts = [0, 1, 1, 1, 2];

    for (cycle, (price, expected)) in prices.iter().zip(expected_alerts).enumerate() {
        serve_page(&server, product_page("Kettle", price)).await;

        let outcomes = monitor.run_sweep().await;
        assert_eq!(outcomes.len(), 1, "cycle {}", cycle + 1);
        assert_eq!(outcomes[0].status, CheckStatus::Ok);
        assert!(outcomes[0].recorded);

        assert_eq!(
            notifier.alerts().len(),
            expected,
            "alert count after cycle {}",
            cycle + 1
        );
        assert_eq!(
            store.history(&url).await.unwrap().len(),
            cycle + 1,
            "history length after cycle {}",
            cycle + 1
        );
    }

    let alerts = notifier.alerts();
    assert_eq!(alerts[0].price, dec("90"));
    assert_eq!(alerts[1].price, dec("50"));
    assert!(alerts.iter().all(|a| a.threshold == dec("100")));

    let product = store.get(&url).await.unwrap().unwrap();
    assert_eq!(product.last_price, Some(dec("50")));
    assert_eq!(product.last_status, CheckStatus::Ok);
}

#[tokio::test]
async fn test_price_equal_to_threshold_triggers() {
    let server = MockServer::start().await;
    let url = format!("{}/product", server.uri());

    let store = test_store().await;
    store.add(&url, dec("100"), None).await.unwrap();

    let notifier = RecordingNotifier::new();
    let monitor = test_monitor(store.clone(), notifier.clone());

    serve_page(&server, product_page("Kettle", "100")).await;
    monitor.run_sweep().await;

    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].price, dec("100"));
}

#[tokio::test]
async fn test_failed_fetch_leaves_history_untouched() {
    let server = MockServer::start().await;
    let url = format!("{}/product", server.uri());

    let store = test_store().await;
    store.add(&url, dec("100"), None).await.unwrap();

    let notifier = RecordingNotifier::new();
    let monitor = test_monitor(store.clone(), notifier.clone());

    serve_page(&server, product_page("Kettle", "90")).await;
    monitor.run_sweep().await;
    assert_eq!(store.history(&url).await.unwrap().len(), 1);

    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let outcomes = monitor.run_sweep().await;
    assert_eq!(outcomes[0].status, CheckStatus::FetchFailed);
    assert!(!outcomes[0].recorded);
    assert!(outcomes[0].error.is_some());

    // The failed cycle must not invent a sample or a duplicate alert.
    assert_eq!(store.history(&url).await.unwrap().len(), 1);
    assert_eq!(notifier.alerts().len(), 1);

    let product = store.get(&url).await.unwrap().unwrap();
    assert_eq!(product.last_status, CheckStatus::FetchFailed);
    // Last known price survives the failure.
    assert_eq!(product.last_price, Some(dec("90")));
}

#[tokio::test]
async fn test_timed_out_fetch_leaves_history_untouched() {
    let server = MockServer::start().await;
    let url = format!("{}/product", server.uri());

    let store = test_store().await;
    store.add(&url, dec("100"), None).await.unwrap();

    // 1s client timeout against a page that takes 2s to arrive.
    let fetcher_config = fiyat_watcher::config::FetcherConfig {
        request_timeout: 1,
        ..test_fetcher_config()
    };
    let notifier = RecordingNotifier::new();
    let monitor = test_monitor_with_fetcher(store.clone(), notifier.clone(), fetcher_config);

    Mock::given(method("GET"))
        .and(path("/product"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(product_page("Kettle", "90"))
                .set_delay(std::time::Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let outcomes = monitor.run_sweep().await;
    assert_eq!(outcomes[0].status, CheckStatus::FetchFailed);
    assert!(!outcomes[0].recorded);

    assert!(store.history(&url).await.unwrap().is_empty());
    assert!(notifier.alerts().is_empty());

    let product = store.get(&url).await.unwrap().unwrap();
    assert_eq!(product.last_status, CheckStatus::FetchFailed);
    assert!(product.last_price.is_none());
}

/// Removing a product while its cycle is awaiting the page discards the
/// cycle's sample and suppresses its alert.
#[tokio::test]
async fn test_removal_during_in_flight_cycle_discards_sample() {
    let server = MockServer::start().await;
    let url = format!("{}/product", server.uri());

    let store = test_store().await;
    store.add(&url, dec("100"), None).await.unwrap();

    let notifier = RecordingNotifier::new();
    let monitor = std::sync::Arc::new(test_monitor(store.clone(), notifier.clone()));

    Mock::given(method("GET"))
        .and(path("/product"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(product_page("Kettle", "90"))
                .set_delay(std::time::Duration::from_millis(800)),
        )
        .mount(&server)
        .await;

    let sweep = tokio::spawn({
        let monitor = monitor.clone();
        async move { monitor.run_sweep().await }
    });

    // Remove while the fetch is still waiting on the response body.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(store.remove(&url).await.unwrap());

    let outcomes = sweep.await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].price, Some(dec("90")));
    assert!(!outcomes[0].recorded);
    assert!(!outcomes[0].notified);

    // The price was below threshold, but the product is gone: no alert,
    // no resurrected row, no orphan sample.
    assert!(notifier.alerts().is_empty());
    assert!(store.get(&url).await.unwrap().is_none());
    assert!(store.history(&url).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unparseable_page_is_parse_failed() {
    let server = MockServer::start().await;
    let url = format!("{}/product", server.uri());

    let store = test_store().await;
    store.add(&url, dec("100"), None).await.unwrap();

    let notifier = RecordingNotifier::new();
    let monitor = test_monitor(store.clone(), notifier.clone());

    serve_page(
        &server,
        "<html><body><p>out of stock</p></body></html>".to_string(),
    )
    .await;

    let outcomes = monitor.run_sweep().await;
    assert_eq!(outcomes[0].status, CheckStatus::ParseFailed);
    assert!(store.history(&url).await.unwrap().is_empty());
    assert!(notifier.alerts().is_empty());
}

#[tokio::test]
async fn test_unsupported_url_is_never_polled() {
    let store = test_store().await;
    let product = store
        .add("mailto:deals@example.com", dec("100"), None)
        .await
        .unwrap();
    assert_eq!(product.last_status, CheckStatus::Unsupported);

    let notifier = RecordingNotifier::new();
    let monitor = test_monitor(store.clone(), notifier.clone());

    let outcomes = monitor.run_sweep().await;
    assert!(outcomes.is_empty());
    assert!(
        store
            .history("mailto:deals@example.com")
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_display_name_discovered_from_page_title() {
    let server = MockServer::start().await;
    let url = format!("{}/product", server.uri());

    let store = test_store().await;
    store.add(&url, dec("100"), None).await.unwrap();

    let notifier = RecordingNotifier::new();
    let monitor = test_monitor(store.clone(), notifier.clone());

    serve_page(&server, product_page("Çaydanlık 2L", "150")).await;
    monitor.run_sweep().await;

    let product = store.get(&url).await.unwrap().unwrap();
    assert_eq!(product.display_name, "Çaydanlık 2L");
}

#[tokio::test]
async fn test_one_bad_product_does_not_block_others() {
    let server = MockServer::start().await;
    let good_url = format!("{}/product", server.uri());
    let bad_url = format!("{}/missing", server.uri());

    let store = test_store().await;
    store.add(&good_url, dec("100"), None).await.unwrap();
    store.add(&bad_url, dec("100"), None).await.unwrap();

    let notifier = RecordingNotifier::new();
    let monitor = test_monitor(store.clone(), notifier.clone());

    serve_page(&server, product_page("Kettle", "90")).await;

    let outcomes = monitor.run_sweep().await;
    assert_eq!(outcomes.len(), 2);

    let good = outcomes.iter().find(|o| o.url == good_url).unwrap();
    let bad = outcomes.iter().find(|o| o.url == bad_url).unwrap();
    assert_eq!(good.status, CheckStatus::Ok);
    assert_eq!(bad.status, CheckStatus::FetchFailed);

    assert_eq!(store.history(&good_url).await.unwrap().len(), 1);
    assert_eq!(notifier.alerts().len(), 1);
}

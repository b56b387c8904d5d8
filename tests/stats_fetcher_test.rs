// Tests for StatsFetcher against a mock HTTP server.

use mockito::Server;

use hydroviz_segment_client::fetch_error::FetchError;
use hydroviz_segment_client::stats_fetcher::StatsFetcher;

#[tokio::test]
async fn test_fetch_pair_success() {
    let mut server = Server::new_async().await;

    let stats_mock = server
        .mock("GET", "/conus_hydrology/stats/12345")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"dh3": {"historical": {"CCSM4": {"1976-2005": 1532.4}}}}"#)
        .create_async()
        .await;

    let hydrograph_mock = server
        .mock("GET", "/conus_hydrology/modeled_climatology/12345")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"CCSM4": {"rcp85": {"2046-2075": {"jan": 174.2}}}}"#)
        .create_async()
        .await;

    let fetcher = StatsFetcher::new(server.url());
    let result = fetcher.fetch_pair("12345").await;

    assert!(result.is_ok(), "fetch_pair failed: {:?}", result.err());
    let (stats, hydrograph) = result.unwrap();
    assert!(stats.get("dh3").is_some());
    assert!(hydrograph.get("CCSM4").is_some());

    stats_mock.assert_async().await;
    hydrograph_mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_pair_fails_when_stats_endpoint_errors() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/conus_hydrology/stats/12345")
        .with_status(503)
        .create_async()
        .await;

    server
        .mock("GET", "/conus_hydrology/modeled_climatology/12345")
        .with_status(200)
        .with_body(r#"{"CCSM4": {}}"#)
        .create_async()
        .await;

    let fetcher = StatsFetcher::new(server.url());
    let result = fetcher.fetch_pair("12345").await;

    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(err.is_api_failure());
    match err {
        FetchError::Http { status, .. } => assert_eq!(status.as_u16(), 503),
        other => panic!("Expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_pair_fails_when_hydrograph_endpoint_errors() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/conus_hydrology/stats/12345")
        .with_status(200)
        .with_body(r#"{"dh3": {}}"#)
        .create_async()
        .await;

    server
        .mock("GET", "/conus_hydrology/modeled_climatology/12345")
        .with_status(404)
        .create_async()
        .await;

    let fetcher = StatsFetcher::new(server.url());
    let result = fetcher.fetch_pair("12345").await;

    assert!(result.is_err());
    assert!(result.unwrap_err().is_api_failure());
}

#[tokio::test]
async fn test_fetch_pair_malformed_body_is_decode_error() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/conus_hydrology/stats/12345")
        .with_status(200)
        .with_body("<html>maintenance page</html>")
        .create_async()
        .await;

    server
        .mock("GET", "/conus_hydrology/modeled_climatology/12345")
        .with_status(200)
        .with_body(r#"{"CCSM4": {}}"#)
        .create_async()
        .await;

    let fetcher = StatsFetcher::new(server.url());
    let result = fetcher.fetch_pair("12345").await;

    assert!(result.is_err());
    let err = result.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
    assert!(!err.is_api_failure());
}

#[tokio::test]
async fn test_fetch_combined_extracts_stats_entry() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/conus_hydrology/12345")
        .with_status(200)
        .with_body(r#"{"12345": {"stats": {"dh3": 1532.4, "dl3": 112.9}}}"#)
        .create_async()
        .await;

    let fetcher = StatsFetcher::new(server.url());
    let result = fetcher.fetch_combined("12345").await;

    assert!(result.is_ok());
    let stats = result.unwrap();
    assert_eq!(stats.get("dh3").and_then(|v| v.as_f64()), Some(1532.4));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_combined_missing_segment_entry() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/conus_hydrology/12345")
        .with_status(200)
        .with_body(r#"{"99999": {"stats": {}}}"#)
        .create_async()
        .await;

    let fetcher = StatsFetcher::new(server.url());
    let result = fetcher.fetch_combined("12345").await;

    assert!(matches!(result, Err(FetchError::Decode(_))));
}

//! Median aggregation over independent feeds

use e2e_tests::median_feeds;
use origins::FetchContext;
use provider::build_provider;
use types::{ErrorKind, Pair};

#[tokio::test]
async fn test_five_feeds_aggregate() {
    let config = median_feeds(&[Some("1"); 5], 3).unwrap();
    let provider = build_provider(&config, None).unwrap();

    let point = provider
        .data_point(&FetchContext::background(), "ETH/BTC")
        .await
        .unwrap();
    assert_eq!(point.meta["type"], "aggregator");
    let tick = point.tick().unwrap();
    assert_eq!(tick.pair, Pair::new("ETH", "BTC"));
    assert_eq!(tick.price, Some("1".parse().unwrap()));
    assert_eq!(point.sub_points.len(), 5);
    assert!(point.sub_points.iter().all(|sub| sub.validate().is_ok()));
}

#[tokio::test]
async fn test_two_failing_feeds_still_meet_quorum() {
    let config = median_feeds(&[Some("1"), None, Some("1.2"), None, Some("0.9")], 3).unwrap();
    let provider = build_provider(&config, None).unwrap();

    let point = provider
        .data_point(&FetchContext::background(), "ETH/BTC")
        .await
        .unwrap();
    assert_eq!(point.tick().unwrap().price, Some("1".parse().unwrap()));
    assert_eq!(point.sub_points.iter().filter(|sub| sub.is_err()).count(), 2);
}

#[tokio::test]
async fn test_three_failing_feeds_break_quorum() {
    let config = median_feeds(&[Some("1"), None, None, None, Some("1")], 3).unwrap();
    let provider = build_provider(&config, None).unwrap();

    let point = provider
        .data_point(&FetchContext::background(), "ETH/BTC")
        .await
        .unwrap();
    let error = point.error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::Aggregation);
    assert!(error.message.contains("got 2, need 3"));
    assert_eq!(point.sub_points.len(), 5);
}

#[tokio::test]
async fn test_even_quorum_takes_middle_mean() {
    let config = median_feeds(&[Some("1"), Some("2"), Some("3"), Some("10")], 4).unwrap();
    let provider = build_provider(&config, None).unwrap();

    let point = provider
        .data_point(&FetchContext::background(), "ETH/BTC")
        .await
        .unwrap();
    assert_eq!(point.tick().unwrap().price, Some("2.5".parse().unwrap()));
}

#[test]
fn test_point_serializes_with_sub_points() {
    let config = median_feeds(&[Some("1"); 3], 2).unwrap();
    let provider = build_provider(&config, None).unwrap();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let point = runtime
        .block_on(provider.data_point(&FetchContext::background(), "ETH/BTC"))
        .unwrap();

    let json = serde_json::to_value(&point).unwrap();
    assert_eq!(json["meta"]["type"], "aggregator");
    assert_eq!(json["sub_points"].as_array().unwrap().len(), 3);
}

//! Liquid staking token models over a scripted chain

use e2e_tests::{lst_chain, LST_NODE};
use node_config::NodeConfig;
use origins::{ChainClient, FetchContext};
use provider::build_provider;
use std::sync::Arc;
use std::time::Duration;
use types::{ErrorKind, Pair};

fn config() -> NodeConfig {
    toml::from_str(LST_NODE).unwrap()
}

#[tokio::test]
async fn test_lst_models_in_usd() {
    let client: Arc<dyn ChainClient> = Arc::new(lst_chain().unwrap());
    let provider = build_provider(&config(), Some(client)).unwrap();

    let points = provider
        .data_points(&FetchContext::background(), &["RETH/USD", "WSTETH/USD", "ETH/USD"])
        .await
        .unwrap();

    // rETH averages its two block offsets: (1.10 + 1.08) / 2 * 3000
    let reth = points["RETH/USD"].tick().unwrap();
    assert_eq!(reth.pair, Pair::new("RETH", "USD"));
    assert_eq!(reth.price, Some("3270".parse().unwrap()));

    let wsteth = points["WSTETH/USD"].tick().unwrap();
    assert_eq!(wsteth.pair, Pair::new("WSTETH", "USD"));
    assert_eq!(wsteth.price, Some("3450".parse().unwrap()));

    assert_eq!(points["ETH/USD"].tick().unwrap().price, Some("3000".parse().unwrap()));
}

#[tokio::test]
async fn test_one_origin_failing_leaves_others_intact() {
    let client = Arc::new(lst_chain().unwrap());
    // fails the rETH read at the latest block
    client.fail_next_batches(1);
    let provider = build_provider(&config(), Some(client.clone() as Arc<dyn ChainClient>)).unwrap();

    let reth = provider
        .data_point(&FetchContext::background(), "RETH/USD")
        .await
        .unwrap();
    assert_eq!(reth.error.unwrap().kind, ErrorKind::Transient);

    let wsteth = provider
        .data_point(&FetchContext::background(), "WSTETH/USD")
        .await
        .unwrap();
    assert!(wsteth.tick().is_ok());
}

#[tokio::test]
async fn test_expired_context_fails_on_chain_leaves_only() {
    let client: Arc<dyn ChainClient> = Arc::new(lst_chain().unwrap());
    let provider = build_provider(&config(), Some(client)).unwrap();
    let ctx = FetchContext::with_timeout(Duration::ZERO);
    tokio::time::sleep(Duration::from_millis(5)).await;

    let points = provider
        .data_points(&ctx, &["RETH/USD", "ETH/USD"])
        .await
        .unwrap();
    let error = points["RETH/USD"].error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::Transient);
    assert!(error.message.contains("deadline"));
    assert!(points["ETH/USD"].tick().is_ok());
}

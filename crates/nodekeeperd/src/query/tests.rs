//! Query facade tests against a scripted control client.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use nodekeeper_cache::ManualClock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::tests::support::{ScriptedControlClient, block_hash_for, block_header, blockchain_info};

struct Node {
    tip: Arc<AtomicU64>,
    client: Arc<ScriptedControlClient>,
    clock: Arc<ManualClock>,
    facade: QueryFacade,
}

fn scripted_node(tip: u64) -> Node {
    let height = Arc::new(AtomicU64::new(tip));
    let observed = Arc::clone(&height);
    let client = Arc::new(ScriptedControlClient::new(move |method, params| {
        let tip = observed.load(Ordering::SeqCst);
        match method {
            "getblockchaininfo" => Ok(blockchain_info(tip, false)),
            "getblockcount" => Ok(json!(tip)),
            "getblockhash" => {
                let height = params.first().and_then(Value::as_u64).unwrap_or_default();
                Ok(json!(block_hash_for(height)))
            }
            "getblockheader" => {
                let hash = params.first().and_then(Value::as_str).unwrap_or_default();
                let height = u64::from_str_radix(hash, 16).unwrap_or_default();
                Ok(block_header(height))
            }
            "getblockstats" => {
                let height = params.first().and_then(Value::as_u64).unwrap_or_default();
                Ok(json!({
                    "height": height,
                    "feerate_percentiles": [height, height + 1, height + 2, height + 3, height + 4],
                }))
            }
            "getpeerinfo" => Ok(json!([
                {"inbound": false, "network": "ipv4"},
                {"inbound": true, "network": "onion"},
                {"inbound": false, "network": "i2p"},
            ])),
            other => Err(RpcError::server(-32601, format!("unexpected {other}"))),
        }
    }));
    let clock = Arc::new(ManualClock::new());
    let facade = QueryFacade::with_clock(
        Arc::clone(&client) as Arc<dyn ControlClient>,
        Arc::clone(&clock) as Arc<dyn Clock>,
    );
    Node {
        tip: height,
        client,
        clock,
        facade,
    }
}

#[fixture]
fn node() -> Node {
    scripted_node(100)
}

#[rstest]
fn sync_status_is_memoised_for_the_ttl(node: Node) {
    let first = node.facade.sync_status().expect("first");
    node.clock.advance(QUERY_TTL - Duration::from_millis(1));
    node.facade.sync_status().expect("cached");
    assert_eq!(node.client.count("getblockchaininfo"), 1);

    node.clock.advance(Duration::from_millis(1));
    node.facade.sync_status().expect("refreshed");

    assert_eq!(first.blocks, 100);
    assert_eq!(node.client.count("getblockchaininfo"), 2);
}

#[rstest]
fn peer_summary_tallies_networks(node: Node) {
    let summary = node.facade.peer_summary().expect("peer summary");

    assert_eq!(summary.total, 3);
    assert_eq!(summary.inbound, 1);
    assert_eq!((summary.clearnet, summary.tor, summary.i2p), (1, 1, 1));
}

#[rstest]
fn latest_blocks_are_newest_first_and_batched(node: Node) {
    let blocks = node.facade.latest_blocks(3).expect("latest blocks");

    let heights: Vec<u64> = blocks.iter().map(|block| block.height).collect();
    assert_eq!(heights, [100, 99, 98]);
    assert_eq!(node.client.batches(), 2, "one batch per command");
    assert_eq!(blocks[0].hash, block_hash_for(100));
}

#[rstest]
fn cached_heights_are_not_fetched_again(node: Node) {
    node.facade.latest_blocks(3).expect("warm cache");
    node.facade.latest_blocks(3).expect("served from cache");
    assert_eq!(node.client.count("getblockhash"), 3);

    node.tip.store(101, Ordering::SeqCst);
    node.clock.advance(QUERY_TTL);
    let blocks = node.facade.latest_blocks(3).expect("after new tip");

    assert_eq!(blocks.first().map(|block| block.height), Some(101));
    assert_eq!(node.client.count("getblockhash"), 4, "only the new height is fetched");
}

#[test]
fn short_chains_return_every_block() {
    let node = scripted_node(1);
    let blocks = node.facade.latest_blocks(10).expect("latest blocks");
    let heights: Vec<u64> = blocks.iter().map(|block| block.height).collect();
    assert_eq!(heights, [1, 0]);
}

#[test]
fn limits_are_capped_at_the_cache_capacity() {
    let node = scripted_node(1_000);
    let blocks = node.facade.latest_blocks(1_000).expect("latest blocks");
    assert_eq!(blocks.len(), HEIGHT_CACHE_CAPACITY);
}

#[test]
fn failed_headers_are_left_out() {
    let client = Arc::new(ScriptedControlClient::new(|method, params| match method {
        "getblockcount" => Ok(json!(10)),
        "getblockhash" => Ok(json!(block_hash_for(
            params.first().and_then(Value::as_u64).unwrap_or_default()
        ))),
        "getblockheader" if params.first() == Some(&json!(block_hash_for(9))) => {
            Err(RpcError::server(-5, "Block not found"))
        }
        "getblockheader" => {
            let hash = params.first().and_then(Value::as_str).unwrap_or_default();
            Ok(block_header(u64::from_str_radix(hash, 16).unwrap_or_default()))
        }
        other => Err(RpcError::server(-32601, other)),
    }));
    let facade = QueryFacade::new(client);

    let heights: Vec<u64> = facade
        .latest_blocks(3)
        .expect("partial result")
        .iter()
        .map(|block| block.height)
        .collect();

    assert_eq!(heights, [10, 8]);
}

#[rstest]
fn fee_tiers_take_medians_over_the_window(node: Node) {
    let tiers = node.facade.fee_tiers(5).expect("fee tiers");

    // Heights 96..=100 report p10 = height, p50 = height + 2, p90 = height + 4.
    assert_eq!((tiers.low, tiers.medium, tiers.high), (98, 100, 102));
    assert_eq!(tiers.blocks, 5);

    node.facade.fee_tiers(5).expect("cached");
    assert_eq!(node.client.count("getblockstats"), 5);
}

#[test]
fn fee_tiers_without_statistics_are_empty() {
    let client = Arc::new(ScriptedControlClient::new(|method, _| match method {
        "getblockcount" => Ok(json!(50)),
        _ => Err(RpcError::server(-8, "Block stats unavailable")),
    }));
    let facade = QueryFacade::new(client);

    let error = facade.fee_tiers(3).expect_err("no statistics");

    assert!(matches!(error, QueryError::Empty { .. }));
}

#[test]
fn rpc_failures_propagate_and_are_retried() {
    let client = Arc::new(ScriptedControlClient::new(|_, _| {
        Err(RpcError::unreachable("connection refused"))
    }));
    let facade = QueryFacade::new(Arc::clone(&client) as Arc<dyn ControlClient>);

    assert!(matches!(facade.sync_status(), Err(QueryError::Rpc(_))));
    assert!(facade.sync_status().is_err());
    assert_eq!(client.count("getblockchaininfo"), 2);
}

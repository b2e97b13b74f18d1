//! Multi-peer routing, fallback, and tier behavior.

use std::sync::atomic::Ordering;

use reef_cache::{codec, set_message, MessageSink, Sink, Tier};
use reef_tests::TestCluster;
use serde::{Deserialize, Serialize};

#[test]
fn test_every_key_loads_once_on_its_owner() {
    let cluster = TestCluster::new(3, 1 << 20);

    let keys: Vec<String> = (0..100).map(|i| format!("object-{i}")).collect();
    for key in &keys {
        for i in 0..cluster.len() {
            let value = cluster.get(i, key).expect("get");
            assert_eq!(value, format!("value-for-{key}"));
        }
    }

    let loads = cluster.loads();
    for key in &keys {
        let hits: Vec<&(String, String)> = loads.iter().filter(|(_, k)| k == key).collect();
        assert_eq!(hits.len(), 1, "key {key} must load exactly once cluster-wide");
        assert_eq!(
            hits[0].0,
            cluster.owner_of(key),
            "key {key} must load on its ring owner"
        );
    }
}

#[test]
fn test_remote_gets_travel_through_the_owner() {
    let cluster = TestCluster::new(3, 1 << 20);

    // Pick a key and read it only from peers that do not own it.
    let key = "traveler";
    let owner = cluster.owner_index(key);

    for i in 0..cluster.len() {
        if i == owner {
            continue;
        }
        let value = cluster.get(i, key).expect("get");
        assert_eq!(value, format!("value-for-{key}"));

        let stats = cluster.group(i).stats();
        assert!(
            stats.peer_loads.load(Ordering::Relaxed) >= 1,
            "peer {i} must have fetched remotely"
        );
        assert_eq!(stats.local_loads.load(Ordering::Relaxed), 0);
    }

    let owner_stats = cluster.group(owner).stats();
    assert!(
        owner_stats.server_requests.load(Ordering::Relaxed) >= 2,
        "the owner must have served the other peers"
    );
    assert_eq!(owner_stats.local_loads.load(Ordering::Relaxed), 1);
}

#[test]
fn test_dead_owner_falls_back_to_local_load() {
    let cluster = TestCluster::new(3, 1 << 20);

    let key = "orphan";
    let owner = cluster.owner_index(key);
    let reader = (owner + 1) % cluster.len();

    cluster.kill(owner);
    let value = cluster.get(reader, key).expect("get must survive a dead owner");
    assert_eq!(value, format!("value-for-{key}"));

    let stats = cluster.group(reader).stats();
    assert_eq!(stats.peer_errors.load(Ordering::Relaxed), 1);
    assert_eq!(stats.local_loads.load(Ordering::Relaxed), 1);

    let loads = cluster.loads();
    assert_eq!(loads, vec![(cluster.id(reader).to_string(), key.to_string())]);

    // Once the owner is back, it serves its key itself again.
    cluster.revive(owner);
    let value = cluster.get(owner, key).expect("get");
    assert_eq!(value, format!("value-for-{key}"));
}

#[test]
fn test_hot_tier_samples_remote_keys() {
    let cluster = TestCluster::new(3, 1 << 20);

    // Read many remotely-owned keys from peer 0.
    let remote_keys: Vec<String> = (0..2000)
        .map(|i| format!("spread-{i}"))
        .filter(|key| cluster.owner_index(key) != 0)
        .take(300)
        .collect();
    assert!(remote_keys.len() >= 300);

    for key in &remote_keys {
        cluster.get(0, key).expect("get");
    }

    let hot = cluster.group(0).cache_stats(Tier::Hot);
    assert!(hot.items > 0, "a sample of remote keys must land in the hot tier");
    assert!(
        (hot.items as usize) < remote_keys.len(),
        "only a sample may land in the hot tier ({} items)",
        hot.items
    );
    assert_eq!(cluster.group(0).cache_stats(Tier::Main).items, 0);
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Inventory {
    sku: String,
    count: u32,
}

#[test]
fn test_typed_messages_flow_across_peers() {
    // Loaders on every peer produce an encoded Inventory message.
    let cluster = TestCluster::new_with_loader(3, 1 << 20, |_group, key, sink| {
        let record = Inventory {
            sku: key.to_string(),
            count: key.len() as u32,
        };
        set_message(sink, &record)
    });

    let key = "widget-9";
    let reader = (cluster.owner_index(key) + 1) % cluster.len();

    // A non-owner decodes the fetched bytes into a typed target.
    let mut record = Inventory::default();
    {
        let group = cluster.group(reader);
        let mut sink = MessageSink::new(&mut record);
        group.get(key, &mut sink).expect("get");

        // The frozen view is the encoded form.
        let reparsed: Inventory = codec::unmarshal(sink.view().as_bytes()).expect("unmarshal");
        assert_eq!(reparsed, record);
    }
    assert_eq!(
        record,
        Inventory {
            sku: key.to_string(),
            count: key.len() as u32,
        }
    );
}

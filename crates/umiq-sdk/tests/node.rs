use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use umiq_sdk::testing::{MemoryStore, MockReader, bet_fixture, market_fixture};
use umiq_sdk::{
    BetSide, FallbackReason, MarketEvent, MarketSource, ReconcileConfig, RefreshOutcome, UmiqNode,
    fallback_markets,
};
use umiq_store::UmiqStore;

fn setup_node(
    reader: MockReader,
    store: MemoryStore,
) -> (
    Arc<UmiqNode<MockReader, MemoryStore>>,
    tokio::sync::broadcast::Receiver<MarketEvent>,
) {
    let (node, rx) = UmiqNode::with_store(
        reader,
        store,
        Address::repeat_byte(0xcc),
        ReconcileConfig::default(),
    );
    (Arc::new(node), rx)
}

/// Wait until the mock has seen `n` count calls.
async fn wait_for_count_calls(node: &UmiqNode<MockReader, MemoryStore>, n: usize) {
    for _ in 0..200 {
        if node.reader().count_calls() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("reader never reached {n} count calls");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn node_starts_from_persisted_state() {
    let mut market = market_fixture("7");
    market.bets.push(bet_fixture("alice", "7", 1.0, BetSide::Yes));
    let (node, _rx) = setup_node(MockReader::default(), MemoryStore::with_markets(vec![market]));
    let markets = node.markets().unwrap();
    assert_eq!(markets.len(), 1);
    assert_eq!(markets[0].bets.len(), 1);
}

#[tokio::test]
async fn refresh_falls_back_and_persists() {
    let store = MemoryStore::default();
    let (node, mut rx) = setup_node(MockReader::unreachable(), store.clone());

    let outcome = node.refresh().await.unwrap();
    let RefreshOutcome::Applied(summary) = outcome else {
        panic!("expected applied refresh");
    };
    assert!(matches!(
        summary.source,
        MarketSource::Fallback(FallbackReason::ChainUnavailable(_))
    ));
    assert_eq!(node.markets().unwrap(), fallback_markets());
    assert_eq!(store.stored_markets().unwrap(), fallback_markets());
    assert!(matches!(
        rx.try_recv(),
        Ok(MarketEvent::MarketsRefreshed(_))
    ));
}

#[tokio::test]
async fn refresh_keeps_bets_across_reload() {
    let store = MemoryStore::default();
    let (node, _rx) = setup_node(MockReader::with_markets(2), store.clone());
    node.refresh().await.unwrap();
    node.add_bet(bet_fixture("alice", "2", 1.5, BetSide::No))
        .unwrap();

    // A new node over the same storage sees the bet after its own refresh.
    let (reloaded, _rx) = setup_node(MockReader::with_markets(2), store);
    reloaded.refresh().await.unwrap();
    let market = reloaded.market("2").unwrap().unwrap();
    assert_eq!(market.bets.len(), 1);
    assert_eq!(market.bets[0].user_id, "alice");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn latest_refresh_wins() {
    let reader = MockReader::with_markets(1);
    let gate = reader.hold_next_count();
    let (node, _rx) = setup_node(reader, MemoryStore::default());

    // First refresh blocks inside the chain read.
    let slow = {
        let node = node.clone();
        tokio::spawn(async move { node.refresh().await })
    };
    wait_for_count_calls(&node, 1).await;

    // Second refresh sees a renamed market and completes first.
    node.reader().set_title(1, "fresh");
    let fast = node.refresh().await.unwrap();
    assert!(matches!(fast, RefreshOutcome::Applied(_)));

    // Make a stale apply observable, then let the first read finish.
    node.reader().set_title(1, "stale");
    gate.release();
    assert_eq!(slow.await.unwrap().unwrap(), RefreshOutcome::Superseded);

    assert_eq!(node.market("1").unwrap().unwrap().title, "fresh");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bet_added_during_refresh_survives() {
    let store = MemoryStore::default();
    let reader = MockReader::with_markets(1);
    let (node, _rx) = setup_node(reader, store.clone());
    node.refresh().await.unwrap();

    let gate = node.reader().hold_next_count();
    let pending = {
        let node = node.clone();
        tokio::spawn(async move { node.refresh().await })
    };
    wait_for_count_calls(&node, 2).await;

    assert!(
        node.add_bet(bet_fixture("bob", "1", 2.0, BetSide::Yes))
            .unwrap()
    );
    gate.release();
    assert!(matches!(
        pending.await.unwrap().unwrap(),
        RefreshOutcome::Applied(_)
    ));

    let market = node.market("1").unwrap().unwrap();
    assert_eq!(market.bets.len(), 1);
    assert_eq!(store.stored_markets().unwrap()[0].bets.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_drops_in_flight_refresh() {
    let reader = MockReader::with_markets(3);
    let gate = reader.hold_next_count();
    let (node, _rx) = setup_node(reader, MemoryStore::default());

    let pending = {
        let node = node.clone();
        tokio::spawn(async move { node.refresh().await })
    };
    wait_for_count_calls(&node, 1).await;
    node.shutdown();
    gate.release();

    assert_eq!(
        pending.await.unwrap().unwrap(),
        RefreshOutcome::Superseded
    );
    assert!(node.markets().unwrap().is_empty());
}

#[tokio::test]
async fn refresh_keeps_bets_the_store_failed_to_save() {
    let store = MemoryStore::default();
    let (node, _rx) = setup_node(MockReader::with_markets(2), store.clone());
    node.refresh().await.unwrap();

    store.fail_writes(true);
    assert!(
        node.add_bet(bet_fixture("alice", "1", 1.0, BetSide::Yes))
            .unwrap()
    );
    assert!(store.stored_markets().unwrap()[0].bets.is_empty());

    node.refresh().await.unwrap();
    let market = node.market("1").unwrap().unwrap();
    assert_eq!(market.bets.len(), 1);
    assert_eq!(market.bets[0].user_id, "alice");
}

#[tokio::test]
async fn resolution_survives_refresh() {
    let (node, _rx) = setup_node(MockReader::with_markets(1), MemoryStore::default());
    node.refresh().await.unwrap();
    node.add_bet(bet_fixture("alice", "1", 1.0, BetSide::Yes))
        .unwrap();
    assert_eq!(
        node.resolve_market("1", BetSide::Yes).unwrap().unwrap().len(),
        1
    );

    node.refresh().await.unwrap();
    let market = node.market("1").unwrap().unwrap();
    assert!(market.is_resolved());
    assert_eq!(market.result, Some(BetSide::Yes));

    assert!(node.resolve_market("1", BetSide::No).unwrap().is_none());
    assert_eq!(node.claimable_rewards().unwrap().len(), 1);
    assert_eq!(node.market("1").unwrap().unwrap().result, Some(BetSide::Yes));
}

#[tokio::test]
async fn resolution_survives_restart_and_refresh() {
    let store = MemoryStore::default();
    {
        let (node, _rx) = setup_node(MockReader::with_markets(1), store.clone());
        node.refresh().await.unwrap();
        node.resolve_market("1", BetSide::No).unwrap();
    }

    let (node, _rx) = setup_node(MockReader::with_markets(1), store);
    node.refresh().await.unwrap();
    let market = node.market("1").unwrap().unwrap();
    assert!(market.is_resolved());
    assert_eq!(market.result, Some(BetSide::No));
    assert!(node.resolve_market("1", BetSide::Yes).unwrap().is_none());
}

#[tokio::test]
async fn single_failed_read_keeps_chain_markets() {
    let reader = MockReader::with_markets(16)
        .failing_market(7, umiq_sdk::Error::ChainUnavailable("timeout".into()));
    let (node, _rx) = setup_node(reader, MemoryStore::default());

    let RefreshOutcome::Applied(summary) = node.refresh().await.unwrap() else {
        panic!("expected applied refresh");
    };
    assert_eq!(summary.source, MarketSource::Chain);
    assert_eq!(summary.market_count, 15);
    assert!(node.markets().unwrap().iter().all(|m| !m.id.starts_with("demo-")));
}

#[tokio::test]
async fn clear_defiq_resets_score() {
    let store = MemoryStore::default();
    let (node, mut rx) = setup_node(MockReader::default(), store.clone());
    node.set_defiq("0xAbc", 140).unwrap();
    let _ = rx.try_recv();

    node.clear_defiq("0xABC").unwrap();
    assert_eq!(node.defiq("0xabc").unwrap(), 0);
    assert_eq!(store.stored_defiq("0xabc"), None);
    assert!(matches!(
        rx.try_recv(),
        Ok(MarketEvent::DefiqUpdated { score: 0, .. })
    ));
}

#[tokio::test]
async fn orphan_bet_leaves_state_unchanged() {
    let (node, mut rx) = setup_node(MockReader::with_markets(1), MemoryStore::default());
    node.refresh().await.unwrap();
    let _ = rx.try_recv();
    let before = node.markets().unwrap();

    let added = node
        .add_bet(bet_fixture("bob", "404", 1.0, BetSide::No))
        .unwrap();
    assert!(!added);
    assert_eq!(node.markets().unwrap(), before);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn full_lifecycle() {
    let (node, _rx) = setup_node(MockReader::default(), MemoryStore::default());
    node.add_market(market_fixture("1")).unwrap();
    node.add_bet(bet_fixture("alice", "1", 1.0, BetSide::Yes))
        .unwrap();
    node.add_bet(bet_fixture("bob", "1", 3.0, BetSide::No))
        .unwrap();

    let stats = node.stats("1").unwrap().unwrap();
    assert_eq!(stats.total_pool, 4.0);
    assert_eq!(stats.yes_probability, 0.25);

    let rewards = node.resolve_market("1", BetSide::No).unwrap().unwrap();
    assert_eq!(rewards.len(), 1);
    assert_eq!(rewards[0].user_id, "bob");
    assert_eq!(rewards[0].amount, 4.0);
    assert!(node.rewards_for("alice").unwrap().is_empty());

    let claimed = node.claim_reward("bob", "1").unwrap().unwrap();
    assert!(claimed.claimed);
    assert!(node.claim_reward("bob", "1").unwrap().is_none());
}

#[tokio::test]
async fn node_over_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("umiq.db");

    {
        let store = UmiqStore::open(db.to_str().unwrap()).unwrap();
        let (node, _rx) = UmiqNode::with_store(
            MockReader::with_markets(2),
            store,
            Address::ZERO,
            ReconcileConfig::default(),
        );
        node.refresh().await.unwrap();
        node.add_bet(bet_fixture("alice", "1", 1.0, BetSide::Yes))
            .unwrap();
        node.set_defiq("0xAlice", 120).unwrap();
    }

    let store = UmiqStore::open(db.to_str().unwrap()).unwrap();
    let (node, _rx) = UmiqNode::with_store(
        MockReader::unreachable(),
        store,
        Address::ZERO,
        ReconcileConfig::default(),
    );
    assert_eq!(node.markets().unwrap()[0].bets.len(), 1);
    assert_eq!(node.defiq("0xalice").unwrap(), 120);
}

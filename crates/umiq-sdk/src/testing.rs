//! Test doubles for exercising reconciliation and the node without a chain
//! or a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use alloy_primitives::U256;

use crate::chain::MarketReader;
use crate::contract::MarketRecord;
use crate::error::{Error, Result};
use crate::market::{Bet, BetSide, Market, MarketStatus};
use crate::reconcile::MarketPersistence;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// An open market with no bets and unset bounds.
pub fn market_fixture(id: &str) -> Market {
    Market {
        id: id.to_string(),
        title: format!("Market {id}"),
        description: String::new(),
        creator_id: "0xcreator".to_string(),
        created_at: 1_000,
        closes_at: 4_102_444_800_000,
        initial_pool: 0.0,
        min_bet: 0.0,
        max_bet: 0.0,
        status: MarketStatus::Open,
        result: None,
        bets: vec![],
        tx_hash: None,
    }
}

pub fn bet_fixture(user: &str, market_id: &str, amount: f64, side: BetSide) -> Bet {
    Bet::new(
        format!("{market_id}-{user}-{amount}-{}", side.as_str()),
        user,
        market_id,
        amount,
        side,
        1_000,
    )
    .expect("valid bet")
}

/// On-chain record with id `id` closing far in the future.
pub fn record_fixture(id: u64) -> MarketRecord {
    MarketRecord {
        id,
        creator: "0x00000000000000000000000000000000000000c0".to_string(),
        title: format!("Chain market {id}"),
        description: String::new(),
        closing_time: 4_102_444_800,
        total_yes_bets: U256::ZERO,
        total_no_bets: U256::ZERO,
        is_resolved: false,
        outcome: false,
        is_closed: false,
    }
}

// ---------------------------------------------------------------------------
// MockReader
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockChain {
    unreachable: bool,
    /// Index → record. `market_count` reports the largest index.
    records: HashMap<u64, MarketRecord>,
    failures: HashMap<u64, Error>,
    bulk_hashes: HashMap<u64, String>,
    bulk_scan_error: Option<Error>,
    lookup_hashes: HashMap<u64, String>,
    count_override: Option<u64>,
}

#[derive(Default)]
struct GateState {
    armed: bool,
    released: bool,
}

/// Blocks the next `market_count` call until released.
#[derive(Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<GateState>, Condvar)>,
}

impl Gate {
    pub fn release(&self) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().expect("gate lock");
        state.released = true;
        cvar.notify_all();
    }

    fn wait_if_armed(&self) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().expect("gate lock");
        if !state.armed {
            return;
        }
        state.armed = false;
        while !state.released {
            state = cvar.wait(state).expect("gate wait");
        }
    }

    fn arm(&self) {
        let (lock, _) = &*self.inner;
        let mut state = lock.lock().expect("gate lock");
        state.armed = true;
        state.released = false;
    }
}

/// In-memory [`MarketReader`] with scriptable failures.
#[derive(Default)]
pub struct MockReader {
    chain: Mutex<MockChain>,
    gate: Gate,
    count_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
}

impl MockReader {
    /// Reader whose contract holds markets `1..=n`.
    pub fn with_markets(n: u64) -> Self {
        let reader = Self::default();
        {
            let mut chain = reader.chain.lock().expect("mock lock");
            for id in 1..=n {
                chain.records.insert(id, record_fixture(id));
            }
        }
        reader
    }

    /// Reader whose every call fails as unreachable.
    pub fn unreachable() -> Self {
        let reader = Self::default();
        reader.chain.lock().expect("mock lock").unreachable = true;
        reader
    }

    pub fn failing_market(self, index: u64, error: Error) -> Self {
        self.chain.lock().expect("mock lock").failures.insert(index, error);
        self
    }

    pub fn with_record(self, index: u64, record: MarketRecord) -> Self {
        self.chain.lock().expect("mock lock").records.insert(index, record);
        self
    }

    pub fn with_bulk_hash(self, market_id: u64, hash: &str) -> Self {
        self.chain
            .lock()
            .expect("mock lock")
            .bulk_hashes
            .insert(market_id, hash.to_string());
        self
    }

    pub fn with_lookup_hash(self, market_id: u64, hash: &str) -> Self {
        self.chain
            .lock()
            .expect("mock lock")
            .lookup_hashes
            .insert(market_id, hash.to_string());
        self
    }

    pub fn failing_bulk_scan(self, error: Error) -> Self {
        self.chain.lock().expect("mock lock").bulk_scan_error = Some(error);
        self
    }

    /// Report `count` regardless of stored records.
    pub fn with_count(self, count: u64) -> Self {
        self.chain.lock().expect("mock lock").count_override = Some(count);
        self
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.chain.lock().expect("mock lock").unreachable = unreachable;
    }

    pub fn set_title(&self, index: u64, title: &str) {
        if let Some(record) = self.chain.lock().expect("mock lock").records.get_mut(&index) {
            record.title = title.to_string();
        }
    }

    /// Make the next `market_count` call block until the returned gate is
    /// released.
    pub fn hold_next_count(&self) -> Gate {
        self.gate.arm();
        self.gate.clone()
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }
}

impl MarketReader for MockReader {
    fn market_count(&self) -> Result<u64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.gate.wait_if_armed();
        let chain = self.chain.lock().expect("mock lock");
        if chain.unreachable {
            return Err(Error::ChainUnavailable("mock: unreachable".into()));
        }
        Ok(chain
            .count_override
            .unwrap_or_else(|| chain.records.keys().copied().max().unwrap_or(0)))
    }

    fn market(&self, index: u64) -> Result<MarketRecord> {
        let chain = self.chain.lock().expect("mock lock");
        if chain.unreachable {
            return Err(Error::ChainUnavailable("mock: unreachable".into()));
        }
        if let Some(error) = chain.failures.get(&index) {
            return Err(error.clone());
        }
        chain
            .records
            .get(&index)
            .cloned()
            .ok_or(Error::MarketNotFound(index))
    }

    fn creation_tx_map(&self) -> Result<HashMap<u64, String>> {
        let chain = self.chain.lock().expect("mock lock");
        match &chain.bulk_scan_error {
            Some(error) => Err(error.clone()),
            None => Ok(chain.bulk_hashes.clone()),
        }
    }

    fn creation_tx(&self, market_id: u64) -> Result<Option<String>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        let chain = self.chain.lock().expect("mock lock");
        Ok(chain.lookup_hashes.get(&market_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryState {
    markets: Option<Vec<Market>>,
    defiq: HashMap<String, i64>,
    fail_writes: bool,
    market_saves: usize,
}

/// Shared in-memory [`MarketPersistence`]. Clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn with_markets(markets: Vec<Market>) -> Self {
        let store = Self::default();
        store.inner.lock().expect("store lock").markets = Some(markets);
        store
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().expect("store lock").fail_writes = fail;
    }

    pub fn stored_markets(&self) -> Option<Vec<Market>> {
        self.inner.lock().expect("store lock").markets.clone()
    }

    pub fn stored_defiq(&self, address: &str) -> Option<i64> {
        self.inner
            .lock()
            .expect("store lock")
            .defiq
            .get(address)
            .copied()
    }

    pub fn market_saves(&self) -> usize {
        self.inner.lock().expect("store lock").market_saves
    }
}

impl MarketPersistence for MemoryStore {
    fn load_markets(&mut self) -> std::result::Result<Option<Vec<Market>>, String> {
        Ok(self.inner.lock().map_err(|e| e.to_string())?.markets.clone())
    }

    fn save_markets(&mut self, markets: &[Market]) -> std::result::Result<(), String> {
        let mut state = self.inner.lock().map_err(|e| e.to_string())?;
        if state.fail_writes {
            return Err("memory store: write refused".into());
        }
        state.markets = Some(markets.to_vec());
        state.market_saves += 1;
        Ok(())
    }

    fn load_defiq(&mut self, address: &str) -> std::result::Result<Option<i64>, String> {
        Ok(self
            .inner
            .lock()
            .map_err(|e| e.to_string())?
            .defiq
            .get(address)
            .copied())
    }

    fn save_defiq(&mut self, address: &str, score: i64) -> std::result::Result<(), String> {
        let mut state = self.inner.lock().map_err(|e| e.to_string())?;
        if state.fail_writes {
            return Err("memory store: write refused".into());
        }
        state.defiq.insert(address.to_string(), score);
        Ok(())
    }

    fn remove_defiq(&mut self, address: &str) -> std::result::Result<(), String> {
        let mut state = self.inner.lock().map_err(|e| e.to_string())?;
        if state.fail_writes {
            return Err("memory store: write refused".into());
        }
        state.defiq.remove(address);
        Ok(())
    }
}

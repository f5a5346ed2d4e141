//! `UmiqNode`: client coordinator.
//!
//! Owns the reconciler and the market state behind a single `&self` API.
//! Chain reads run via `tokio::task::spawn_blocking` so callers stay in async
//! land; state mutations are short and happen inline under the state lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::Address;
use tokio::sync::broadcast;

use crate::chain::MarketReader;
use crate::contract::{PlaceBetRequest, place_bet_request};
use crate::error::{Error, NodeError};
use crate::events::MarketEvent;
use crate::market::{Bet, BetSide, ClaimableReward, Market, MarketStatus, SHARE_PRICE};
use crate::reconcile::service::load_persisted;
use crate::reconcile::{
    FetchSummary, MarketPersistence, NoopStore, ReconcileConfig, Reconciler, attach_bets,
};
use crate::state::MarketStateStore;
use crate::stats::MarketStats;

const EVENT_CAPACITY: usize = 256;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// What happened to a [`UmiqNode::refresh`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The fetched list replaced the current one.
    Applied(FetchSummary),
    /// A newer refresh started, or the node shut down, before this one
    /// finished. Its result was dropped.
    Superseded,
}

// ── Struct ──────────────────────────────────────────────────────────────────

/// Coordinator that owns a [`Reconciler`] and the [`MarketStateStore`].
///
/// All public methods take `&self`; interior mutability is provided by
/// `Arc<Mutex<…>>`.
pub struct UmiqNode<R: MarketReader, S: MarketPersistence = NoopStore> {
    reconciler: Reconciler<R>,
    state: Arc<Mutex<MarketStateStore<S>>>,
    contract: Address,
    refresh_seq: AtomicU64,
    shut_down: AtomicBool,
    tx: broadcast::Sender<MarketEvent>,
}

// ── Construction ────────────────────────────────────────────────────────────

impl<R: MarketReader + 'static> UmiqNode<R, NoopStore> {
    /// Create a node without persistence.
    pub fn new(
        reader: R,
        contract: Address,
        config: ReconcileConfig,
    ) -> (Self, broadcast::Receiver<MarketEvent>) {
        Self::with_store(reader, NoopStore, contract, config)
    }
}

impl<R: MarketReader + 'static, S: MarketPersistence> UmiqNode<R, S> {
    /// Create a node whose state is seeded from, and written through to,
    /// `store`.
    pub fn with_store(
        reader: R,
        store: S,
        contract: Address,
        config: ReconcileConfig,
    ) -> (Self, broadcast::Receiver<MarketEvent>) {
        let (tx, rx) = broadcast::channel(EVENT_CAPACITY);
        (
            Self {
                reconciler: Reconciler::new(Arc::new(reader), config),
                state: Arc::new(Mutex::new(MarketStateStore::from_persisted(store))),
                contract,
                refresh_seq: AtomicU64::new(0),
                shut_down: AtomicBool::new(false),
                tx,
            },
            rx,
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.tx.subscribe()
    }

    pub fn reader(&self) -> &Arc<R> {
        self.reconciler.reader()
    }

    pub fn contract(&self) -> &Address {
        &self.contract
    }

    // ── Internal helpers ────────────────────────────────────────────────

    fn with_state<F, T>(&self, f: F) -> Result<T, NodeError>
    where
        F: FnOnce(&mut MarketStateStore<S>) -> T,
    {
        let mut guard = self.state.lock().map_err(|_| NodeError::MutexPoisoned)?;
        Ok(f(&mut guard))
    }

    fn emit(&self, event: MarketEvent) {
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    // ── Refresh lifecycle ───────────────────────────────────────────────

    /// Re-read markets from the chain and replace the current list.
    ///
    /// Overlapping calls are allowed; only the most recently started one is
    /// applied. Never fails for chain or storage problems: those resolve to
    /// the fallback dataset.
    pub async fn refresh(&self) -> Result<RefreshOutcome, NodeError> {
        let ticket = self.refresh_seq.fetch_add(1, Ordering::SeqCst) + 1;
        if self.is_shut_down() {
            return Ok(RefreshOutcome::Superseded);
        }

        let reconciler = self.reconciler.clone();
        let started = now_ms();
        let outcome = tokio::task::spawn_blocking(move || reconciler.fetch(started))
            .await
            .map_err(|e| NodeError::Task(e.to_string()))?;

        let mut state = self.state.lock().map_err(|_| NodeError::MutexPoisoned)?;
        if self.is_shut_down() || self.refresh_seq.load(Ordering::SeqCst) != ticket {
            log::debug!("discarding superseded refresh #{ticket}");
            return Ok(RefreshOutcome::Superseded);
        }

        let summary = outcome.summary();
        // In-memory entries win over stored ones with the same id.
        let mut local = state.markets().to_vec();
        if let Some(persisted) = load_persisted(state.persistence_mut()) {
            local.extend(persisted);
        }
        let markets = attach_bets(outcome.markets, Some(local.as_slice()));
        state.set_markets(markets);
        drop(state);

        log::info!("refresh #{ticket}: {summary}");
        self.emit(MarketEvent::MarketsRefreshed(summary.clone()));
        Ok(RefreshOutcome::Applied(summary))
    }

    /// Stop applying refresh results. Reads already in flight finish on the
    /// blocking pool and are discarded.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn markets(&self) -> Result<Vec<Market>, NodeError> {
        self.with_state(|s| s.markets().to_vec())
    }

    pub fn market(&self, market_id: &str) -> Result<Option<Market>, NodeError> {
        self.with_state(|s| s.market(market_id).cloned())
    }

    pub fn stats(&self, market_id: &str) -> Result<Option<MarketStats>, NodeError> {
        self.with_state(|s| s.stats(market_id))
    }

    pub fn claimable_rewards(&self) -> Result<Vec<ClaimableReward>, NodeError> {
        self.with_state(|s| s.claimable_rewards().to_vec())
    }

    pub fn rewards_for(&self, user_id: &str) -> Result<Vec<ClaimableReward>, NodeError> {
        self.with_state(|s| s.rewards_for(user_id))
    }

    pub fn defiq(&self, address: &str) -> Result<i64, NodeError> {
        self.with_state(|s| s.defiq(address))
    }

    // ── Mutations ───────────────────────────────────────────────────────

    pub fn add_market(&self, market: Market) -> Result<(), NodeError> {
        let market_id = market.id.clone();
        self.with_state(|s| s.add_market(market))??;
        self.emit(MarketEvent::MarketAdded { market_id });
        Ok(())
    }

    /// Attach `bet` to its market. `Ok(false)` if the market is unknown.
    pub fn add_bet(&self, bet: Bet) -> Result<bool, NodeError> {
        let event = MarketEvent::BetAdded(bet.clone());
        let added = self.with_state(|s| s.add_bet(bet))??;
        if added {
            self.emit(event);
        }
        Ok(added)
    }

    pub fn resolve_market(
        &self,
        market_id: &str,
        result: BetSide,
    ) -> Result<Option<Vec<ClaimableReward>>, NodeError> {
        let rewards = self.with_state(|s| s.resolve_market(market_id, result))?;
        if let Some(rewards) = &rewards {
            self.emit(MarketEvent::MarketResolved {
                market_id: market_id.to_string(),
                result,
                rewards: rewards.len(),
            });
        }
        Ok(rewards)
    }

    pub fn claim_reward(
        &self,
        user_id: &str,
        market_id: &str,
    ) -> Result<Option<ClaimableReward>, NodeError> {
        let claimed = self.with_state(|s| s.claim_reward(user_id, market_id))?;
        if let Some(reward) = &claimed {
            self.emit(MarketEvent::RewardClaimed(reward.clone()));
        }
        Ok(claimed)
    }

    pub fn set_defiq(&self, address: &str, score: i64) -> Result<(), NodeError> {
        self.with_state(|s| s.set_defiq(address, score))?;
        self.emit(MarketEvent::DefiqUpdated {
            address: address.to_lowercase(),
            score,
        });
        Ok(())
    }

    /// Drop the score for `address`, as on wallet disconnect.
    pub fn clear_defiq(&self, address: &str) -> Result<(), NodeError> {
        self.with_state(|s| s.clear_defiq(address))?;
        self.emit(MarketEvent::DefiqUpdated {
            address: address.to_lowercase(),
            score: 0,
        });
        Ok(())
    }

    /// Score for a freshly connected wallet, assigning one if needed.
    pub fn ensure_defiq(&self, address: &str) -> Result<i64, NodeError> {
        self.with_state(|s| s.ensure_defiq(address))
    }

    // ── Bet placement ───────────────────────────────────────────────────

    /// Build the `placeBet` transaction for an external wallet.
    ///
    /// The market must be an open on-chain market and the stake must sit
    /// within its bet bounds.
    pub fn place_bet_request(
        &self,
        market_id: &str,
        side: BetSide,
        shares: u64,
    ) -> Result<PlaceBetRequest, NodeError> {
        if shares == 0 {
            return Err(Error::InvalidBet("shares must be positive".into()).into());
        }
        let market = self
            .market(market_id)?
            .ok_or_else(|| Error::UnknownMarket(market_id.to_string()))?;
        if market.display_status(now_ms()) != MarketStatus::Open {
            return Err(Error::InvalidBet(format!("market {market_id} is not open")).into());
        }
        let amount = shares as f64 * SHARE_PRICE;
        if !market.within_bet_bounds(amount) {
            return Err(Error::InvalidBet(format!(
                "stake {amount} outside bounds [{}, {}]",
                market.min_bet, market.max_bet
            ))
            .into());
        }
        let onchain_id: u64 = market_id
            .parse()
            .map_err(|_| Error::UnknownMarket(format!("{market_id} is not an on-chain market")))?;
        Ok(place_bet_request(&self.contract, onchain_id, side, shares))
    }

    /// Record a bet the wallet has submitted.
    ///
    /// Returns `None` if the market has disappeared in the meantime.
    pub fn record_bet(
        &self,
        user_id: &str,
        market_id: &str,
        side: BetSide,
        shares: u64,
        tx_hash: Option<&str>,
    ) -> Result<Option<Bet>, NodeError> {
        let bet = Bet::from_shares(user_id, market_id, side, shares, now_ms())?;
        if let Some(hash) = tx_hash {
            log::info!("bet {} submitted in {hash}", bet.id);
        }
        Ok(self.add_bet(bet.clone())?.then_some(bet))
    }
}

use std::collections::HashMap;

use rand::Rng;

use crate::error::{Error, Result};
use crate::market::{Bet, BetSide, ClaimableReward, Market, MarketStatus};
use crate::reconcile::service::load_persisted;
use crate::reconcile::{MarketPersistence, NoopStore};
use crate::stats::{MarketStats, compute_rewards};

/// DeFiQ awarded per winning bet on resolution.
pub const DEFIQ_WIN_BONUS: i64 = 10;

/// Range of the score handed to a wallet on first connection.
pub const DEFIQ_INITIAL_RANGE: std::ops::RangeInclusive<i64> = 50..=200;

/// The client's market list, computed rewards and DeFiQ scores.
///
/// Every mutation writes the affected data through to `S` before returning.
/// Write failures are logged and otherwise ignored; in-memory state stays
/// authoritative.
pub struct MarketStateStore<S: MarketPersistence = NoopStore> {
    markets: Vec<Market>,
    rewards: Vec<ClaimableReward>,
    defiq: HashMap<String, i64>,
    store: S,
}

impl<S: MarketPersistence> MarketStateStore<S> {
    /// Empty state over `store`.
    pub fn new(store: S) -> Self {
        Self {
            markets: Vec::new(),
            rewards: Vec::new(),
            defiq: HashMap::new(),
            store,
        }
    }

    /// State seeded with whatever market list `store` already holds.
    pub fn from_persisted(mut store: S) -> Self {
        let markets = load_persisted(&mut store).unwrap_or_default();
        Self {
            markets,
            ..Self::new(store)
        }
    }

    pub fn persistence(&self) -> &S {
        &self.store
    }

    pub fn persistence_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // ── Reads ──────────────────────────────────────────────────────────

    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    pub fn market(&self, market_id: &str) -> Option<&Market> {
        self.markets.iter().find(|m| m.id == market_id)
    }

    pub fn claimable_rewards(&self) -> &[ClaimableReward] {
        &self.rewards
    }

    pub fn rewards_for(&self, user_id: &str) -> Vec<ClaimableReward> {
        self.rewards
            .iter()
            .filter(|r| r.user_id.eq_ignore_ascii_case(user_id))
            .cloned()
            .collect()
    }

    /// Fresh statistics for one market.
    pub fn stats(&self, market_id: &str) -> Option<MarketStats> {
        self.market(market_id).map(MarketStats::compute)
    }

    // ── Market mutations ───────────────────────────────────────────────

    /// Replace the whole list.
    pub fn set_markets(&mut self, markets: Vec<Market>) {
        self.markets = markets;
        self.persist_markets();
    }

    /// Prepend a newly created market.
    pub fn add_market(&mut self, market: Market) -> Result<()> {
        market.validate()?;
        if self.market(&market.id).is_some() {
            return Err(Error::DuplicateMarket(market.id));
        }
        self.markets.insert(0, market);
        self.persist_markets();
        Ok(())
    }

    /// Append `bet` to its market.
    ///
    /// Returns `Ok(false)` and leaves state untouched when the market is not
    /// known.
    pub fn add_bet(&mut self, bet: Bet) -> Result<bool> {
        bet.validate()?;
        let Some(market) = self.markets.iter_mut().find(|m| m.id == bet.market_id) else {
            log::debug!("dropping bet {} for unknown market {}", bet.id, bet.market_id);
            return Ok(false);
        };
        market.bets.push(bet);
        self.persist_markets();
        Ok(true)
    }

    /// Resolve an open market and credit its winners.
    ///
    /// Returns the rewards created, or `None` if the market is unknown or
    /// already resolved. A market whose rewards were already issued counts
    /// as resolved even if a refresh has since reopened it.
    pub fn resolve_market(
        &mut self,
        market_id: &str,
        result: BetSide,
    ) -> Option<Vec<ClaimableReward>> {
        if self.rewards.iter().any(|r| r.market_id == market_id) {
            log::debug!("market {market_id} already paid out, not resolving again");
            return None;
        }
        let market = self.markets.iter_mut().find(|m| m.id == market_id)?;
        if market.is_resolved() {
            return None;
        }
        market.status = MarketStatus::Resolved;
        market.result = Some(result);

        let rewards = compute_rewards(market, result);
        let winners: Vec<String> = market
            .bets
            .iter()
            .filter(|b| b.side == result)
            .map(|b| b.user_id.clone())
            .collect();

        self.rewards.extend(rewards.iter().cloned());
        self.persist_markets();
        for user in winners {
            let score = self.defiq(&user) + DEFIQ_WIN_BONUS;
            self.set_defiq(&user, score);
        }
        Some(rewards)
    }

    /// Mark the first unclaimed reward for `(user_id, market_id)` as claimed.
    pub fn claim_reward(&mut self, user_id: &str, market_id: &str) -> Option<ClaimableReward> {
        let reward = self.rewards.iter_mut().find(|r| {
            !r.claimed && r.market_id == market_id && r.user_id.eq_ignore_ascii_case(user_id)
        })?;
        reward.claimed = true;
        Some(reward.clone())
    }

    // ── DeFiQ ──────────────────────────────────────────────────────────

    /// Score for `address`, 0 if none has been recorded.
    pub fn defiq(&mut self, address: &str) -> i64 {
        self.stored_defiq(address).unwrap_or(0)
    }

    pub fn set_defiq(&mut self, address: &str, score: i64) {
        let key = address.to_lowercase();
        if let Err(e) = self.store.save_defiq(&key, score) {
            log::warn!("failed to persist DeFiQ for {key}: {e}");
        }
        self.defiq.insert(key, score);
    }

    /// Forget the score for `address`. Reads return 0 until a new score is
    /// set or assigned.
    pub fn clear_defiq(&mut self, address: &str) {
        let key = address.to_lowercase();
        if let Err(e) = self.store.remove_defiq(&key) {
            log::warn!("failed to remove DeFiQ for {key}: {e}");
        }
        self.defiq.remove(&key);
    }

    /// Existing score for `address`, or a fresh random one on first use.
    pub fn ensure_defiq(&mut self, address: &str) -> i64 {
        self.ensure_defiq_with(address, &mut rand::thread_rng())
    }

    pub fn ensure_defiq_with<G: Rng>(&mut self, address: &str, rng: &mut G) -> i64 {
        if let Some(score) = self.stored_defiq(address) {
            return score;
        }
        let score = rng.gen_range(DEFIQ_INITIAL_RANGE);
        self.set_defiq(address, score);
        score
    }

    fn stored_defiq(&mut self, address: &str) -> Option<i64> {
        let key = address.to_lowercase();
        if let Some(score) = self.defiq.get(&key) {
            return Some(*score);
        }
        match self.store.load_defiq(&key) {
            Ok(Some(score)) => {
                self.defiq.insert(key, score);
                Some(score)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("failed to load DeFiQ for {key}: {e}");
                None
            }
        }
    }

    fn persist_markets(&mut self) {
        if let Err(e) = self.store.save_markets(&self.markets) {
            log::warn!("failed to persist markets: {e}");
        }
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Price of one share in the native currency.
pub const SHARE_PRICE: f64 = 0.5;

static BET_SEQ: AtomicU64 = AtomicU64::new(0);

/// Which side of a yes/no question a bet backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetSide {
    Yes,
    No,
}

impl BetSide {
    pub fn as_str(self) -> &'static str {
        match self {
            BetSide::Yes => "yes",
            BetSide::No => "no",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            BetSide::Yes => BetSide::No,
            BetSide::No => BetSide::Yes,
        }
    }

    /// The `prediction` flag the contract's `placeBet` expects.
    pub fn as_prediction(self) -> bool {
        matches!(self, BetSide::Yes)
    }
}

impl std::str::FromStr for BetSide {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yes" => Ok(BetSide::Yes),
            "no" => Ok(BetSide::No),
            _ => Err(format!("invalid bet side: {s}")),
        }
    }
}

/// Stored lifecycle of a market. `Closed` is only ever derived for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Closed,
    Resolved,
}

/// A single wager attached to a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: String,
    pub user_id: String,
    pub market_id: String,
    pub amount: f64,
    pub side: BetSide,
    pub timestamp: i64,
}

impl Bet {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        market_id: impl Into<String>,
        amount: f64,
        side: BetSide,
        timestamp: i64,
    ) -> Result<Self> {
        let bet = Bet {
            id: id.into(),
            user_id: user_id.into(),
            market_id: market_id.into(),
            amount,
            side,
            timestamp,
        };
        bet.validate()?;
        Ok(bet)
    }

    /// Build the client-side record for a purchase of `shares` shares.
    ///
    /// The id follows `{market_id}-{side}-{timestamp}-{seq}`, where `seq` is
    /// a process-wide counter so bets within one millisecond stay distinct.
    pub fn from_shares(
        user_id: impl Into<String>,
        market_id: &str,
        side: BetSide,
        shares: u64,
        timestamp: i64,
    ) -> Result<Self> {
        let seq = BET_SEQ.fetch_add(1, Ordering::Relaxed);
        let id = format!("{market_id}-{}-{timestamp}-{seq}", side.as_str());
        Bet::new(
            id,
            user_id,
            market_id,
            shares as f64 * SHARE_PRICE,
            side,
            timestamp,
        )
    }

    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidBet(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        if self.market_id.is_empty() {
            return Err(Error::InvalidBet("market id is empty".into()));
        }
        Ok(())
    }
}

/// A yes/no prediction question and the bets this client has seen on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: String,
    pub title: String,
    pub description: String,
    pub creator_id: String,
    pub created_at: i64,
    pub closes_at: i64,
    pub initial_pool: f64,
    pub min_bet: f64,
    pub max_bet: f64,
    pub status: MarketStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<BetSide>,
    #[serde(default)]
    pub bets: Vec<Bet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl Market {
    pub fn is_resolved(&self) -> bool {
        self.status == MarketStatus::Resolved
    }

    /// Status as shown to a user at `now_ms`: open markets past their
    /// closing time read as closed.
    pub fn display_status(&self, now_ms: i64) -> MarketStatus {
        match self.status {
            MarketStatus::Resolved => MarketStatus::Resolved,
            MarketStatus::Closed => MarketStatus::Closed,
            MarketStatus::Open if self.closes_at <= now_ms => MarketStatus::Closed,
            MarketStatus::Open => MarketStatus::Open,
        }
    }

    /// Whether `amount` sits within the advisory bet bounds. A zero bound is
    /// treated as unset.
    pub fn within_bet_bounds(&self, amount: f64) -> bool {
        let above_min = self.min_bet <= 0.0 || amount >= self.min_bet;
        let below_max = self.max_bet <= 0.0 || amount <= self.max_bet;
        above_min && below_max
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidMarket("id is empty".into()));
        }
        if self.closes_at <= self.created_at {
            return Err(Error::InvalidMarket(format!(
                "closesAt ({}) must be after createdAt ({})",
                self.closes_at, self.created_at
            )));
        }
        if !self.initial_pool.is_finite() || self.initial_pool < 0.0 {
            return Err(Error::InvalidMarket(format!(
                "initialPool must be non-negative, got {}",
                self.initial_pool
            )));
        }
        if self.min_bet > 0.0 && self.max_bet > 0.0 && self.min_bet > self.max_bet {
            return Err(Error::InvalidMarket(format!(
                "minBet ({}) exceeds maxBet ({})",
                self.min_bet, self.max_bet
            )));
        }
        if self.status == MarketStatus::Resolved && self.result.is_none() {
            return Err(Error::InvalidMarket("resolved market has no result".into()));
        }
        Ok(())
    }
}

/// Locally computed payout owed to a winning bettor. Not authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimableReward {
    pub user_id: String,
    pub market_id: String,
    pub amount: f64,
    pub claimed: bool,
}

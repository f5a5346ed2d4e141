use crate::market::{Bet, BetSide, ClaimableReward};
use crate::reconcile::FetchSummary;

/// Events broadcast by [`UmiqNode`](crate::node::UmiqNode) after a state
/// change has been applied.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    /// A refresh replaced the market list.
    MarketsRefreshed(FetchSummary),
    /// A locally created market was added.
    MarketAdded { market_id: String },
    /// A bet was attached to a known market.
    BetAdded(Bet),
    /// A market was resolved and `rewards` payouts were created.
    MarketResolved {
        market_id: String,
        result: BetSide,
        rewards: usize,
    },
    RewardClaimed(ClaimableReward),
    DefiqUpdated { address: String, score: i64 },
}

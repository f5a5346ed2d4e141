pub mod chain;
pub mod contract;
pub mod error;
pub mod events;
pub mod market;
pub mod network;
pub mod node;
pub mod reconcile;
pub mod state;
pub mod stats;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Core types
pub use chain::{ChainBackend, ChainConfig, ContractReader, JsonRpcBackend, LogFilter, MarketReader};
pub use contract::{MarketRecord, PlaceBetRequest, WEI_PER_SHARE};
pub use error::{Error, NodeError, Result};
pub use events::MarketEvent;
pub use market::{Bet, BetSide, ClaimableReward, Market, MarketStatus, SHARE_PRICE};
pub use network::Network;
pub use node::{RefreshOutcome, UmiqNode, now_ms};
pub use state::{DEFIQ_INITIAL_RANGE, DEFIQ_WIN_BONUS, MarketStateStore};
pub use stats::MarketStats;

// Reconciliation
pub use reconcile::{
    FallbackReason, FetchOutcome, FetchSummary, MarketPersistence, MarketSource, NoopStore,
    ReconcileConfig, Reconciler, TxResolutionStats, TxSource, attach_bets, defiq_key,
    fallback_markets,
};

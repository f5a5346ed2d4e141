use std::collections::HashMap;

use super::fallback::static_tx_table;

/// Markets fetched per refresh unless configured otherwise.
pub const DEFAULT_MARKET_WINDOW: u64 = 16;

/// Configuration for the [`Reconciler`](super::service::Reconciler).
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Only fetch the newest `n` markets. `None` or `Some(0)` fetches every
    /// index.
    pub market_window: Option<u64>,
    /// Fetch per-market records on the rayon pool.
    pub parallel_fetch: bool,
    /// Issue a filtered log query per market when earlier tiers miss.
    pub per_market_lookup: bool,
    /// Market id → creation tx hash, consulted after the bulk log scan.
    pub static_tx_hashes: HashMap<u64, String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            market_window: Some(DEFAULT_MARKET_WINDOW),
            parallel_fetch: true,
            per_market_lookup: true,
            static_tx_hashes: static_tx_table(),
        }
    }
}

impl ReconcileConfig {
    /// 1-based indices to fetch for a contract holding `count` markets.
    pub fn indices(&self, count: u64) -> std::ops::RangeInclusive<u64> {
        let first = match self.market_window {
            Some(n) if n > 0 => count.saturating_sub(n).saturating_add(1).max(1),
            _ => 1,
        };
        first..=count
    }
}

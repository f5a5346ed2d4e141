//! Reconciliation of on-chain market metadata with locally persisted bets.

pub mod config;
pub mod fallback;
pub mod service;
pub mod store_trait;

pub use config::ReconcileConfig;
pub use fallback::{fallback_markets, static_tx_table};
pub use service::{
    FallbackReason, FetchOutcome, FetchSummary, MarketSource, Reconciler, TxResolutionStats,
    TxSource, attach_bets,
};
pub use store_trait::{MarketPersistence, NoopStore};

/// Storage key of the persisted market list.
pub const MARKETS_KEY: &str = "umiq_markets";

/// Prefix of per-address DeFiQ keys.
pub const DEFIQ_KEY_PREFIX: &str = "umiq_defiq:";

/// Storage key for an address's DeFiQ score. Addresses compare
/// case-insensitively.
pub fn defiq_key(address: &str) -> String {
    format!("{DEFIQ_KEY_PREFIX}{}", address.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defiq_key_is_case_insensitive() {
        assert_eq!(defiq_key("0xABcd"), "umiq_defiq:0xabcd");
        assert_eq!(defiq_key("0xABcd"), defiq_key("0xabCD"));
    }
}

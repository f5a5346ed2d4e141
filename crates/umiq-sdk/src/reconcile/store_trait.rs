use crate::market::Market;

/// Trait abstracting the local key/value mirror used by reconciliation and
/// the market state store.
///
/// This avoids a circular dependency between `umiq-sdk` and `umiq-store`.
/// The `umiq-store` crate implements this trait for `UmiqStore`.
///
/// Implementations should treat an unparseable stored value as absent.
/// Callers log and swallow every `Err`.
pub trait MarketPersistence: Send + 'static {
    /// Last saved market list, or `None` if nothing usable is stored.
    fn load_markets(&mut self) -> Result<Option<Vec<Market>>, String>;

    /// Overwrite the stored market list.
    fn save_markets(&mut self, markets: &[Market]) -> Result<(), String>;

    /// Stored DeFiQ score for a (lowercased) address.
    fn load_defiq(&mut self, address: &str) -> Result<Option<i64>, String>;

    fn save_defiq(&mut self, address: &str, score: i64) -> Result<(), String>;

    /// Drop the stored score for a (lowercased) address, if any.
    fn remove_defiq(&mut self, address: &str) -> Result<(), String>;
}

/// A no-op store implementation for when persistence is not needed.
pub struct NoopStore;

impl MarketPersistence for NoopStore {
    fn load_markets(&mut self) -> Result<Option<Vec<Market>>, String> {
        Ok(None)
    }

    fn save_markets(&mut self, _markets: &[Market]) -> Result<(), String> {
        Ok(())
    }

    fn load_defiq(&mut self, _address: &str) -> Result<Option<i64>, String> {
        Ok(None)
    }

    fn save_defiq(&mut self, _address: &str, _score: i64) -> Result<(), String> {
        Ok(())
    }

    fn remove_defiq(&mut self, _address: &str) -> Result<(), String> {
        Ok(())
    }
}

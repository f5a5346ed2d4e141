use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use umiq_sdk::Market;
use umiq_sdk::reconcile::{MARKETS_KEY, defiq_key};

use crate::error::StoreError;
use crate::models::{KvEntryRow, NewKvEntryRow};
use crate::schema::kv_entries;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

// --- Public types ---

/// One stored value with its last write time (RFC 3339).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

impl From<KvEntryRow> for StoreEntry {
    fn from(row: KvEntryRow) -> Self {
        StoreEntry {
            key: row.key,
            value: row.value,
            updated_at: row.updated_at,
        }
    }
}

// --- Store ---

/// SQLite-backed key/value mirror of client state.
pub struct UmiqStore {
    conn: SqliteConnection,
}

impl UmiqStore {
    /// Open (or create) a store at `path` and run pending migrations.
    pub fn open(path: &str) -> crate::Result<Self> {
        let mut conn = SqliteConnection::establish(path)?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(UmiqStore { conn })
    }

    /// Open an in-memory store for tests.
    pub fn open_in_memory() -> crate::Result<Self> {
        Self::open(":memory:")
    }

    // ==================== Raw entries ====================

    pub fn get_entry(&mut self, key: &str) -> crate::Result<Option<StoreEntry>> {
        let row = kv_entries::table
            .find(key)
            .select(KvEntryRow::as_select())
            .first(&mut self.conn)
            .optional()?;
        Ok(row.map(StoreEntry::from))
    }

    pub fn get(&mut self, key: &str) -> crate::Result<Option<String>> {
        Ok(self.get_entry(key)?.map(|e| e.value))
    }

    /// Insert or overwrite `key`.
    pub fn put(&mut self, key: &str, value: &str) -> crate::Result<()> {
        let row = NewKvEntryRow {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        diesel::replace_into(kv_entries::table)
            .values(&row)
            .execute(&mut self.conn)?;
        Ok(())
    }

    /// Delete `key`. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> crate::Result<bool> {
        let n = diesel::delete(kv_entries::table.find(key)).execute(&mut self.conn)?;
        Ok(n > 0)
    }

    // ==================== Markets ====================

    /// The stored market list. A value that no longer parses reads as
    /// absent.
    pub fn load_markets(&mut self) -> crate::Result<Option<Vec<Market>>> {
        let Some(raw) = self.get(MARKETS_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(markets) => Ok(Some(markets)),
            Err(e) => {
                log::warn!("ignoring unparseable {MARKETS_KEY} value: {e}");
                Ok(None)
            }
        }
    }

    pub fn save_markets(&mut self, markets: &[Market]) -> crate::Result<()> {
        let json = serde_json::to_string(markets)?;
        self.put(MARKETS_KEY, &json)
    }

    // ==================== DeFiQ ====================

    pub fn load_defiq(&mut self, address: &str) -> crate::Result<Option<i64>> {
        let key = defiq_key(address);
        let Some(raw) = self.get(&key)? else {
            return Ok(None);
        };
        match raw.trim().parse() {
            Ok(score) => Ok(Some(score)),
            Err(_) => {
                log::warn!("ignoring non-integer {key} value: {raw:?}");
                Ok(None)
            }
        }
    }

    pub fn save_defiq(&mut self, address: &str, score: i64) -> crate::Result<()> {
        self.put(&defiq_key(address), &score.to_string())
    }

    /// Delete the score for `address`. Returns whether one was stored.
    pub fn remove_defiq(&mut self, address: &str) -> crate::Result<bool> {
        self.remove(&defiq_key(address))
    }
}

// ==================== MarketPersistence impl ====================

impl umiq_sdk::MarketPersistence for UmiqStore {
    fn load_markets(&mut self) -> Result<Option<Vec<Market>>, String> {
        UmiqStore::load_markets(self).map_err(|e| format!("{e}"))
    }

    fn save_markets(&mut self, markets: &[Market]) -> Result<(), String> {
        UmiqStore::save_markets(self, markets).map_err(|e| format!("{e}"))
    }

    fn load_defiq(&mut self, address: &str) -> Result<Option<i64>, String> {
        UmiqStore::load_defiq(self, address).map_err(|e| format!("{e}"))
    }

    fn save_defiq(&mut self, address: &str, score: i64) -> Result<(), String> {
        UmiqStore::save_defiq(self, address, score).map_err(|e| format!("{e}"))
    }

    fn remove_defiq(&mut self, address: &str) -> Result<(), String> {
        UmiqStore::remove_defiq(self, address)
            .map(|_| ())
            .map_err(|e| format!("{e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_overwrites() {
        let mut store = UmiqStore::open_in_memory().unwrap();
        store.put("k", "one").unwrap();
        store.put("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
        assert!(store.get_entry("k").unwrap().unwrap().updated_at.contains('T'));
    }

    #[test]
    fn remove_reports_presence() {
        let mut store = UmiqStore::open_in_memory().unwrap();
        store.put("k", "v").unwrap();
        assert!(store.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn corrupt_markets_read_as_absent() {
        let mut store = UmiqStore::open_in_memory().unwrap();
        store.put(MARKETS_KEY, "{not json").unwrap();
        assert_eq!(store.load_markets().unwrap(), None);
    }

    #[test]
    fn corrupt_defiq_reads_as_absent() {
        let mut store = UmiqStore::open_in_memory().unwrap();
        store.put(&defiq_key("0xabc"), "lots").unwrap();
        assert_eq!(store.load_defiq("0xabc").unwrap(), None);
    }
}

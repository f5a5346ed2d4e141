use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use umiq_sdk::{
    ChainConfig, ClaimableReward, ContractReader, FetchSummary, JsonRpcBackend, Market,
    MarketStats, MarketStatus, Network, ReconcileConfig, UmiqNode, now_ms,
};
use umiq_store::UmiqStore;

use crate::error::AppError;

const CONFIG_FILE: &str = "network_config.json";
const DB_FILE: &str = "umiq.db";

pub type LiveNode = UmiqNode<ContractReader<JsonRpcBackend>, UmiqStore>;

// ============================================================================
// Config
// ============================================================================

/// Persisted as `network_config.json` in the app data dir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub network: Network,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_window: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: Network::SomniaTestnet,
            rpc_url: None,
            contract_address: None,
            log_level: None,
            market_window: None,
        }
    }
}

impl AppConfig {
    pub fn load(dir: &Path) -> Option<Self> {
        let contents = fs::read_to_string(dir.join(CONFIG_FILE)).ok()?;
        serde_json::from_str(&contents).ok()
    }

    pub fn save(&self, dir: &Path) {
        let _ = fs::create_dir_all(dir);
        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = fs::write(dir.join(CONFIG_FILE), json);
        }
    }

    /// Apply `UMIQ_*` overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `UMIQ_*` overrides from `lookup`. Unparseable values are
    /// ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(network) = non_empty("UMIQ_NETWORK") {
            match network.parse() {
                Ok(network) => self.network = network,
                Err(e) => log::warn!("ignoring UMIQ_NETWORK: {e}"),
            }
        }
        if let Some(url) = non_empty("UMIQ_RPC_URL") {
            self.rpc_url = Some(url);
        }
        if let Some(address) = non_empty("UMIQ_CONTRACT_ADDRESS") {
            self.contract_address = Some(address);
        }
        self
    }

    pub fn chain_config(&self) -> ChainConfig {
        let mut config = ChainConfig::for_network(self.network);
        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        }
        if let Some(address) = &self.contract_address {
            config.contract_address = address.clone();
        }
        config
    }

    /// `marketWindow: 0` reads every market; unset keeps the default window.
    pub fn reconcile_config(&self) -> ReconcileConfig {
        let mut config = ReconcileConfig::default();
        if let Some(window) = self.market_window {
            config.market_window = Some(window);
        }
        config
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level
            .as_deref()
            .and_then(|l| l.parse().ok())
            .unwrap_or(log::LevelFilter::Info)
    }
}

// ============================================================================
// Snapshot (sent to the presentation layer)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub network: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub contract_address: String,
    pub native_symbol: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletStatus {
    pub address: String,
    pub defiq: i64,
}

/// A market plus everything derived from it for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketView {
    #[serde(flatten)]
    pub market: Market,
    pub display_status: MarketStatus,
    pub stats: MarketStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

impl MarketView {
    pub fn new(market: Market, network: Network, now_ms: i64) -> Self {
        let explorer_url = market
            .tx_hash
            .as_deref()
            .and_then(|h| network.explorer_tx_url(h));
        Self {
            display_status: market.display_status(now_ms),
            stats: MarketStats::compute(&market),
            explorer_url,
            market,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSnapshot {
    pub revision: u64,
    pub network_status: NetworkStatus,
    pub wallet: Option<WalletStatus>,
    pub markets: Vec<MarketView>,
    /// Description of where the market list came from, after a refresh.
    pub market_source: Option<String>,
    pub using_fallback: bool,
    pub claimable_rewards: Vec<ClaimableReward>,
}

// ============================================================================
// App state manager
// ============================================================================

pub struct AppStateManager {
    app_data_dir: PathBuf,
    config: AppConfig,
    node: Option<Arc<LiveNode>>,
    wallet: Option<String>,
    last_refresh: Option<FetchSummary>,
    revision: u64,
}

impl AppStateManager {
    pub fn new(app_data_dir: PathBuf) -> Self {
        let config = AppConfig::load(&app_data_dir)
            .unwrap_or_default()
            .with_env();
        Self::with_config(app_data_dir, config)
    }

    pub fn with_config(app_data_dir: PathBuf, config: AppConfig) -> Self {
        Self {
            app_data_dir,
            config,
            node: None,
            wallet: None,
            last_refresh: None,
            revision: 0,
        }
    }

    /// Open the store and build the node for the configured network.
    pub fn initialize(&mut self) -> Result<(), AppError> {
        fs::create_dir_all(&self.app_data_dir)?;
        let db_path = self.app_data_dir.join(DB_FILE);
        let store = UmiqStore::open(&db_path.to_string_lossy())?;

        let chain_config = self.config.chain_config();
        let reader = ContractReader::connect(&chain_config)?;
        let (node, _rx) = UmiqNode::with_store(
            reader,
            store,
            chain_config.contract()?,
            self.config.reconcile_config(),
        );
        log::info!(
            "initialized {} (rpc {}, contract {})",
            self.config.network.as_str(),
            chain_config.rpc_url,
            chain_config.contract_address
        );

        if let Some(old) = self.node.replace(Arc::new(node)) {
            old.shutdown();
        }
        self.last_refresh = None;
        Ok(())
    }

    pub fn app_data_dir(&self) -> &Path {
        &self.app_data_dir
    }

    pub fn is_first_launch(&self) -> bool {
        !self.app_data_dir.join(CONFIG_FILE).exists()
    }

    pub fn is_initialized(&self) -> bool {
        self.node.is_some()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Switch networks, persist the choice and rebuild the node.
    pub fn set_network(&mut self, network: Network) -> Result<AppSnapshot, AppError> {
        self.config.network = network;
        self.config.rpc_url = None;
        self.config.contract_address = None;
        self.config.save(&self.app_data_dir);
        self.initialize()?;
        self.bump_revision();
        Ok(self.snapshot())
    }

    pub fn node(&self) -> Result<Arc<LiveNode>, AppError> {
        self.node.clone().ok_or(AppError::NotInitialized)
    }

    pub fn wallet(&self) -> Option<&str> {
        self.wallet.as_deref()
    }

    pub fn require_wallet(&self) -> Result<String, AppError> {
        self.wallet.clone().ok_or(AppError::WalletNotConnected)
    }

    /// Remember `address` as the connected wallet and make sure it has a
    /// DeFiQ score.
    pub fn connect_wallet(&mut self, address: &str) -> Result<WalletStatus, AppError> {
        let node = self.node()?;
        let address = address.to_lowercase();
        let defiq = node.ensure_defiq(&address)?;
        self.wallet = Some(address.clone());
        self.bump_revision();
        Ok(WalletStatus { address, defiq })
    }

    /// Forget the connected wallet and reset its DeFiQ score.
    pub fn disconnect_wallet(&mut self) -> Result<(), AppError> {
        let Some(address) = self.wallet.take() else {
            return Ok(());
        };
        if let Some(node) = &self.node {
            node.clear_defiq(&address)?;
        }
        self.bump_revision();
        Ok(())
    }

    pub fn record_refresh(&mut self, summary: FetchSummary) {
        self.last_refresh = Some(summary);
        self.bump_revision();
    }

    pub fn last_refresh(&self) -> Option<&FetchSummary> {
        self.last_refresh.as_ref()
    }

    pub fn network_status(&self) -> NetworkStatus {
        let chain = self.config.chain_config();
        NetworkStatus {
            network: self.config.network.as_str().to_string(),
            chain_id: self.config.network.chain_id(),
            rpc_url: chain.rpc_url,
            contract_address: chain.contract_address,
            native_symbol: self.config.network.native_symbol().to_string(),
        }
    }

    pub fn market_views(&self) -> Vec<MarketView> {
        let now = now_ms();
        let network = self.config.network;
        self.node
            .as_ref()
            .and_then(|n| n.markets().ok())
            .unwrap_or_default()
            .into_iter()
            .map(|m| MarketView::new(m, network, now))
            .collect()
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let node = self.node.as_ref();
        let wallet = self.wallet.as_ref().map(|address| WalletStatus {
            address: address.clone(),
            defiq: node.and_then(|n| n.defiq(address).ok()).unwrap_or(0),
        });
        let claimable_rewards = match (node, &self.wallet) {
            (Some(n), Some(address)) => n.rewards_for(address).unwrap_or_default(),
            (Some(n), None) => n.claimable_rewards().unwrap_or_default(),
            (None, _) => vec![],
        };

        AppSnapshot {
            revision: self.revision,
            network_status: self.network_status(),
            wallet,
            markets: self.market_views(),
            market_source: self.last_refresh.as_ref().map(|s| s.source.to_string()),
            using_fallback: self
                .last_refresh
                .as_ref()
                .is_some_and(|s| s.source.is_fallback()),
            claimable_rewards,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn bump_revision(&mut self) {
        self.revision += 1;
    }
}

impl Drop for AppStateManager {
    fn drop(&mut self) {
        if let Some(node) = &self.node {
            node.shutdown();
        }
    }
}

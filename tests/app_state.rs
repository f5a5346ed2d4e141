use std::sync::Mutex;

use umiq_lib::commands::{self, CreateMarketRequest};
use umiq_lib::state::{AppConfig, AppStateManager};
use umiq_sdk::{DEFIQ_INITIAL_RANGE, Network, fallback_markets, now_ms};

const WALLET: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

/// Manager pointed at a port nothing listens on, so every refresh falls back.
fn offline_manager(dir: &std::path::Path) -> Mutex<AppStateManager> {
    let config = AppConfig {
        rpc_url: Some("http://127.0.0.1:1".into()),
        ..Default::default()
    };
    let mut mgr = AppStateManager::with_config(dir.to_path_buf(), config);
    mgr.initialize().unwrap();
    Mutex::new(mgr)
}

// ==================== Config ====================

#[test]
fn config_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(AppConfig::load(dir.path()), None);

    let config = AppConfig {
        network: Network::Localhost,
        market_window: Some(25),
        log_level: Some("debug".into()),
        ..Default::default()
    };
    config.save(dir.path());
    assert_eq!(AppConfig::load(dir.path()), Some(config.clone()));

    let raw = std::fs::read_to_string(dir.path().join("network_config.json")).unwrap();
    assert!(raw.contains("\"marketWindow\": 25"));
    assert!(raw.contains("\"network\": \"localhost\""));
    assert_eq!(config.log_level(), log::LevelFilter::Debug);
}

#[test]
fn overrides_replace_endpoint_settings() {
    let config = AppConfig::default().with_overrides(|key| match key {
        "UMIQ_NETWORK" => Some("localhost".into()),
        "UMIQ_RPC_URL" => Some("http://10.0.0.2:8545".into()),
        "UMIQ_CONTRACT_ADDRESS" => Some("  ".into()),
        _ => None,
    });
    assert_eq!(config.network, Network::Localhost);

    let chain = config.chain_config();
    assert_eq!(chain.rpc_url, "http://10.0.0.2:8545");
    assert_eq!(
        chain.contract_address,
        Network::Localhost.default_contract_address()
    );
}

#[test]
fn bad_network_override_is_ignored() {
    let config = AppConfig::default().with_overrides(|key| {
        (key == "UMIQ_NETWORK").then(|| "mainnet".to_string())
    });
    assert_eq!(config.network, Network::SomniaTestnet);
}

// ==================== Refresh / snapshot ====================

#[test]
fn offline_refresh_serves_fallback_markets() {
    let dir = tempfile::tempdir().unwrap();
    let state = offline_manager(dir.path());
    let rt = runtime();

    let response = rt.block_on(commands::refresh_markets(&state)).unwrap();
    assert!(response.applied);
    let snapshot = response.snapshot;
    assert!(snapshot.using_fallback);
    assert_eq!(snapshot.revision, 1);
    assert_eq!(snapshot.markets.len(), fallback_markets().len());
    assert!(snapshot.markets[0].explorer_url.is_some());

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["networkStatus"]["chainId"], 50312);
    assert!(json["markets"][0].get("displayStatus").is_some());
    assert!(json["markets"][0].get("closesAt").is_some());

    drop(state);
}

#[test]
fn commands_require_initialization_and_wallet() {
    let dir = tempfile::tempdir().unwrap();
    let uninit = Mutex::new(AppStateManager::with_config(
        dir.path().to_path_buf(),
        AppConfig::default(),
    ));
    assert!(commands::get_defiq(&uninit, WALLET).is_err());

    let state = offline_manager(dir.path());
    let err = commands::claim_reward(&state, "1").unwrap_err();
    assert!(err.contains("wallet"));
    assert!(commands::connect_wallet(&state, "not-an-address").is_err());
}

#[test]
fn local_market_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let state = offline_manager(dir.path());

    let wallet = commands::connect_wallet(&state, WALLET).unwrap();
    assert_eq!(wallet.address, WALLET.to_lowercase());
    assert!(DEFIQ_INITIAL_RANGE.contains(&wallet.defiq));

    let view = commands::create_market(
        &state,
        CreateMarketRequest {
            title: "Will it snow tomorrow?".into(),
            description: "Local weather".into(),
            closes_at: now_ms() + 86_400_000,
            initial_pool: 0.0,
            min_bet: 0.0,
            max_bet: 0.0,
        },
    )
    .unwrap();
    let id = view.market.id.clone();
    assert!(id.starts_with("local-"));
    assert_eq!(view.market.creator_id, WALLET.to_lowercase());

    let bet = commands::record_bet(&state, &id, "yes", 4, None).unwrap();
    assert_eq!(bet.amount, 2.0);
    assert!(commands::record_bet(&state, "missing", "yes", 1, None).is_err());

    // Local markets have no on-chain id to bet against.
    assert!(commands::prepare_bet(&state, &id, "yes", 1).is_err());

    let stats = commands::get_market_stats(&state, &id).unwrap();
    assert_eq!(stats.total_pool, 2.0);
    assert_eq!(stats.yes_probability, 1.0);

    let rewards = commands::resolve_market(&state, &id, "yes").unwrap();
    assert_eq!(rewards.len(), 1);
    assert_eq!(commands::get_claimable_rewards(&state).unwrap().len(), 1);

    let claimed = commands::claim_reward(&state, &id).unwrap();
    assert!(claimed.claimed);
    assert!(commands::claim_reward(&state, &id).is_err());

    assert_eq!(
        commands::get_defiq(&state, WALLET).unwrap(),
        wallet.defiq + 10
    );
}

#[test]
fn disconnect_resets_defiq() {
    let dir = tempfile::tempdir().unwrap();
    let state = offline_manager(dir.path());
    commands::connect_wallet(&state, WALLET).unwrap();
    commands::set_defiq(&state, WALLET, 190).unwrap();

    commands::disconnect_wallet(&state).unwrap();
    assert_eq!(commands::get_defiq(&state, WALLET).unwrap(), 0);
    assert!(state.lock().unwrap().wallet().is_none());

    let again = commands::connect_wallet(&state, WALLET).unwrap();
    assert!(DEFIQ_INITIAL_RANGE.contains(&again.defiq));
}

#[test]
fn market_window_defaults_to_newest_sixteen() {
    assert_eq!(AppConfig::default().reconcile_config().market_window, Some(16));

    let all = AppConfig {
        market_window: Some(0),
        ..Default::default()
    };
    assert_eq!(all.reconcile_config().market_window, Some(0));
}

#[test]
fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let state = offline_manager(dir.path());
        commands::connect_wallet(&state, WALLET).unwrap();
        commands::set_defiq(&state, WALLET, 77).unwrap();
    }

    let state = offline_manager(dir.path());
    assert_eq!(commands::get_defiq(&state, WALLET).unwrap(), 77);
}

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use umiq_sdk::{
    Bet, BetSide, ClaimableReward, Market, MarketStats, MarketStatus, Network, PlaceBetRequest,
    RefreshOutcome, now_ms,
};

use crate::error::AppError;
use crate::state::{AppSnapshot, AppStateManager, LiveNode, MarketView, WalletStatus};

fn lock(state: &Mutex<AppStateManager>) -> Result<std::sync::MutexGuard<'_, AppStateManager>, String> {
    state.lock().map_err(|_| "app state lock failed".to_string())
}

fn node(state: &Mutex<AppStateManager>) -> Result<Arc<LiveNode>, String> {
    Ok(lock(state)?.node()?)
}

fn parse_side(side: &str) -> Result<BetSide, String> {
    side.parse()
}

// ============================================================================
// Refresh / snapshot
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// False when a newer refresh replaced this one.
    pub applied: bool,
    pub snapshot: AppSnapshot,
}

/// Re-read markets from the chain. The state lock is not held while the
/// chain is being read.
pub async fn refresh_markets(state: &Mutex<AppStateManager>) -> Result<RefreshResponse, String> {
    let node = node(state)?;
    let outcome = node
        .refresh()
        .await
        .map_err(|e| format!("refresh failed: {e}"))?;

    let mut mgr = lock(state)?;
    let applied = match outcome {
        RefreshOutcome::Applied(summary) => {
            mgr.record_refresh(summary);
            true
        }
        RefreshOutcome::Superseded => false,
    };
    Ok(RefreshResponse {
        applied,
        snapshot: mgr.snapshot(),
    })
}

pub fn get_app_state(state: &Mutex<AppStateManager>) -> Result<AppSnapshot, String> {
    Ok(lock(state)?.snapshot())
}

pub fn set_network(state: &Mutex<AppStateManager>, network: &str) -> Result<AppSnapshot, String> {
    let network: Network = network.parse()?;
    Ok(lock(state)?.set_network(network)?)
}

// ============================================================================
// Markets
// ============================================================================

pub fn get_markets(state: &Mutex<AppStateManager>) -> Result<Vec<MarketView>, String> {
    Ok(lock(state)?.market_views())
}

pub fn get_market_stats(
    state: &Mutex<AppStateManager>,
    market_id: &str,
) -> Result<MarketStats, String> {
    node(state)?
        .stats(market_id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("unknown market: {market_id}"))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMarketRequest {
    pub title: String,
    pub description: String,
    pub closes_at: i64,
    #[serde(default)]
    pub initial_pool: f64,
    #[serde(default)]
    pub min_bet: f64,
    #[serde(default)]
    pub max_bet: f64,
}

fn validate_request(request: &CreateMarketRequest, now: i64) -> Result<(), String> {
    if request.title.trim().is_empty() || request.title.len() > 140 {
        return Err("title must be 1-140 characters".to_string());
    }
    if request.description.len() > 280 {
        return Err("description must be at most 280 characters".to_string());
    }
    if request.closes_at <= now {
        return Err("closing time must be in the future".to_string());
    }
    if !request.initial_pool.is_finite() || request.initial_pool < 0.0 {
        return Err("initial pool must be >= 0".to_string());
    }
    if request.min_bet < 0.0 || request.max_bet < 0.0 {
        return Err("bet bounds must be >= 0".to_string());
    }
    Ok(())
}

/// Add a market created on this client. It stays local until it shows up
/// on-chain.
pub fn create_market(
    state: &Mutex<AppStateManager>,
    request: CreateMarketRequest,
) -> Result<MarketView, String> {
    let now = now_ms();
    validate_request(&request, now)?;

    let mut mgr = lock(state)?;
    let creator = mgr.require_wallet()?;
    let node = mgr.node()?;

    let market = Market {
        id: format!("local-{now}"),
        title: request.title.trim().to_string(),
        description: request.description,
        creator_id: creator,
        created_at: now,
        closes_at: request.closes_at,
        initial_pool: request.initial_pool,
        min_bet: request.min_bet,
        max_bet: request.max_bet,
        status: MarketStatus::Open,
        result: None,
        bets: vec![],
        tx_hash: None,
    };
    node.add_market(market.clone()).map_err(|e| e.to_string())?;
    mgr.bump_revision();
    Ok(MarketView::new(market, mgr.config().network, now))
}

pub fn resolve_market(
    state: &Mutex<AppStateManager>,
    market_id: &str,
    result: &str,
) -> Result<Vec<ClaimableReward>, String> {
    let result = parse_side(result)?;
    let mut mgr = lock(state)?;
    let rewards = mgr
        .node()?
        .resolve_market(market_id, result)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("unknown market: {market_id}"))?;
    mgr.bump_revision();
    Ok(rewards)
}

// ============================================================================
// Bets
// ============================================================================

/// Unsigned `placeBet` transaction for the connected wallet to submit.
pub fn prepare_bet(
    state: &Mutex<AppStateManager>,
    market_id: &str,
    side: &str,
    shares: u64,
) -> Result<PlaceBetRequest, String> {
    let side = parse_side(side)?;
    let mgr = lock(state)?;
    mgr.require_wallet()?;
    mgr.node()?
        .place_bet_request(market_id, side, shares)
        .map_err(|e| e.to_string())
}

/// Record a bet the wallet has sent. `tx_hash` is the submitted transaction
/// if known.
pub fn record_bet(
    state: &Mutex<AppStateManager>,
    market_id: &str,
    side: &str,
    shares: u64,
    tx_hash: Option<&str>,
) -> Result<Bet, String> {
    let side = parse_side(side)?;
    let mut mgr = lock(state)?;
    let user = mgr.require_wallet()?;
    let bet = mgr
        .node()?
        .record_bet(&user, market_id, side, shares, tx_hash)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("unknown market: {market_id}"))?;
    mgr.bump_revision();
    Ok(bet)
}

// ============================================================================
// Wallet / DeFiQ / rewards
// ============================================================================

fn validate_address(address: &str) -> Result<(), AppError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| AppError::InvalidInput("address must start with 0x".into()))?;
    let bytes = hex::decode(hex_part)
        .map_err(|e| AppError::InvalidInput(format!("address is not hex: {e}")))?;
    if bytes.len() != 20 {
        return Err(AppError::InvalidInput(format!(
            "address must be 20 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(())
}

pub fn connect_wallet(
    state: &Mutex<AppStateManager>,
    address: &str,
) -> Result<WalletStatus, String> {
    validate_address(address)?;
    Ok(lock(state)?.connect_wallet(address)?)
}

pub fn disconnect_wallet(state: &Mutex<AppStateManager>) -> Result<(), String> {
    Ok(lock(state)?.disconnect_wallet()?)
}

pub fn get_defiq(state: &Mutex<AppStateManager>, address: &str) -> Result<i64, String> {
    node(state)?.defiq(address).map_err(|e| e.to_string())
}

pub fn set_defiq(
    state: &Mutex<AppStateManager>,
    address: &str,
    score: i64,
) -> Result<(), String> {
    validate_address(address)?;
    let mut mgr = lock(state)?;
    mgr.node()?
        .set_defiq(address, score)
        .map_err(|e| e.to_string())?;
    mgr.bump_revision();
    Ok(())
}

/// Rewards for the connected wallet, or every reward if none is connected.
pub fn get_claimable_rewards(
    state: &Mutex<AppStateManager>,
) -> Result<Vec<ClaimableReward>, String> {
    let mgr = lock(state)?;
    let node = mgr.node()?;
    let rewards = match mgr.wallet() {
        Some(address) => node.rewards_for(address),
        None => node.claimable_rewards(),
    };
    rewards.map_err(|e| e.to_string())
}

pub fn claim_reward(
    state: &Mutex<AppStateManager>,
    market_id: &str,
) -> Result<ClaimableReward, String> {
    let mut mgr = lock(state)?;
    let user = mgr.require_wallet()?;
    let reward = mgr
        .node()?
        .claim_reward(&user, market_id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("no unclaimed reward on market {market_id}"))?;
    mgr.bump_revision();
    Ok(reward)
}

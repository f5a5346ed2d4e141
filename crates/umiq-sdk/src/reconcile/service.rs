use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;

use crate::chain::MarketReader;
use crate::error::{Error, Result};
use crate::market::{Market, MarketStatus};

use super::config::ReconcileConfig;
use super::fallback::fallback_markets;
use super::store_trait::MarketPersistence;

/// Why the fallback dataset was served instead of chain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// RPC unreachable or no contract at the configured address.
    ChainUnavailable(String),
    /// The contract reported no markets, or none survived decoding.
    EmptyChain,
    /// Any other error while reading the chain.
    Failed(String),
}

/// Where a reconciled market list came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketSource {
    Chain,
    Fallback(FallbackReason),
}

impl MarketSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, MarketSource::Fallback(_))
    }
}

impl std::fmt::Display for MarketSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketSource::Chain => write!(f, "chain"),
            MarketSource::Fallback(FallbackReason::ChainUnavailable(e)) => {
                write!(f, "fallback (chain unavailable: {e})")
            }
            MarketSource::Fallback(FallbackReason::EmptyChain) => {
                write!(f, "fallback (no markets on chain)")
            }
            MarketSource::Fallback(FallbackReason::Failed(e)) => write!(f, "fallback ({e})"),
        }
    }
}

/// Which tier supplied a market's creation hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxSource {
    BulkScan,
    StaticTable,
    PerMarketLookup,
    Unresolved,
}

/// Counts of creation-hash resolutions per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxResolutionStats {
    pub bulk_scan: usize,
    pub static_table: usize,
    pub per_market_lookup: usize,
    pub unresolved: usize,
}

impl TxResolutionStats {
    fn record(&mut self, source: TxSource) {
        match source {
            TxSource::BulkScan => self.bulk_scan += 1,
            TxSource::StaticTable => self.static_table += 1,
            TxSource::PerMarketLookup => self.per_market_lookup += 1,
            TxSource::Unresolved => self.unresolved += 1,
        }
    }
}

impl std::fmt::Display for TxResolutionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "bulk={}, static={}, lookup={}, unresolved={}",
            self.bulk_scan, self.static_table, self.per_market_lookup, self.unresolved
        )
    }
}

/// Result of one fetch pass.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub markets: Vec<Market>,
    pub source: MarketSource,
    pub tx_stats: TxResolutionStats,
}

impl FetchOutcome {
    pub fn summary(&self) -> FetchSummary {
        FetchSummary {
            source: self.source.clone(),
            market_count: self.markets.len(),
            tx_stats: self.tx_stats,
        }
    }
}

/// [`FetchOutcome`] without the market list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub source: MarketSource,
    pub market_count: usize,
    pub tx_stats: TxResolutionStats,
}

impl std::fmt::Display for FetchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} markets from {} [{}]",
            self.market_count, self.source, self.tx_stats
        )
    }
}

/// Builds the authoritative market list from the chain, degrading to the
/// static fallback set.
pub struct Reconciler<R: MarketReader> {
    reader: Arc<R>,
    config: ReconcileConfig,
}

impl<R: MarketReader> Clone for Reconciler<R> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R: MarketReader> Reconciler<R> {
    pub fn new(reader: Arc<R>, config: ReconcileConfig) -> Self {
        Self { reader, config }
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Read markets from the chain, or the fallback set if that fails.
    ///
    /// Never errors. Returned markets carry no bets.
    pub fn fetch(&self, now_ms: i64) -> FetchOutcome {
        match self.fetch_chain(now_ms) {
            Ok((markets, tx_stats)) if !markets.is_empty() => FetchOutcome {
                markets,
                source: MarketSource::Chain,
                tx_stats,
            },
            Ok(_) => self.fallback(FallbackReason::EmptyChain),
            Err(Error::ChainUnavailable(e)) => {
                log::warn!("chain unavailable, serving fallback markets: {e}");
                self.fallback(FallbackReason::ChainUnavailable(e))
            }
            Err(e) => {
                log::warn!("chain read failed, serving fallback markets: {e}");
                self.fallback(FallbackReason::Failed(e.to_string()))
            }
        }
    }

    /// [`fetch`](Self::fetch) followed by [`attach_bets`] from `store`.
    pub fn reconcile<S: MarketPersistence>(&self, store: &mut S, now_ms: i64) -> FetchOutcome {
        let mut outcome = self.fetch(now_ms);
        let persisted = load_persisted(store);
        outcome.markets = attach_bets(outcome.markets, persisted.as_deref());
        outcome
    }

    fn fallback(&self, reason: FallbackReason) -> FetchOutcome {
        FetchOutcome {
            markets: fallback_markets(),
            source: MarketSource::Fallback(reason),
            tx_stats: TxResolutionStats::default(),
        }
    }

    fn fetch_chain(&self, now_ms: i64) -> Result<(Vec<Market>, TxResolutionStats)> {
        let count = self.reader.market_count()?;
        if count == 0 {
            return Ok((vec![], TxResolutionStats::default()));
        }

        let tx_map = self.reader.creation_tx_map().unwrap_or_else(|e| {
            log::warn!("creation log scan failed: {e}");
            HashMap::new()
        });

        let indices: Vec<u64> = self.config.indices(count).collect();
        let fetch_one = |index: u64| self.fetch_market(index, &tx_map, now_ms);
        // Collected in index order regardless of completion order.
        let fetched: Vec<Result<(Market, TxSource)>> = if self.config.parallel_fetch {
            indices.par_iter().map(|&i| fetch_one(i)).collect()
        } else {
            indices.iter().map(|&i| fetch_one(i)).collect()
        };

        let mut stats = TxResolutionStats::default();
        let mut seen = HashSet::new();
        let mut markets = Vec::with_capacity(fetched.len());
        let mut read_error = None;
        for (index, result) in indices.iter().zip(fetched) {
            let (market, tx_source) = match result {
                Ok(found) => found,
                Err(e) => {
                    log::warn!("skipping market {index}: {e}");
                    if !is_record_error(&e) && read_error.is_none() {
                        read_error = Some(e);
                    }
                    continue;
                }
            };
            if !seen.insert(market.id.clone()) {
                log::warn!("duplicate market id {} from chain, keeping first", market.id);
                continue;
            }
            stats.record(tx_source);
            markets.push(market);
        }

        // Nothing readable and at least one transport-level failure: report
        // that instead of an empty chain.
        if markets.is_empty() {
            if let Some(e) = read_error {
                return Err(e);
            }
        }
        Ok((markets, stats))
    }

    fn fetch_market(
        &self,
        index: u64,
        tx_map: &HashMap<u64, String>,
        now_ms: i64,
    ) -> Result<(Market, TxSource)> {
        let record = self.reader.market(index)?;
        let (tx_hash, source) = self.resolve_tx_hash(record.id, tx_map);
        Ok((record.into_market(tx_hash, now_ms), source))
    }

    /// Bulk map, then static table, then a per-market log query.
    pub fn resolve_tx_hash(
        &self,
        market_id: u64,
        tx_map: &HashMap<u64, String>,
    ) -> (Option<String>, TxSource) {
        if let Some(hash) = tx_map.get(&market_id).filter(|h| !h.is_empty()) {
            return (Some(hash.clone()), TxSource::BulkScan);
        }
        if let Some(hash) = self
            .config
            .static_tx_hashes
            .get(&market_id)
            .filter(|h| !h.is_empty())
        {
            return (Some(hash.clone()), TxSource::StaticTable);
        }
        if self.config.per_market_lookup {
            match self.reader.creation_tx(market_id) {
                Ok(Some(hash)) if !hash.is_empty() => {
                    return (Some(hash), TxSource::PerMarketLookup);
                }
                Ok(_) => {}
                Err(e) => log::warn!("creation tx lookup for market {market_id} failed: {e}"),
            }
        }
        (None, TxSource::Unresolved)
    }
}

/// Load the persisted list, logging and discarding storage errors.
pub(crate) fn load_persisted<S: MarketPersistence>(store: &mut S) -> Option<Vec<Market>> {
    match store.load_markets() {
        Ok(markets) => markets,
        Err(e) => {
            log::warn!("failed to load persisted markets: {e}");
            None
        }
    }
}

/// Errors that describe one bad record rather than a failed read.
fn is_record_error(e: &Error) -> bool {
    matches!(
        e,
        Error::MarketNotFound(_) | Error::InvalidRecord(_) | Error::Abi(_)
    )
}

/// Copy local state onto the fresh market with the same id: the bet list,
/// and the resolution if this client resolved the market.
///
/// When `local` repeats an id, the first occurrence wins. Markets without a
/// local match keep an empty bet list.
pub fn attach_bets(mut markets: Vec<Market>, local: Option<&[Market]>) -> Vec<Market> {
    let Some(local) = local else {
        return markets;
    };
    let mut by_id: HashMap<&str, &Market> = HashMap::new();
    for market in local {
        by_id.entry(market.id.as_str()).or_insert(market);
    }
    for market in &mut markets {
        let Some(known) = by_id.get(market.id.as_str()) else {
            continue;
        };
        market.bets = known.bets.clone();
        if known.is_resolved() && !market.is_resolved() {
            market.status = MarketStatus::Resolved;
            market.result = known.result;
        }
    }
    markets
}

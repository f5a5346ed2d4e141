use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, B256};
use serde_json::{Value, json};

use crate::contract::{
    MarketRecord, decode_market, decode_market_count, encode_get_market,
    encode_get_market_count, market_created_topic, market_id_topic, parse_market_created,
};
use crate::error::{Error, Result};
use crate::network::Network;

/// Where to reach the contract.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub contract_address: String,
    /// Per-request transport timeout.
    pub request_timeout: Duration,
}

impl ChainConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            rpc_url: network.default_rpc_url().to_string(),
            contract_address: network.default_contract_address().to_string(),
            request_timeout: Duration::from_secs(15),
        }
    }

    pub fn contract(&self) -> Result<Address> {
        self.contract_address.parse().map_err(|e| {
            Error::ChainUnavailable(format!(
                "invalid contract address {}: {e}",
                self.contract_address
            ))
        })
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::for_network(Network::SomniaTestnet)
    }
}

/// Log query for `eth_getLogs`, always spanning genesis to latest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topics: Vec<B256>,
}

/// Raw JSON-RPC access to an EVM chain.
pub trait ChainBackend: Send + Sync {
    /// Deployed bytecode at `address` (empty if none).
    fn get_code(&self, address: &Address) -> Result<Vec<u8>>;

    /// Read-only `eth_call` against the latest block.
    fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>>;

    /// Log entries as returned by the node. Entries are left unparsed so a
    /// single bad entry can be skipped by the caller.
    fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Value>>;
}

/// Read-only view of the market contract.
pub trait MarketReader: Send + Sync {
    /// Total markets recorded on-chain.
    fn market_count(&self) -> Result<u64>;

    /// One market by its 1-based index.
    fn market(&self, index: u64) -> Result<MarketRecord>;

    /// Market id → creation transaction hash, from a full-history log scan.
    fn creation_tx_map(&self) -> Result<HashMap<u64, String>>;

    /// Creation transaction hash for one market, from a filtered log query.
    fn creation_tx(&self, market_id: u64) -> Result<Option<String>>;
}

// ---------------------------------------------------------------------------
// JSON-RPC over HTTP
// ---------------------------------------------------------------------------

/// Blocking HTTP JSON-RPC backend.
pub struct JsonRpcBackend {
    rpc_url: String,
    client: reqwest::blocking::Client,
    next_id: AtomicU64,
}

impl JsonRpcBackend {
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ChainUnavailable(format!("http client: {e}")))?;
        Ok(Self {
            rpc_url: rpc_url.to_string(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let resp: Value = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::ChainUnavailable(format!("{method}: {e}")))?
            .json()
            .map_err(|e| Error::Rpc(format!("{method}: bad response body: {e}")))?;

        if let Some(err) = resp.get("error") {
            return Err(Error::Rpc(format!("{method}: {err}")));
        }
        resp.get("result")
            .cloned()
            .ok_or_else(|| Error::Rpc(format!("{method}: missing result")))
    }
}

fn hex_bytes(value: &Value, field: &str) -> Result<Vec<u8>> {
    let s = value
        .as_str()
        .ok_or_else(|| Error::Rpc(format!("{field}: expected hex string")))?;
    hex::decode(s.trim_start_matches("0x")).map_err(|e| Error::Rpc(format!("{field}: {e}")))
}

fn hex_word(word: &B256) -> String {
    format!("0x{}", hex::encode(word))
}

impl ChainBackend for JsonRpcBackend {
    fn get_code(&self, address: &Address) -> Result<Vec<u8>> {
        let result = self.request("eth_getCode", json!([address.to_string(), "latest"]))?;
        hex_bytes(&result, "eth_getCode")
    }

    fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>> {
        let tx = json!({
            "to": to.to_string(),
            "data": format!("0x{}", hex::encode(data)),
        });
        let result = self.request("eth_call", json!([tx, "latest"]))?;
        hex_bytes(&result, "eth_call")
    }

    fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Value>> {
        let topics: Vec<String> = filter.topics.iter().map(hex_word).collect();
        let params = json!([{
            "address": filter.address.to_string(),
            "topics": topics,
            "fromBlock": "0x0",
            "toBlock": "latest",
        }]);
        let result = self.request("eth_getLogs", params)?;
        match result {
            Value::Array(entries) => Ok(entries),
            _ => Err(Error::Rpc("eth_getLogs: expected array response".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Contract reader
// ---------------------------------------------------------------------------

/// [`MarketReader`] over any [`ChainBackend`].
pub struct ContractReader<B: ChainBackend> {
    backend: B,
    contract: Address,
}

impl ContractReader<JsonRpcBackend> {
    /// Reader talking JSON-RPC to the endpoint in `config`.
    pub fn connect(config: &ChainConfig) -> Result<Self> {
        let backend = JsonRpcBackend::new(&config.rpc_url, config.request_timeout)?;
        Ok(Self::new(backend, config.contract()?))
    }
}

impl<B: ChainBackend> ContractReader<B> {
    pub fn new(backend: B, contract: Address) -> Self {
        Self { backend, contract }
    }

    pub fn contract(&self) -> &Address {
        &self.contract
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn ensure_deployed(&self) -> Result<()> {
        let code = self.backend.get_code(&self.contract).map_err(|e| match e {
            Error::ChainUnavailable(_) => e,
            other => Error::ChainUnavailable(other.to_string()),
        })?;
        if code.is_empty() {
            return Err(Error::ChainUnavailable(format!(
                "no contract code at {}",
                self.contract
            )));
        }
        Ok(())
    }
}

/// Pull `(market_id, tx_hash)` out of one raw log entry.
fn parse_log_entry(entry: &Value) -> Result<(u64, String)> {
    let topics = entry["topics"]
        .as_array()
        .ok_or_else(|| Error::LogParse("missing topics".into()))?
        .iter()
        .map(|t| {
            let bytes = hex_bytes(t, "topic").map_err(|e| Error::LogParse(e.to_string()))?;
            if bytes.len() != 32 {
                return Err(Error::LogParse(format!("topic is {} bytes", bytes.len())));
            }
            Ok(B256::from_slice(&bytes))
        })
        .collect::<Result<Vec<_>>>()?;
    let data = hex_bytes(&entry["data"], "data").map_err(|e| Error::LogParse(e.to_string()))?;
    let tx_hash = entry["transactionHash"]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::LogParse("missing transactionHash".into()))?;

    let log = parse_market_created(&topics, &data)?;
    Ok((log.market_id, tx_hash.to_string()))
}

impl<B: ChainBackend> MarketReader for ContractReader<B> {
    fn market_count(&self) -> Result<u64> {
        self.ensure_deployed()?;
        let data = self
            .backend
            .call(&self.contract, &encode_get_market_count())
            .map_err(|e| match e {
                Error::ChainUnavailable(_) => e,
                other => Error::ChainUnavailable(other.to_string()),
            })?;
        decode_market_count(&data)
    }

    fn market(&self, index: u64) -> Result<MarketRecord> {
        let data = match self.backend.call(&self.contract, &encode_get_market(index)) {
            Ok(data) => data,
            // Out-of-range indices revert.
            Err(Error::Rpc(msg)) if msg.contains("revert") => {
                return Err(Error::MarketNotFound(index));
            }
            Err(e) => return Err(e),
        };
        if data.is_empty() {
            return Err(Error::MarketNotFound(index));
        }
        let record = decode_market(&data)?;
        if record.id == 0 {
            return Err(Error::MarketNotFound(index));
        }
        Ok(record)
    }

    fn creation_tx_map(&self) -> Result<HashMap<u64, String>> {
        let filter = LogFilter {
            address: self.contract,
            topics: vec![market_created_topic()],
        };
        let entries = self.backend.get_logs(&filter)?;

        let mut map = HashMap::new();
        for entry in &entries {
            match parse_log_entry(entry) {
                Ok((market_id, tx_hash)) => {
                    map.entry(market_id).or_insert(tx_hash);
                }
                Err(e) => {
                    log::warn!("skipping unparseable MarketCreated log: {e}");
                }
            }
        }
        log::debug!(
            "creation log scan: {} entries, {} markets mapped",
            entries.len(),
            map.len()
        );
        Ok(map)
    }

    fn creation_tx(&self, market_id: u64) -> Result<Option<String>> {
        let filter = LogFilter {
            address: self.contract,
            topics: vec![
                market_created_topic(),
                market_id_topic(market_id),
            ],
        };
        let entries = self.backend.get_logs(&filter)?;
        Ok(entries.iter().find_map(|entry| {
            entry["transactionHash"]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }))
    }
}

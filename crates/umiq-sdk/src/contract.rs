//! Typed surface of the deployed market contract.
//!
//! The ABI is declared once here; everything else in the crate sees only
//! [`MarketRecord`], which is validated at decode time.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{SolCall, SolEvent, SolType, sol, sol_data};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::market::{BetSide, Market, MarketStatus};

sol! {
    /// Return tuple of `getMarket`.
    struct MarketView {
        uint256 id;
        address creator;
        string title;
        string description;
        uint256 closingTime;
        uint256 totalYesBets;
        uint256 totalNoBets;
        bool isResolved;
        bool outcome;
        bool isClosed;
    }

    event MarketCreated(uint256 indexed marketId, address indexed creator, string title);

    function placeBet(uint256 marketId, bool prediction) external payable;
    function getMarket(uint256 marketId) external view returns (MarketView memory);
    function getMarketCount() external view returns (uint256);
}

/// Wei per share (0.5 of the native token).
pub const WEI_PER_SHARE: u128 = 500_000_000_000_000_000;

/// One market as the contract reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketRecord {
    pub id: u64,
    pub creator: String,
    pub title: String,
    pub description: String,
    /// Unix seconds.
    pub closing_time: u64,
    pub total_yes_bets: U256,
    pub total_no_bets: U256,
    pub is_resolved: bool,
    pub outcome: bool,
    pub is_closed: bool,
}

impl TryFrom<MarketView> for MarketRecord {
    type Error = Error;

    fn try_from(view: MarketView) -> Result<Self> {
        let id = u64::try_from(view.id)
            .map_err(|_| Error::InvalidRecord(format!("market id {} exceeds u64", view.id)))?;
        let closing_time = u64::try_from(view.closingTime).map_err(|_| {
            Error::InvalidRecord(format!("closing time {} exceeds u64", view.closingTime))
        })?;
        Ok(MarketRecord {
            id,
            creator: view.creator.to_string(),
            title: view.title,
            description: view.description,
            closing_time,
            total_yes_bets: view.totalYesBets,
            total_no_bets: view.totalNoBets,
            is_resolved: view.isResolved,
            outcome: view.outcome,
            is_closed: view.isClosed,
        })
    }
}

impl MarketRecord {
    /// Map into a fresh client-side market.
    ///
    /// The contract exposes no creation time, pool or bet bounds, so
    /// `created_at` is the observation time (kept below `closes_at`) and the
    /// pool figures are zeroed.
    pub fn into_market(self, tx_hash: Option<String>, now_ms: i64) -> Market {
        let closes_at = i64::try_from(self.closing_time)
            .unwrap_or(i64::MAX / 1000)
            .saturating_mul(1000);
        let created_at = now_ms.min(closes_at.saturating_sub(1));
        Market {
            id: self.id.to_string(),
            title: self.title,
            description: self.description,
            creator_id: if self.creator.is_empty() {
                "onchain".to_string()
            } else {
                self.creator
            },
            created_at,
            closes_at,
            initial_pool: 0.0,
            min_bet: 0.0,
            max_bet: 0.0,
            status: MarketStatus::Open,
            result: None,
            bets: vec![],
            tx_hash,
        }
    }
}

/// Unsigned `placeBet` transaction for an external wallet to sign and send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetRequest {
    pub to: String,
    pub data: String,
    pub value_wei: String,
}

pub fn encode_get_market_count() -> Vec<u8> {
    getMarketCountCall {}.abi_encode()
}

pub fn encode_get_market(index: u64) -> Vec<u8> {
    getMarketCall {
        marketId: U256::from(index),
    }
    .abi_encode()
}

pub fn decode_market_count(data: &[u8]) -> Result<u64> {
    let count = <sol_data::Uint<256> as SolType>::abi_decode(data)
        .map_err(|e| Error::Abi(format!("getMarketCount: {e}")))?;
    u64::try_from(count).map_err(|_| Error::InvalidRecord(format!("market count {count} exceeds u64")))
}

pub fn decode_market(data: &[u8]) -> Result<MarketRecord> {
    let view = <MarketView as SolType>::abi_decode(data)
        .map_err(|e| Error::Abi(format!("getMarket: {e}")))?;
    MarketRecord::try_from(view)
}

/// topic0 of `MarketCreated`.
pub fn market_created_topic() -> B256 {
    MarketCreated::SIGNATURE_HASH
}

/// topic1 filter value for a given market id.
pub fn market_id_topic(market_id: u64) -> B256 {
    B256::from(U256::from(market_id))
}

/// A decoded `MarketCreated` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationLog {
    pub market_id: u64,
    pub creator: String,
    pub title: String,
}

/// Decode a `MarketCreated` log from its topics and data.
pub fn parse_market_created(topics: &[B256], data: &[u8]) -> Result<CreationLog> {
    if topics.len() < 3 {
        return Err(Error::LogParse(format!(
            "expected 3 topics, got {}",
            topics.len()
        )));
    }
    if topics[0] != market_created_topic() {
        return Err(Error::LogParse("topic0 is not MarketCreated".into()));
    }
    let market_id = u64::try_from(U256::from_be_bytes(topics[1].0))
        .map_err(|_| Error::LogParse("market id exceeds u64".into()))?;
    let creator = Address::from_word(topics[2]).to_string();
    let title = <sol_data::String as SolType>::abi_decode(data)
        .map_err(|e| Error::LogParse(format!("title: {e}")))?;
    Ok(CreationLog {
        market_id,
        creator,
        title,
    })
}

/// Build the `placeBet` call for `shares` shares on `side`.
pub fn place_bet_request(
    contract: &Address,
    market_id: u64,
    side: BetSide,
    shares: u64,
) -> PlaceBetRequest {
    let data = placeBetCall {
        marketId: U256::from(market_id),
        prediction: side.as_prediction(),
    }
    .abi_encode();
    let value = U256::from(shares) * U256::from(WEI_PER_SHARE);
    PlaceBetRequest {
        to: contract.to_string(),
        data: format!("0x{}", hex::encode(data)),
        value_wei: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: u64) -> MarketView {
        MarketView {
            id: U256::from(id),
            creator: Address::repeat_byte(0x11),
            title: format!("Market {id}"),
            description: "desc".into(),
            closingTime: U256::from(1_800_000_000u64),
            totalYesBets: U256::ZERO,
            totalNoBets: U256::ZERO,
            isResolved: false,
            outcome: false,
            isClosed: false,
        }
    }

    #[test]
    fn decode_market_view() {
        let encoded = <MarketView as SolType>::abi_encode(&view(4));
        let record = decode_market(&encoded).unwrap();
        assert_eq!(record.id, 4);
        assert_eq!(record.title, "Market 4");
        assert_eq!(record.closing_time, 1_800_000_000);
        assert_eq!(record.creator, Address::repeat_byte(0x11).to_string());
    }

    #[test]
    fn decode_market_rejects_garbage() {
        assert!(matches!(decode_market(&[0u8; 5]), Err(Error::Abi(_))));
    }

    #[test]
    fn decode_count() {
        let encoded = <sol_data::Uint<256> as SolType>::abi_encode(&U256::from(12u64));
        assert_eq!(decode_market_count(&encoded).unwrap(), 12);
    }

    #[test]
    fn oversized_id_is_invalid() {
        let mut v = view(1);
        v.id = U256::MAX;
        assert!(matches!(
            MarketRecord::try_from(v),
            Err(Error::InvalidRecord(_))
        ));
    }

    #[test]
    fn record_maps_to_open_market() {
        let record = MarketRecord::try_from(view(9)).unwrap();
        let market = record.into_market(Some("0xfeed".into()), 1_000);
        assert_eq!(market.id, "9");
        assert_eq!(market.status, MarketStatus::Open);
        assert_eq!(market.closes_at, 1_800_000_000_000);
        assert_eq!(market.created_at, 1_000);
        assert_eq!(market.initial_pool, 0.0);
        assert!(market.bets.is_empty());
        assert_eq!(market.tx_hash.as_deref(), Some("0xfeed"));
    }

    #[test]
    fn created_at_stays_below_closing_time() {
        let record = MarketRecord::try_from(view(2)).unwrap();
        let market = record.into_market(None, 9_000_000_000_000);
        assert!(market.created_at < market.closes_at);
    }

    #[test]
    fn parse_creation_log() {
        let topics = vec![
            market_created_topic(),
            market_id_topic(42),
            Address::repeat_byte(0x22).into_word(),
        ];
        let data = <sol_data::String as SolType>::abi_encode(&"Will it rain?".to_string());
        let log = parse_market_created(&topics, &data).unwrap();
        assert_eq!(log.market_id, 42);
        assert_eq!(log.title, "Will it rain?");
        assert_eq!(log.creator, Address::repeat_byte(0x22).to_string());
    }

    #[test]
    fn parse_creation_log_rejects_wrong_topic() {
        let topics = vec![B256::ZERO, market_id_topic(1), B256::ZERO];
        assert!(matches!(
            parse_market_created(&topics, &[]),
            Err(Error::LogParse(_))
        ));
        assert!(parse_market_created(&topics[..1], &[]).is_err());
    }

    #[test]
    fn place_bet_request_encodes_value() {
        let contract = Address::repeat_byte(0x33);
        let req = place_bet_request(&contract, 5, BetSide::Yes, 3);
        assert_eq!(req.value_wei, "1500000000000000000");
        assert!(req.data.starts_with("0x"));
        let raw = hex::decode(req.data.trim_start_matches("0x")).unwrap();
        assert_eq!(&raw[..4], placeBetCall::SELECTOR.as_slice());
        let call = placeBetCall::abi_decode(&raw).unwrap();
        assert_eq!(call.marketId, U256::from(5u64));
        assert!(call.prediction);
    }
}

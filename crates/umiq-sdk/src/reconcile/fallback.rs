//! Static market data used when the chain cannot supply any.

use std::collections::HashMap;

use crate::market::{Market, MarketStatus};

const BASE_MS: i64 = 1_767_225_600_000; // 2026-01-01T00:00:00Z
/// Closing times count from here, so every demo market stays open through
/// the end of 2026.
const CLOSE_BASE_MS: i64 = 1_798_761_600_000; // 2027-01-01T00:00:00Z
const DAY_MS: i64 = 86_400_000;

struct Seed {
    title: &'static str,
    description: &'static str,
    creator: &'static str,
    age_days: i64,
    open_days: i64,
    initial_pool: f64,
    min_bet: f64,
    max_bet: f64,
    tx_hash: &'static str,
}

const SEEDS: [Seed; 16] = [
    Seed {
        title: "Will Bitcoin reach $100k by end of 2026?",
        description: "Bitcoin price prediction market for crypto enthusiasts",
        creator: "0x1234567890123456789012345678901234567890",
        age_days: 1,
        open_days: 30,
        initial_pool: 100.0,
        min_bet: 0.1,
        max_bet: 10.0,
        tx_hash: "0x578faaf1f6e06db0ce634b67a71afc567f23a7f6913cbb5d16d09b777fa55ef6",
    },
    Seed {
        title: "Will the next Ethereum upgrade launch successfully?",
        description: "Prediction on successful Ethereum upgrade completion",
        creator: "0x2345678901234567890123456789012345678901",
        age_days: 2,
        open_days: 60,
        initial_pool: 200.0,
        min_bet: 0.5,
        max_bet: 20.0,
        tx_hash: "0x08e456bf38295ab13f2c0c24ddacf0e12c383384f39953c70a50a4060faf4401",
    },
    Seed {
        title: "Will AI replace 50% of jobs by 2030?",
        description: "Controversial prediction about AI impact on employment",
        creator: "0x3456789012345678901234567890123456789012",
        age_days: 3,
        open_days: 365,
        initial_pool: 150.0,
        min_bet: 0.1,
        max_bet: 15.0,
        tx_hash: "0x978bf9cafe42b2b99c22fca654aa9084522a358c3a6b7cf808c2e68da0862f7c",
    },
    Seed {
        title: "Will Tesla deliver 2M vehicles in 2026?",
        description: "Tesla vehicle delivery prediction for 2026",
        creator: "0x4567890123456789012345678901234567890123",
        age_days: 4,
        open_days: 180,
        initial_pool: 250.0,
        min_bet: 0.2,
        max_bet: 25.0,
        tx_hash: "0x9b23e9ad9ab4fb6f2ac5d2fe22b4fe085483046505e2fb1903060cac56339ba9",
    },
    Seed {
        title: "Will Apple release AR glasses in 2026?",
        description: "Apple AR product launch prediction",
        creator: "0x5678901234567890123456789012345678901234",
        age_days: 5,
        open_days: 90,
        initial_pool: 180.0,
        min_bet: 0.1,
        max_bet: 18.0,
        tx_hash: "0x31862ef548e35faf206b8847940c958d2f17d6f509ec0530f1800c3e13cc0e69",
    },
    Seed {
        title: "Will Netflix reach 250M subscribers?",
        description: "Netflix subscriber growth prediction",
        creator: "0x6789012345678901234567890123456789012345",
        age_days: 6,
        open_days: 120,
        initial_pool: 120.0,
        min_bet: 0.05,
        max_bet: 12.0,
        tx_hash: "0x1f2b10a921c5fb250ef4f4a491270ca0ca9f7da79df0c6714a26877683185f52",
    },
    Seed {
        title: "Will Meta launch new VR headset?",
        description: "Meta VR product launch prediction",
        creator: "0x7890123456789012345678901234567890123456",
        age_days: 7,
        open_days: 150,
        initial_pool: 160.0,
        min_bet: 0.1,
        max_bet: 16.0,
        tx_hash: "0x2e3c0f662c94fa692922d261a559d9720c7c92707a41ff55debf206ded65ae29",
    },
    Seed {
        title: "Will Google release new AI model?",
        description: "Google AI model release prediction",
        creator: "0x8901234567890123456789012345678901234567",
        age_days: 8,
        open_days: 200,
        initial_pool: 220.0,
        min_bet: 0.2,
        max_bet: 22.0,
        tx_hash: "0x3bc7f20c8e2a0d13034b297ec8bb38433c5ff6c353bdb951ea8804c3e250d8e2",
    },
    Seed {
        title: "Will Microsoft acquire new gaming studio?",
        description: "Microsoft gaming acquisition prediction",
        creator: "0x9012345678901234567890123456789012345678",
        age_days: 9,
        open_days: 240,
        initial_pool: 140.0,
        min_bet: 0.1,
        max_bet: 14.0,
        tx_hash: "0x90c8e3999c041fdd720cda32c8addeac2870e039acc1ed40739cd4284af945e6",
    },
    Seed {
        title: "Will Amazon launch new drone delivery?",
        description: "Amazon drone delivery service prediction",
        creator: "0xa012345678901234567890123456789012345678",
        age_days: 10,
        open_days: 300,
        initial_pool: 190.0,
        min_bet: 0.15,
        max_bet: 19.0,
        tx_hash: "0x76d48435cecac86d81170b19eaec3d3b0aeeeb71b8d3523c97e6d97b693d942d",
    },
    Seed {
        title: "Will Twitter/X reach 600M users?",
        description: "Twitter/X user growth prediction",
        creator: "0xb012345678901234567890123456789012345678",
        age_days: 11,
        open_days: 180,
        initial_pool: 110.0,
        min_bet: 0.05,
        max_bet: 11.0,
        tx_hash: "0x9142d0173171fd13132eb1f7c3896ef9045c137faaf0d9e68733ffe01de097b5",
    },
    Seed {
        title: "Will Spotify launch new podcast feature?",
        description: "Spotify podcast feature prediction",
        creator: "0xc012345678901234567890123456789012345678",
        age_days: 12,
        open_days: 120,
        initial_pool: 130.0,
        min_bet: 0.1,
        max_bet: 13.0,
        tx_hash: "0x670d7236f455e69154921697294e36cdfe790402f2e7e74034cd9f2894d214af",
    },
    Seed {
        title: "Will Disney+ reach 200M subscribers?",
        description: "Disney+ subscriber growth prediction",
        creator: "0xd012345678901234567890123456789012345678",
        age_days: 13,
        open_days: 240,
        initial_pool: 170.0,
        min_bet: 0.15,
        max_bet: 17.0,
        tx_hash: "0xc78ff267847b2c6e487463579433f8f0e16ece4fb3d3fe8f039122acd6ebe1b5",
    },
    Seed {
        title: "Will Uber launch flying taxi service?",
        description: "Uber flying taxi service prediction",
        creator: "0xe012345678901234567890123456789012345678",
        age_days: 14,
        open_days: 365,
        initial_pool: 300.0,
        min_bet: 0.25,
        max_bet: 30.0,
        tx_hash: "0xdd83fd802fedf2237470a1c28193da96a19f39159727249d5a077cf5b7268335",
    },
    Seed {
        title: "Will Airbnb launch long-term rental service?",
        description: "Airbnb long-term rental prediction",
        creator: "0xf012345678901234567890123456789012345678",
        age_days: 15,
        open_days: 180,
        initial_pool: 150.0,
        min_bet: 0.1,
        max_bet: 15.0,
        tx_hash: "0xa13c51c2b22466b45ad45daf1e177a58bdec3a966e660917e04e29311acfbf0f",
    },
    Seed {
        title: "Will Zoom launch new collaboration tools?",
        description: "Zoom collaboration tools prediction",
        creator: "0x0012345678901234567890123456789012345678",
        age_days: 16,
        open_days: 150,
        initial_pool: 120.0,
        min_bet: 0.08,
        max_bet: 12.0,
        tx_hash: "0x2a6d1629b62a3c4888de496ce2531d65eecb83b1614a94364f7101961da613a7",
    },
];

/// Fixed demonstration markets, ids `demo-1` through `demo-16`.
///
/// Timestamps are anchored to constants so every call returns the same list.
pub fn fallback_markets() -> Vec<Market> {
    SEEDS
        .iter()
        .enumerate()
        .map(|(i, seed)| Market {
            id: format!("demo-{}", i + 1),
            title: seed.title.to_string(),
            description: seed.description.to_string(),
            creator_id: seed.creator.to_string(),
            created_at: BASE_MS - seed.age_days * DAY_MS,
            closes_at: CLOSE_BASE_MS + seed.open_days * DAY_MS,
            initial_pool: seed.initial_pool,
            min_bet: seed.min_bet,
            max_bet: seed.max_bet,
            status: MarketStatus::Open,
            result: None,
            bets: vec![],
            tx_hash: Some(seed.tx_hash.to_string()),
        })
        .collect()
}

/// Known creation hashes for the first on-chain markets, keyed by contract
/// market id. Consulted only after the log scan has missed.
pub fn static_tx_table() -> HashMap<u64, String> {
    SEEDS
        .iter()
        .enumerate()
        .map(|(i, seed)| (i as u64 + 1, seed.tx_hash.to_string()))
        .collect()
}

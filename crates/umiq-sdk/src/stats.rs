//! Display statistics derived from a market's bet list.
//!
//! Everything here is a pure function of the market passed in. Nothing is
//! cached: bets can be appended at any time, so callers recompute on every
//! render.

use serde::Serialize;

use crate::market::{Bet, BetSide, ClaimableReward, Market};

/// Seed liquidity plus every bet amount.
pub fn total_pool(market: &Market) -> f64 {
    market.initial_pool + market.bets.iter().map(|b| b.amount).sum::<f64>()
}

/// Sum of bet amounts placed on `side`.
pub fn side_volume(market: &Market, side: BetSide) -> f64 {
    market
        .bets
        .iter()
        .filter(|b| b.side == side)
        .map(|b| b.amount)
        .sum()
}

/// Volume on the side that won.
pub fn total_winning_volume(market: &Market, result: BetSide) -> f64 {
    side_volume(market, result)
}

/// Share of bet volume on `side`.
///
/// Exactly `0.5` when nothing has been bet yet.
pub fn implied_probability(market: &Market, side: BetSide) -> f64 {
    let yes = side_volume(market, BetSide::Yes);
    let no = side_volume(market, BetSide::No);
    let total = yes + no;
    if total <= 0.0 {
        return 0.5;
    }
    side_volume(market, side) / total
}

/// Pro-rata share of the total pool owed to `bet` when the market resolves
/// to `result`.
///
/// `None` for losing bets, and for every bet when the winning side has no
/// volume.
pub fn payout_share(bet: &Bet, market: &Market, result: BetSide) -> Option<f64> {
    if bet.side != result {
        return None;
    }
    let winning = total_winning_volume(market, result);
    if winning <= 0.0 {
        return None;
    }
    Some(bet.amount / winning * total_pool(market))
}

/// One unclaimed reward per winning bet, in bet order.
pub fn compute_rewards(market: &Market, result: BetSide) -> Vec<ClaimableReward> {
    market
        .bets
        .iter()
        .filter_map(|bet| {
            payout_share(bet, market, result).map(|amount| ClaimableReward {
                user_id: bet.user_id.clone(),
                market_id: market.id.clone(),
                amount,
                claimed: false,
            })
        })
        .collect()
}

/// Snapshot of the derived figures for one market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStats {
    pub total_pool: f64,
    pub yes_volume: f64,
    pub no_volume: f64,
    pub yes_probability: f64,
    pub no_probability: f64,
    pub bet_count: usize,
}

impl MarketStats {
    pub fn compute(market: &Market) -> Self {
        MarketStats {
            total_pool: total_pool(market),
            yes_volume: side_volume(market, BetSide::Yes),
            no_volume: side_volume(market, BetSide::No),
            yes_probability: implied_probability(market, BetSide::Yes),
            no_probability: implied_probability(market, BetSide::No),
            bet_count: market.bets.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketStatus;

    fn bet(user: &str, amount: f64, side: BetSide) -> Bet {
        Bet::new(format!("{user}-{amount}"), user, "1", amount, side, 0).unwrap()
    }

    fn market_with(initial_pool: f64, bets: Vec<Bet>) -> Market {
        Market {
            id: "1".into(),
            title: "Q".into(),
            description: String::new(),
            creator_id: "0xc".into(),
            created_at: 0,
            closes_at: 1,
            initial_pool,
            min_bet: 0.0,
            max_bet: 0.0,
            status: MarketStatus::Open,
            result: None,
            bets,
            tx_hash: None,
        }
    }

    #[test]
    fn zero_volume_is_a_fair_coin() {
        let m = market_with(100.0, vec![]);
        assert_eq!(implied_probability(&m, BetSide::Yes), 0.5);
        assert_eq!(implied_probability(&m, BetSide::No), 0.5);
    }

    #[test]
    fn lifecycle_example() {
        let m = market_with(
            0.0,
            vec![bet("alice", 1.0, BetSide::Yes), bet("bob", 3.0, BetSide::No)],
        );
        assert_eq!(total_pool(&m), 4.0);
        assert_eq!(implied_probability(&m, BetSide::Yes), 0.25);
        assert_eq!(implied_probability(&m, BetSide::No), 0.75);

        let rewards = compute_rewards(&m, BetSide::No);
        assert_eq!(rewards.len(), 1);
        assert_eq!(rewards[0].user_id, "bob");
        assert_eq!(rewards[0].amount, 4.0);
        assert!(!rewards[0].claimed);
        assert_eq!(payout_share(&m.bets[0], &m, BetSide::No), None);
    }

    #[test]
    fn payouts_conserve_the_pool() {
        let m = market_with(
            7.5,
            vec![
                bet("a", 0.3, BetSide::Yes),
                bet("b", 1.7, BetSide::Yes),
                bet("c", 2.2, BetSide::No),
                bet("d", 0.9, BetSide::Yes),
            ],
        );
        let paid: f64 = m
            .bets
            .iter()
            .filter_map(|b| payout_share(b, &m, BetSide::Yes))
            .sum();
        assert!((paid - total_pool(&m)).abs() < 1e-9);
    }

    #[test]
    fn no_winners_pays_nothing() {
        let m = market_with(10.0, vec![bet("a", 2.0, BetSide::Yes)]);
        assert!(compute_rewards(&m, BetSide::No).is_empty());
        assert_eq!(payout_share(&m.bets[0], &m, BetSide::No), None);
    }

    #[test]
    fn initial_pool_goes_to_winners() {
        let m = market_with(
            6.0,
            vec![bet("a", 1.0, BetSide::Yes), bet("b", 3.0, BetSide::Yes)],
        );
        let rewards = compute_rewards(&m, BetSide::Yes);
        assert_eq!(rewards[0].amount, 2.5);
        assert_eq!(rewards[1].amount, 7.5);
    }

    #[test]
    fn stats_snapshot() {
        let m = market_with(
            1.0,
            vec![bet("a", 2.0, BetSide::Yes), bet("b", 2.0, BetSide::No)],
        );
        let stats = MarketStats::compute(&m);
        assert_eq!(stats.total_pool, 5.0);
        assert_eq!(stats.yes_volume, 2.0);
        assert_eq!(stats.no_volume, 2.0);
        assert_eq!(stats.yes_probability, 0.5);
        assert_eq!(stats.bet_count, 2);
    }
}

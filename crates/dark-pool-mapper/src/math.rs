use std::collections::HashMap;

use crate::types::{BlockTrade, DarkPoolLevel, LevelStrength, Nbbo, Side, PRICE_CLUSTER_SIZE};

pub fn cluster_price(price: f64) -> f64 {
    (price / PRICE_CLUSTER_SIZE).round() * PRICE_CLUSTER_SIZE
}

/// Trade side inferred from proximity to NBBO: within the outer quarter of
/// the spread near the ask is buyer-initiated, near the bid is seller-initiated.
pub fn determine_side(price: f64, nbbo: Nbbo) -> Side {
    if nbbo.bid <= 0.0 || nbbo.ask <= 0.0 {
        return Side::Unknown;
    }

    let mid = (nbbo.bid + nbbo.ask) / 2.0;
    let spread = nbbo.ask - nbbo.bid;
    if spread <= 0.0 {
        return Side::Unknown;
    }

    if price >= mid + spread * 0.25 {
        Side::Buy
    } else if price <= mid - spread * 0.25 {
        Side::Sell
    } else {
        Side::Unknown
    }
}

pub fn determine_strength(notional: f64, trade_count: u32) -> LevelStrength {
    if notional >= 10_000_000.0 || trade_count >= 20 {
        LevelStrength::VeryHigh
    } else if notional >= 5_000_000.0 || trade_count >= 10 {
        LevelStrength::High
    } else if notional >= 2_000_000.0 || trade_count >= 5 {
        LevelStrength::Medium
    } else {
        LevelStrength::Low
    }
}

struct LevelAccumulator {
    volume: f64,
    notional: f64,
    trade_count: u32,
    buy_volume: f64,
    sell_volume: f64,
}

/// Clusters block trades by rounded price into dark-pool levels, tagging each
/// level's side from its buy/sell volume skew (1.5x dominance threshold).
pub fn cluster_levels(blocks: &[BlockTrade], nbbo: Nbbo) -> (Vec<DarkPoolLevel>, f64, f64, f64, f64) {
    let mut levels: HashMap<i64, LevelAccumulator> = HashMap::new();
    let mut total_volume = 0.0;
    let mut total_notional = 0.0;
    let mut total_buy = 0.0;
    let mut total_sell = 0.0;

    for block in blocks {
        let price_level = cluster_price(block.price);
        let key = (price_level * 100.0).round() as i64;
        let side = determine_side(block.price, nbbo);

        let entry = levels.entry(key).or_insert(LevelAccumulator { volume: 0.0, notional: 0.0, trade_count: 0, buy_volume: 0.0, sell_volume: 0.0 });
        entry.volume += block.size;
        entry.notional += block.notional;
        entry.trade_count += 1;

        match side {
            Side::Buy => {
                entry.buy_volume += block.size;
                total_buy += block.size;
            }
            Side::Sell => {
                entry.sell_volume += block.size;
                total_sell += block.size;
            }
            Side::Unknown => {}
        }

        total_volume += block.size;
        total_notional += block.notional;
    }

    let mut out: Vec<DarkPoolLevel> = levels
        .into_iter()
        .map(|(key, acc)| {
            let price = key as f64 / 100.0;
            let side = if acc.buy_volume > acc.sell_volume * 1.5 {
                Side::Buy
            } else if acc.sell_volume > acc.buy_volume * 1.5 {
                Side::Sell
            } else {
                Side::Unknown
            };
            DarkPoolLevel { price, volume: acc.volume, notional: acc.notional, trade_count: acc.trade_count, side, strength: determine_strength(acc.notional, acc.trade_count) }
        })
        .collect();

    out.sort_by(|a, b| b.notional.partial_cmp(&a.notional).unwrap_or(std::cmp::Ordering::Equal));

    (out, total_volume, total_notional, total_buy, total_sell)
}

/// Nearest support (below spot, buy/unknown side) and resistance (above spot, sell/unknown side).
pub fn find_support_resistance(levels: &[DarkPoolLevel], spot: f64) -> (Option<&DarkPoolLevel>, Option<&DarkPoolLevel>) {
    let support = levels
        .iter()
        .filter(|l| l.price < spot && matches!(l.side, Side::Buy | Side::Unknown))
        .max_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal));

    let resistance = levels
        .iter()
        .filter(|l| l.price > spot && matches!(l.side, Side::Sell | Side::Unknown))
        .min_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal));

    (support, resistance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clusters_to_half_dollar_grid() {
        assert_eq!(cluster_price(450.23), 450.0);
        assert_eq!(cluster_price(450.26), 450.5);
    }

    #[test]
    fn side_near_ask_is_buy() {
        let nbbo = Nbbo { bid: 450.0, ask: 450.10 };
        assert_eq!(determine_side(450.09, nbbo), Side::Buy);
        assert_eq!(determine_side(450.01, nbbo), Side::Sell);
    }

    #[test]
    fn strength_scales_with_notional_and_count() {
        assert_eq!(determine_strength(11_000_000.0, 1), LevelStrength::VeryHigh);
        assert_eq!(determine_strength(1_000_000.0, 1), LevelStrength::Low);
    }

    #[test]
    fn support_is_nearest_below_spot() {
        let levels = vec![
            DarkPoolLevel { price: 440.0, volume: 1.0, notional: 1.0, trade_count: 1, side: Side::Buy, strength: LevelStrength::Low },
            DarkPoolLevel { price: 448.0, volume: 1.0, notional: 1.0, trade_count: 1, side: Side::Buy, strength: LevelStrength::Low },
            DarkPoolLevel { price: 460.0, volume: 1.0, notional: 1.0, trade_count: 1, side: Side::Sell, strength: LevelStrength::Low },
        ];
        let (support, resistance) = find_support_resistance(&levels, 450.0);
        assert_eq!(support.unwrap().price, 448.0);
        assert_eq!(resistance.unwrap().price, 460.0);
    }
}

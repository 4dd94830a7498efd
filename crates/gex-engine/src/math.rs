//! Per-strike gamma/charm/vanna exposure, the flip point, and key-level
//! extraction. All pure, synchronous, and independent of how the option chain
//! was obtained.

use crate::types::{GexRegime, OptionQuote};
use chrono::{NaiveTime, Timelike, Utc};
use std::collections::BTreeMap;

const HIGH_POSITIVE_GEX: f64 = 500_000_000.0;
const NEGATIVE_GEX: f64 = -200_000_000.0;
const EXTREME_NEGATIVE_GEX: f64 = -500_000_000.0;

/// `GEX = gamma * OI * 100 * spot^2 * (+1 call / -1 put)`.
pub fn gex_per_strike(gamma: f64, open_interest: f64, spot: f64, is_call: bool) -> f64 {
    if gamma <= 0.0 || open_interest <= 0.0 || spot <= 0.0 {
        return 0.0;
    }
    let direction = if is_call { 1.0 } else { -1.0 };
    gamma * open_interest * 100.0 * spot * spot * direction
}

/// Simplified Black-Scholes charm (delta decay rate), d1-based.
pub fn charm(gamma: f64, iv: f64, spot: f64, strike: f64, tau_years: f64) -> f64 {
    if tau_years <= 0.0 || iv <= 0.0 || spot <= 0.0 || strike <= 0.0 {
        return 0.0;
    }
    let d1 = ((spot / strike).ln() + (0.05 + iv * iv / 2.0) * tau_years) / (iv * tau_years.sqrt());
    -gamma * (0.05 - d1 * iv / (2.0 * tau_years))
}

/// Simplified Black-Scholes vanna (delta sensitivity to IV).
pub fn vanna(vega: f64, spot: f64, strike: f64, iv: f64, tau_years: f64) -> f64 {
    if tau_years <= 0.0 || iv <= 0.0 || spot <= 0.0 || vega == 0.0 {
        return 0.0;
    }
    let d1 = ((spot / strike).ln() + (0.05 + iv * iv / 2.0) * tau_years) / (iv * tau_years.sqrt());
    vega * d1 / (spot * iv * tau_years.sqrt())
}

/// Time remaining (in years) to same-day 4pm expiry, floored to avoid division by zero.
pub fn time_to_expiry_years(now: chrono::DateTime<Utc>) -> f64 {
    let close = NaiveTime::from_hms_opt(16, 0, 0).unwrap();
    let now_time = now.time();
    if now_time >= close {
        return 1e-6;
    }
    let remaining_secs =
        (close.hour() as i64 * 3600 + close.minute() as i64 * 60) - (now_time.num_seconds_from_midnight() as i64);
    (remaining_secs as f64 / (365.25 * 24.0 * 3600.0)).max(1e-6)
}

pub struct Aggregated {
    pub total_gex: f64,
    pub call_gex: f64,
    pub put_gex: f64,
    pub gex_by_strike: BTreeMap<i64, f64>,
    pub total_charm: f64,
    pub total_vanna: f64,
}

/// Per-strike keys are cents-rounded to an integer so floating strikes compare exactly.
fn strike_key(strike: f64) -> i64 {
    (strike * 100.0).round() as i64
}

pub fn aggregate(options: &[OptionQuote], spot: f64, tau_years: f64) -> Aggregated {
    let mut total_gex = 0.0;
    let mut call_gex = 0.0;
    let mut put_gex = 0.0;
    let mut gex_by_strike: BTreeMap<i64, f64> = BTreeMap::new();
    let mut total_charm = 0.0;
    let mut total_vanna = 0.0;

    for opt in options {
        if opt.strike <= 0.0 || opt.open_interest <= 0.0 {
            continue;
        }
        let strike_gex = gex_per_strike(opt.gamma, opt.open_interest, spot, opt.is_call);
        total_gex += strike_gex;
        if opt.is_call {
            call_gex += strike_gex;
        } else {
            put_gex += strike_gex;
        }
        *gex_by_strike.entry(strike_key(opt.strike)).or_insert(0.0) += strike_gex;

        let direction = if opt.is_call { 1.0 } else { -1.0 };
        let c = charm(opt.gamma, opt.iv, spot, opt.strike, tau_years);
        total_charm += c * opt.open_interest * 100.0 * direction;
        let v = vanna(opt.vega, spot, opt.strike, opt.iv, tau_years);
        total_vanna += v * opt.open_interest * 100.0 * direction;
    }

    Aggregated { total_gex, call_gex, put_gex, gex_by_strike, total_charm, total_vanna }
}

/// Cumulative GEX from the lowest strike upward; interpolates the zero crossing
/// nearest to spot.
pub fn find_flip_point(gex_by_strike: &BTreeMap<i64, f64>, spot: f64) -> Option<f64> {
    if gex_by_strike.is_empty() {
        return None;
    }

    let mut running = 0.0;
    let cumulative: Vec<(f64, f64)> = gex_by_strike
        .iter()
        .map(|(&k, &gex)| {
            running += gex;
            (k as f64 / 100.0, running)
        })
        .collect();

    let mut flips = Vec::new();
    for w in cumulative.windows(2) {
        let (s1, g1) = w[0];
        let (s2, g2) = w[1];
        if g1 * g2 < 0.0 {
            let flip = s1 + (s2 - s1) * g1.abs() / (g1.abs() + g2.abs());
            flips.push(flip);
        }
    }

    flips.into_iter().min_by(|a, b| (a - spot).abs().partial_cmp(&(b - spot).abs()).unwrap())
}

pub struct KeyLevels {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
    pub magnets: Vec<f64>,
}

/// Top-N strikes by |GEX| magnitude; positive-GEX strikes below spot become
/// support, above spot become resistance; all positive-GEX strikes double as
/// magnets sorted by proximity.
pub fn identify_key_levels(gex_by_strike: &BTreeMap<i64, f64>, spot: f64, top_n: usize) -> KeyLevels {
    if gex_by_strike.is_empty() {
        return KeyLevels { support: vec![], resistance: vec![], magnets: vec![] };
    }

    let mut by_magnitude: Vec<(f64, f64)> =
        gex_by_strike.iter().map(|(&k, &gex)| (k as f64 / 100.0, gex)).collect();
    by_magnitude.sort_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap());

    let mut support = Vec::new();
    let mut resistance = Vec::new();
    let mut magnets = Vec::new();

    for &(strike, gex) in by_magnitude.iter().take(top_n * 2) {
        if gex > 0.0 {
            magnets.push(strike);
            if strike < spot {
                support.push(strike);
            } else {
                resistance.push(strike);
            }
        }
    }

    support.sort_by(|a, b| b.partial_cmp(a).unwrap());
    support.truncate(top_n);
    resistance.sort_by(|a, b| a.partial_cmp(b).unwrap());
    resistance.truncate(top_n);
    magnets.sort_by(|a, b| (a - spot).abs().partial_cmp(&(b - spot).abs()).unwrap());
    magnets.truncate(top_n);

    KeyLevels { support, resistance, magnets }
}

pub fn determine_regime(total_gex: f64, flip_distance_pct: f64) -> GexRegime {
    if total_gex > HIGH_POSITIVE_GEX {
        GexRegime::Positive
    } else if total_gex < NEGATIVE_GEX {
        GexRegime::Negative
    } else if flip_distance_pct < 0.01 {
        GexRegime::Neutral
    } else if total_gex > 0.0 {
        GexRegime::Positive
    } else {
        GexRegime::Negative
    }
}

/// Baseline cadence by time of day, tightened near the flip point or in a
/// strongly negative-GEX regime.
pub fn refresh_interval_seconds(now: chrono::DateTime<Utc>, total_gex: f64, flip_distance_pct: f64) -> u32 {
    let t = now.time();
    let baseline = if t < NaiveTime::from_hms_opt(9, 30, 0).unwrap() {
        900
    } else if t < NaiveTime::from_hms_opt(10, 0, 0).unwrap() {
        60
    } else if t < NaiveTime::from_hms_opt(14, 0, 0).unwrap() {
        300
    } else if t < NaiveTime::from_hms_opt(15, 0, 0).unwrap() {
        60
    } else {
        30
    };

    if flip_distance_pct < 0.005 {
        return 30;
    }
    if total_gex < EXTREME_NEGATIVE_GEX {
        return baseline.min(60);
    }
    baseline
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gex_per_strike_signs_calls_and_puts_oppositely() {
        let call = gex_per_strike(0.05, 1000.0, 500.0, true);
        let put = gex_per_strike(0.05, 1000.0, 500.0, false);
        assert!(call > 0.0);
        assert!(put < 0.0);
        assert!((call + put).abs() < 1e-6);
    }

    #[test]
    fn gex_per_strike_zero_on_invalid_input() {
        assert_eq!(gex_per_strike(0.0, 1000.0, 500.0, true), 0.0);
        assert_eq!(gex_per_strike(0.05, 0.0, 500.0, true), 0.0);
    }

    #[test]
    fn flip_point_interpolates_zero_crossing() {
        let mut map = BTreeMap::new();
        map.insert(strike_key(490.0), 1_000_000.0);
        map.insert(strike_key(500.0), -3_000_000.0);
        let flip = find_flip_point(&map, 495.0).unwrap();
        assert!((490.0..=500.0).contains(&flip));
    }

    #[test]
    fn flip_point_none_without_sign_change() {
        let mut map = BTreeMap::new();
        map.insert(strike_key(490.0), 1_000_000.0);
        map.insert(strike_key(500.0), 2_000_000.0);
        assert!(find_flip_point(&map, 495.0).is_none());
    }

    #[test]
    fn regime_thresholds() {
        assert_eq!(determine_regime(600_000_000.0, 0.05), GexRegime::Positive);
        assert_eq!(determine_regime(-300_000_000.0, 0.05), GexRegime::Negative);
        assert_eq!(determine_regime(0.0, 0.005), GexRegime::Neutral);
    }

    #[test]
    fn key_levels_split_by_spot() {
        let mut map = BTreeMap::new();
        map.insert(strike_key(490.0), 5_000_000.0);
        map.insert(strike_key(510.0), 3_000_000.0);
        map.insert(strike_key(520.0), -2_000_000.0);
        let levels = identify_key_levels(&map, 500.0, 5);
        assert_eq!(levels.support, vec![490.0]);
        assert_eq!(levels.resistance, vec![510.0]);
    }
}

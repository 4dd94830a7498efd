use serde_json::Value;

use crate::types::{AggregatedFlow, LargestTrade, MIN_PREMIUM_SWEEP, SWEEP_CONDITIONS};

/// Parses Polygon options-trade rows (ticker format `O:SPY230825C00450000`)
/// into call/put premium and sweep totals. Trades under `MIN_PREMIUM_SWEEP`
/// are dropped before classification.
pub fn aggregate_flow(trades: &[Value]) -> AggregatedFlow {
    let mut call_premium = 0.0;
    let mut put_premium = 0.0;
    let mut call_sweeps = 0;
    let mut put_sweeps = 0;
    let mut largest_trade: Option<LargestTrade> = None;
    let mut largest_premium = 0.0;

    for trade in trades {
        let ticker = trade.get("ticker").and_then(|v| v.as_str()).unwrap_or("");
        if ticker.len() < 15 {
            continue;
        }

        let contract_segment = &ticker[10..12.min(ticker.len())];
        let is_call = contract_segment.contains('C');
        let is_put = contract_segment.contains('P');

        let price = trade.get("price").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let size = trade.get("size").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let conditions: Vec<u32> = trade
            .get("conditions")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|c| c.as_u64()).map(|c| c as u32).collect())
            .unwrap_or_default();

        let premium = price * size * 100.0;
        if premium < MIN_PREMIUM_SWEEP {
            continue;
        }

        let is_sweep = conditions.iter().any(|c| SWEEP_CONDITIONS.contains(c));

        if is_call {
            call_premium += premium;
            if is_sweep {
                call_sweeps += 1;
            }
        } else if is_put {
            put_premium += premium;
            if is_sweep {
                put_sweeps += 1;
            }
        }

        if premium > largest_premium {
            largest_premium = premium;
            let trade_type = if is_call && is_sweep {
                "CALL_SWEEP"
            } else if is_call {
                "CALL"
            } else if is_sweep {
                "PUT_SWEEP"
            } else {
                "PUT"
            };
            largest_trade = Some(LargestTrade {
                trade_type: trade_type.to_string(),
                premium,
                ticker: ticker.to_string(),
                size,
                price,
            });
        }
    }

    AggregatedFlow { call_premium, put_premium, call_sweeps, put_sweeps, largest_trade, total_trades: trades.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_call_sweep_above_threshold() {
        let trades = vec![json!({
            "ticker": "O:SPY230825C00450000",
            "price": 5.0,
            "size": 200,
            "conditions": [12],
        })];
        let flow = aggregate_flow(&trades);
        assert_eq!(flow.call_sweeps, 1);
        assert!(flow.call_premium > 0.0);
        assert_eq!(flow.put_premium, 0.0);
    }

    #[test]
    fn drops_trades_under_minimum_premium() {
        let trades = vec![json!({
            "ticker": "O:SPY230825C00450000",
            "price": 0.10,
            "size": 10,
            "conditions": [],
        })];
        let flow = aggregate_flow(&trades);
        assert_eq!(flow.call_premium, 0.0);
        assert_eq!(flow.total_trades, 1);
    }
}

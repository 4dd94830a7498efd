use hydra_core::Fingerprint;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// 7-factor weighted similarity used whenever embeddings are unavailable.
pub fn rule_based_similarity(a: &Fingerprint, b: &Fingerprint) -> f64 {
    let max_score = 7.0;
    let mut score = 0.0;

    if a.gex_regime == b.gex_regime {
        score += 1.5;
    }

    if a.flow_bias == b.flow_bias {
        score += 1.5;
    } else if a.flow_bias.contains("BULLISH") && b.flow_bias.contains("BULLISH") {
        score += 0.75;
    } else if a.flow_bias.contains("BEARISH") && b.flow_bias.contains("BEARISH") {
        score += 0.75;
    }

    let vix_diff = (a.vix - b.vix).abs();
    if vix_diff < 2.0 {
        score += 1.0;
    } else if vix_diff < 5.0 {
        score += 0.5;
    }

    if (a.spy_change_pct > 0.0 && b.spy_change_pct > 0.0) || (a.spy_change_pct < 0.0 && b.spy_change_pct < 0.0) {
        score += 1.0;
    }

    let range_diff = (a.spy_range_pct - b.spy_range_pct).abs();
    if range_diff < 0.5 {
        score += 0.5;
    }

    let blowup_diff = (a.blowup_score as i32 - b.blowup_score as i32).abs();
    if blowup_diff < 10 {
        score += 1.0;
    } else if blowup_diff < 20 {
        score += 0.5;
    }

    if a.dark_pool_bias == b.dark_pool_bias {
        score += 0.5;
    }

    score / max_score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_are_maximally_similar() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mismatched_lengths_yield_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn identical_fingerprints_score_one() {
        let fp = sample_fp();
        assert!((rule_based_similarity(&fp, &fp) - 1.0).abs() < 1e-9);
    }

    fn sample_fp() -> Fingerprint {
        Fingerprint {
            date: chrono::NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
            gex_regime: "NEGATIVE".to_string(),
            flow_bias: "AGGRESSIVELY_BULLISH".to_string(),
            dark_pool_bias: "BUY".to_string(),
            vix: 19.5,
            spy_change_pct: 1.2,
            spy_range_pct: 1.5,
            blowup_score: 35,
            outcome: Some(0.8),
            embedding: None,
        }
    }
}

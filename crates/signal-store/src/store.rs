use chrono::Utc;
use hydra_core::{Signal, SignalCategory, SignalPriority};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

use crate::summary::SignalSummary;

const RING_CAPACITY: usize = 1000;

struct Inner {
    live: HashMap<String, Signal>,
    ring: VecDeque<Signal>,
}

/// Deduplicates, prioritizes, expires, and summarizes Signals emitted by connectors.
/// Single writer per poll cycle (the scanner), many concurrent readers (the API).
pub struct SignalStore {
    inner: RwLock<Inner>,
}

impl Default for SignalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                live: HashMap::new(),
                ring: VecDeque::with_capacity(RING_CAPACITY),
            }),
        }
    }

    /// Insert a signal if its id is not already live; ignore otherwise. Expires
    /// stale signals as part of the same mutation.
    pub async fn insert(&self, signal: Signal) -> bool {
        let mut inner = self.inner.write().await;
        Self::expire_locked(&mut inner);

        if inner.live.contains_key(&signal.id) {
            return false;
        }
        inner.ring.push_back(signal.clone());
        if inner.ring.len() > RING_CAPACITY {
            inner.ring.pop_front();
        }
        inner.live.insert(signal.id.clone(), signal);
        true
    }

    /// Insert a batch, returning the count that were genuinely new.
    pub async fn insert_all(&self, signals: Vec<Signal>) -> usize {
        let mut new_count = 0;
        for s in signals {
            if self.insert(s).await {
                new_count += 1;
            }
        }
        new_count
    }

    fn expire_locked(inner: &mut Inner) {
        let now = Utc::now();
        inner.live.retain(|_, s| !s.is_expired(now));
    }

    /// Active signals, optionally filtered, sorted by (priority asc, strength desc).
    pub async fn active(
        &self,
        category: Option<SignalCategory>,
        min_priority: Option<SignalPriority>,
    ) -> Vec<Signal> {
        let mut inner = self.inner.write().await;
        Self::expire_locked(&mut inner);

        let mut out: Vec<Signal> = inner
            .live
            .values()
            .filter(|s| category.is_none_or(|c| s.category == c))
            .filter(|s| min_priority.is_none_or(|p| s.priority <= p))
            .cloned()
            .collect();

        out.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(b.strength.partial_cmp(&a.strength).unwrap_or(std::cmp::Ordering::Equal))
        });
        out
    }

    pub async fn summary(&self) -> SignalSummary {
        let active = self.active(None, None).await;
        SignalSummary::build(&active)
    }

    /// Last up to `n` signals ever seen, including already-expired ones, for introspection.
    pub async fn recent(&self, n: usize) -> Vec<Signal> {
        let inner = self.inner.read().await;
        inner.ring.iter().rev().take(n).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn signal(id: &str, category: SignalCategory, priority: SignalPriority, strength: f64, ttl_hours: f64) -> Signal {
        Signal {
            id: id.to_string(),
            name: id.to_string(),
            source: "test".to_string(),
            category,
            priority,
            direction: 1.0,
            strength,
            description: String::new(),
            affected_symbols: vec![],
            trade_hints: vec![],
            raw_data: Map::new(),
            detected_at: Utc::now(),
            ttl_hours,
            reliability: 1.0,
        }
    }

    #[tokio::test]
    async fn duplicate_id_is_ignored() {
        let store = SignalStore::new();
        assert!(store.insert(signal("a", SignalCategory::Crypto, SignalPriority::High, 0.5, 1.0)).await);
        assert!(!store.insert(signal("a", SignalCategory::Crypto, SignalPriority::High, 0.9, 1.0)).await);
        assert_eq!(store.active(None, None).await.len(), 1);
    }

    #[tokio::test]
    async fn expired_signals_are_excluded() {
        let store = SignalStore::new();
        store
            .insert(signal("expired", SignalCategory::Macro, SignalPriority::Low, 0.1, -1.0))
            .await;
        assert!(store.active(None, None).await.is_empty());
    }

    #[tokio::test]
    async fn active_sorts_by_priority_then_strength_desc() {
        let store = SignalStore::new();
        store.insert(signal("low-strong", SignalCategory::Crypto, SignalPriority::Low, 0.9, 1.0)).await;
        store.insert(signal("crit-weak", SignalCategory::Crypto, SignalPriority::Critical, 0.1, 1.0)).await;
        store.insert(signal("high-a", SignalCategory::Crypto, SignalPriority::High, 0.5, 1.0)).await;
        store.insert(signal("high-b", SignalCategory::Crypto, SignalPriority::High, 0.8, 1.0)).await;

        let active = store.active(None, None).await;
        let ids: Vec<&str> = active.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["crit-weak", "high-b", "high-a", "low-strong"]);
    }

    #[tokio::test]
    async fn filters_by_category_and_min_priority() {
        let store = SignalStore::new();
        store.insert(signal("c1", SignalCategory::Crypto, SignalPriority::Medium, 0.5, 1.0)).await;
        store.insert(signal("m1", SignalCategory::Macro, SignalPriority::Low, 0.5, 1.0)).await;

        let crypto_only = store.active(Some(SignalCategory::Crypto), None).await;
        assert_eq!(crypto_only.len(), 1);

        let high_or_better = store.active(None, Some(SignalPriority::Medium)).await;
        assert_eq!(high_or_better.len(), 1);
        assert_eq!(high_or_better[0].id, "c1");
    }
}

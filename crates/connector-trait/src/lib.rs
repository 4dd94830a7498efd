use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hydra_core::{ConnectorState, Signal};

/// A named data source polled on its own cadence. Concrete connectors fetch from an
/// external API or page and translate the result into zero or more `Signal`s.
///
/// `poll` must never propagate a transport, protocol, or parse failure to the caller —
/// failures are swallowed and reflected in the returned `ConnectorState.error_count`.
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;
    fn category(&self) -> hydra_core::SignalCategory;
    fn poll_interval_minutes(&self) -> i64;
    fn reliability(&self) -> f64;

    /// Current state, used by the scanner to decide whether this connector is `due`.
    fn state(&self) -> ConnectorState;

    /// Fetch and return new signals. Implementations update their own internal
    /// `error_count`/`last_poll_at` bookkeeping; they never panic and never return `Err`
    /// to the caller — an internal failure yields an empty `Vec`.
    async fn poll(&self) -> Vec<Signal>;

    fn due(&self, now: DateTime<Utc>) -> bool {
        self.state().due(now)
    }

    fn is_healthy(&self) -> bool {
        self.state().is_healthy()
    }
}

/// One row of the static source registry surfaced at `/api/sources`. Display-only —
/// it lists every known upstream, including ones with `status = Planned` that have no
/// matching `Connector` value in the scanner's active set.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SourceRegistryEntry {
    pub id: String,
    pub name: String,
    pub api: String,
    pub cost: String,
    pub status: SourceStatus,
    pub category: hydra_core::SignalCategory,
    pub poll_interval_minutes: i64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceStatus {
    Implemented,
    Planned,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_core::SignalCategory;

    struct StubConnector {
        error_count: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl Connector for StubConnector {
        fn name(&self) -> &str {
            "stub"
        }
        fn category(&self) -> SignalCategory {
            SignalCategory::Macro
        }
        fn poll_interval_minutes(&self) -> i64 {
            5
        }
        fn reliability(&self) -> f64 {
            0.8
        }
        fn state(&self) -> ConnectorState {
            ConnectorState {
                name: "stub".to_string(),
                last_poll_at: None,
                poll_interval_minutes: 5,
                error_count: self.error_count.load(std::sync::atomic::Ordering::SeqCst),
                reliability: 0.8,
            }
        }
        async fn poll(&self) -> Vec<Signal> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn due_when_never_polled() {
        let c = StubConnector {
            error_count: std::sync::atomic::AtomicU32::new(0),
        };
        assert!(c.due(Utc::now()));
        assert!(c.is_healthy());
    }

    #[tokio::test]
    async fn unhealthy_after_three_errors() {
        let c = StubConnector {
            error_count: std::sync::atomic::AtomicU32::new(3),
        };
        assert!(!c.is_healthy());
    }
}

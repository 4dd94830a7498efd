//! Lock-free poll bookkeeping shared by every connector: `Connector::state()` is a
//! sync trait method and must never block on an async mutex, so cadence and error
//! accounting live in atomics rather than a `tokio::sync::Mutex`.

use chrono::Utc;
use hydra_core::ConnectorState;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

pub struct PollBookkeeping {
    last_poll_at_millis: AtomicI64,
    error_count: AtomicU32,
}

impl Default for PollBookkeeping {
    fn default() -> Self {
        Self {
            last_poll_at_millis: AtomicI64::new(0),
            error_count: AtomicU32::new(0),
        }
    }
}

impl PollBookkeeping {
    pub fn mark_polled(&self) {
        self.last_poll_at_millis
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    pub fn record_success(&self) {
        self.error_count.store(0, Ordering::SeqCst);
    }

    pub fn record_failure(&self) {
        self.error_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::SeqCst)
    }

    fn last_poll_at(&self) -> Option<chrono::DateTime<Utc>> {
        let millis = self.last_poll_at_millis.load(Ordering::SeqCst);
        if millis == 0 {
            None
        } else {
            chrono::DateTime::from_timestamp_millis(millis)
        }
    }

    pub fn connector_state(&self, name: &str, poll_interval_minutes: i64, reliability: f64) -> ConnectorState {
        ConnectorState {
            name: name.to_string(),
            last_poll_at: self.last_poll_at(),
            poll_interval_minutes,
            error_count: self.error_count(),
            reliability,
        }
    }
}

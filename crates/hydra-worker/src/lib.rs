//! The worker half of HYDRA's process: owns no process lifecycle of its own,
//! just the long-lived subsystem handles and the six background loops that
//! keep them fed. `api-server`'s `main` constructs a `WorkerHandles`, calls
//! `spawn_workers`, and serves the HTTP/WS façade over the same handles.

pub mod config;
pub mod events;
pub mod handles;
pub mod workers;

pub use config::{is_market_hours, Config};
pub use events::WorkerEvent;
pub use handles::WorkerHandles;
pub use workers::{run_scan_once, run_scorer_tick, spawn_workers};

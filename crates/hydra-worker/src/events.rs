use hydra_core::BlowupResult;
use signal_store::SignalSummary;

/// Deltas the API façade's WS layer pushes to subscribed clients, §6.2.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    SignalsUpdate { new_count: usize, summary: SignalSummary },
    BlowupUpdate(Box<BlowupResult>),
}

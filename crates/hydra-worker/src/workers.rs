use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;
use hydra_core::Fingerprint;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::config::is_market_hours;
use crate::events::WorkerEvent;
use crate::handles::WorkerHandles;

/// Runs every due connector once and inserts whatever new signals they
/// produce into the store. Shared by the 1-minute scanner loop and the
/// manual `POST /api/scan` trigger, §6.1.
pub async fn run_scan_once(handles: &WorkerHandles) -> usize {
    let now = Utc::now();
    let mut new_signals = Vec::new();

    for connector in &handles.connectors {
        if !connector.due(now) {
            continue;
        }
        let signals = connector.poll().await;
        new_signals.extend(signals);
    }

    let inserted = handles.signal_store.insert_all(new_signals).await;
    if inserted > 0 {
        let summary = handles.signal_store.summary().await;
        let _ = handles.events_tx.send(WorkerEvent::SignalsUpdate {
            new_count: inserted,
            summary,
        });
    }
    inserted
}

/// Runs one scorer tick and broadcasts the result. Shared by the 1-minute
/// scorer loop and any on-demand `GET /api/blowup` cache-miss compute.
pub async fn run_scorer_tick(handles: &WorkerHandles) -> hydra_core::BlowupResult {
    let now = Utc::now();
    let upcoming: Vec<(String, chrono::DateTime<Utc>)> = handles
        .calendar
        .upcoming(now, 24)
        .into_iter()
        .map(|e| (e.name.clone(), e.scheduled_at()))
        .collect();

    let result = handles.scorer.tick(&upcoming).await;
    let _ = handles
        .events_tx
        .send(WorkerEvent::BlowupUpdate(Box::new(result.clone())));

    record_daily_fingerprint(handles, &result).await;
    result
}

/// Folds the day's conditions into the sequence matcher's store, at most once
/// per calendar day (idempotent upsert-by-date on the matcher's side makes
/// repeat calls harmless, but this avoids doing it every tick).
async fn record_daily_fingerprint(handles: &WorkerHandles, result: &hydra_core::BlowupResult) {
    static LAST_RECORDED_DAY: AtomicI64 = AtomicI64::new(i64::MIN);
    let today = result.timestamp.date_naive();
    let ordinal = today.num_days_from_ce() as i64;
    if LAST_RECORDED_DAY.swap(ordinal, Ordering::SeqCst) == ordinal {
        return;
    }

    let vix = result
        .components
        .iter()
        .find(|c| c.name == "flow_imbalance")
        .and_then(|c| c.details.get("vix"))
        .and_then(|v| v.as_f64())
        .unwrap_or(20.0);

    let fp = Fingerprint {
        date: today,
        gex_regime: "UNKNOWN".to_string(),
        flow_bias: "NEUTRAL".to_string(),
        dark_pool_bias: "NEUTRAL".to_string(),
        vix,
        spy_change_pct: 0.0,
        spy_range_pct: 0.0,
        blowup_score: result.probability,
        outcome: None,
        embedding: None,
    };
    handles.sequence_matcher.record_daily_conditions(fp).await;
}

async fn run_flow_tick(handles: &WorkerHandles) {
    let snapshot = handles.flow_decoder.calculate(&handles.config.primary_ticker).await;
    handles.aggregator.publish_flow(snapshot).await;
}

async fn run_dark_pool_tick(handles: &WorkerHandles) {
    let snapshot = handles.dark_pool_mapper.calculate(&handles.config.primary_ticker).await;
    handles.aggregator.publish_dark_pool(snapshot).await;
}

async fn run_gamma_tick(handles: &WorkerHandles) -> u32 {
    let snapshot = handles.gex_engine.calculate(&handles.config.primary_ticker).await;
    let refresh = snapshot.refresh_interval_seconds;
    handles.aggregator.publish_gamma(snapshot).await;
    refresh
}

async fn run_event_surprise_tick(handles: &WorkerHandles) {
    let now = Utc::now();
    for event in handles.calendar.upcoming(now, 2) {
        if let Some(surprise) = handles.surprise_detector.check_for_release(event).await {
            tracing::info!(event = %surprise.event_name, direction = ?surprise.direction, "event surprise detected");
        }
    }
}

/// Spawns the six long-running workers of §5. Each loop is an independent
/// cooperative task around blocking I/O; no worker holds a lock across a
/// suspension point, and failures inside any single tick never abort the
/// loop — they are logged and the loop continues on its next tick.
pub fn spawn_workers(handles: Arc<WorkerHandles>) -> Vec<JoinHandle<()>> {
    let mut tasks = Vec::new();

    // 1. Signal scanner, every 1 minute.
    {
        let handles = handles.clone();
        tasks.push(tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(60));
            loop {
                tick.tick().await;
                let inserted = run_scan_once(&handles).await;
                tracing::info!(new_signals = inserted, "scanner sweep complete");
            }
        }));
    }

    // 2. Blowup scorer, every 1 minute.
    {
        let handles = handles.clone();
        tasks.push(tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(handles.config.scorer_interval_secs.max(1)));
            loop {
                tick.tick().await;
                let result = run_scorer_tick(&handles).await;
                tracing::info!(
                    probability = result.probability,
                    direction = ?result.direction,
                    regime = ?result.regime,
                    recommendation = ?result.recommendation,
                    "BLOWUP tick"
                );
            }
        }));
    }

    // 3. Options-flow classifier, cadence gated on market hours.
    {
        let handles = handles.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                run_flow_tick(&handles).await;
                let secs = if is_market_hours(Utc::now()) {
                    handles.config.classifier_market_hours_secs
                } else {
                    handles.config.classifier_off_hours_secs
                };
                tokio::time::sleep(Duration::from_secs(secs.max(1))).await;
            }
        }));
    }

    // 4. Dark-pool mapper, cadence gated on market hours.
    {
        let handles = handles.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                run_dark_pool_tick(&handles).await;
                let secs = if is_market_hours(Utc::now()) {
                    handles.config.dark_pool_market_hours_secs
                } else {
                    handles.config.dark_pool_off_hours_secs
                };
                tokio::time::sleep(Duration::from_secs(secs.max(1))).await;
            }
        }));
    }

    // 5. Gamma exposure, adaptive cadence driven by the engine's own refresh table.
    {
        let handles = handles.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                let refresh = run_gamma_tick(&handles).await;
                let secs = (refresh as u64)
                    .clamp(handles.config.gamma_min_interval_secs, handles.config.gamma_max_interval_secs);
                tokio::time::sleep(Duration::from_secs(secs.max(1))).await;
            }
        }));
    }

    // 5b. Scheduled-event surprise detection, piggybacked on the scanner's cadence.
    {
        let handles = handles.clone();
        tasks.push(tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(60));
            loop {
                tick.tick().await;
                run_event_surprise_tick(&handles).await;
            }
        }));
    }

    // 6. Optional inbound-bridge poller. The bridge's own message parsing is
    // an external collaborator (§1 Non-goals); only the on/off interface
    // point is represented here.
    {
        let handles = handles.clone();
        tasks.push(tokio::spawn(async move {
            if !handles.config.inbound_bridge_enabled {
                tracing::info!("inbound bridge disabled (no token configured)");
                return;
            }
            let mut tick = interval(Duration::from_secs(30));
            loop {
                tick.tick().await;
                tracing::debug!("inbound bridge poll (no-op: bridge parsing is out of scope)");
            }
        }));
    }

    tasks
}

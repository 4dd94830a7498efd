use std::sync::Arc;
use std::time::Duration;

use bedrock_client::BedrockClient;
use blowup_scorer::Scorer;
use connector_trait::Connector;
use connectors::{
    BinanceFundingRate, BinanceOpenInterest, CboeVixMonitor, CoinGlassLiquidations,
    CreditSpreadMonitor, DxyMonitor, EconomicCalendar as ConnectorCalendar, FredConnector,
    GitHubAiMonitor, HackerNewsMonitor, PolymarketMonitor, ScheduledEvent, SkewIndexMonitor,
};
use dark_pool_mapper::DarkPoolMapper;
use event_calendar::{EventCalendar, SurpriseDetector};
use gex_engine::GexEngine;
use http_fetch::FetchClient;
use predator_intelligence::IntelligenceAggregator;
use sequence_matcher::SequenceMatcher;
use signal_store::SignalStore;
use tokio::sync::broadcast;
use weight_calibrator::WeightCalibrator;

use crate::config::Config;
use crate::events::WorkerEvent;

/// The full set of process-owned singletons, constructed once at startup and
/// shared, via `Arc`, between the worker loops and the API façade (§9:
/// "a small fixed set of long-lived values... held by the API façade and
/// passed explicitly to workers. No hidden module state.").
pub struct WorkerHandles {
    pub config: Config,
    pub signal_store: Arc<SignalStore>,
    pub connectors: Vec<Arc<dyn Connector>>,
    pub scorer: Arc<Scorer>,
    pub calendar: Arc<EventCalendar>,
    pub surprise_detector: Arc<SurpriseDetector>,
    pub gex_engine: Arc<GexEngine>,
    pub flow_decoder: Arc<flow_decoder::FlowDecoder>,
    pub dark_pool_mapper: Arc<DarkPoolMapper>,
    pub sequence_matcher: Arc<SequenceMatcher>,
    pub calibrator: Arc<WeightCalibrator>,
    pub aggregator: Arc<IntelligenceAggregator>,
    pub events_tx: broadcast::Sender<WorkerEvent>,
}

impl WorkerHandles {
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events_tx.subscribe()
    }

    /// Constructs every process-owned singleton from `config`, wiring each
    /// subsystem's own durable store under `config.data_dir`. Per-subsystem
    /// history is best-effort: a store that fails to open (missing
    /// directory, locked file) degrades that subsystem to in-memory-only
    /// rather than failing the whole process, matching each store's own
    /// `Option<HistoryStore>` contract.
    pub async fn bootstrap(config: Config) -> anyhow::Result<Arc<Self>> {
        std::fs::create_dir_all(&config.data_dir)?;

        let fetch = FetchClient::new(Duration::from_secs(10));
        let bedrock = BedrockClient::new();

        let polygon_key = config.polygon_api_key.clone().unwrap_or_default();
        let fred_key = config.fred_api_key.clone().unwrap_or_default();

        let seed_events: Vec<ScheduledEvent> = EventCalendar::load()
            .all()
            .iter()
            .map(|e| ScheduledEvent {
                name: e.name.clone(),
                at: e.scheduled_at(),
                affected_symbols: e.assets_affected.clone(),
            })
            .collect();

        let connectors: Vec<Arc<dyn Connector>> = vec![
            Arc::new(BinanceFundingRate::new("BTCUSDT", Arc::new(fetch.clone()))),
            Arc::new(BinanceOpenInterest::new("BTCUSDT", Arc::new(fetch.clone()))),
            Arc::new(CoinGlassLiquidations::new("BTC", 10_000_000.0, Arc::new(fetch.clone()))),
            Arc::new(FredConnector::new(fred_key, Arc::new(fetch.clone()))),
            Arc::new(PolymarketMonitor::new("fed", Arc::new(fetch.clone()))),
            Arc::new(CboeVixMonitor::new(polygon_key.clone(), Arc::new(fetch.clone()))),
            Arc::new(SkewIndexMonitor::new(polygon_key.clone(), Arc::new(fetch.clone()))),
            Arc::new(DxyMonitor::new(polygon_key.clone(), Arc::new(fetch.clone()))),
            Arc::new(CreditSpreadMonitor::new(polygon_key, Arc::new(fetch.clone()))),
            Arc::new(GitHubAiMonitor::new(Arc::new(fetch.clone()))),
            Arc::new(HackerNewsMonitor::new(Arc::new(fetch.clone()))),
            Arc::new(ConnectorCalendar::new(seed_events)),
        ];

        let signal_store = Arc::new(SignalStore::new());

        let scorer_history = blowup_scorer::HistoryStore::new(&config.db_path("blowup_history.db")).await.ok();
        let gex_history = gex_engine::HistoryStore::new(&config.db_path("gex_history.db")).await.ok();
        let flow_history = flow_decoder::HistoryStore::new(&config.db_path("flow_history.db")).await.ok();
        let dark_pool_history = dark_pool_mapper::HistoryStore::new(&config.db_path("dark_pool_history.db")).await.ok();
        let sequence_history = sequence_matcher::HistoryStore::new(&config.db_path("sequence_history.db")).await.ok();
        let detector_history = event_calendar::HistoryStore::new(&config.db_path("event_surprise_history.db")).await.ok();

        let calendar = Arc::new(EventCalendar::load());
        let surprise_detector = Arc::new(SurpriseDetector::new(fetch.clone(), detector_history));
        let gex_engine = Arc::new(GexEngine::new(fetch.clone(), gex_history));
        let flow_decoder = Arc::new(flow_decoder::FlowDecoder::new(fetch.clone(), bedrock.clone(), flow_history));
        let dark_pool_mapper = Arc::new(DarkPoolMapper::new(fetch.clone(), dark_pool_history));
        let sequence_matcher = Arc::new(SequenceMatcher::new(bedrock.clone(), sequence_history));

        let scorer = Arc::new(Scorer::new(fetch.clone(), hydra_core::default_weights(), scorer_history));

        let calibrator_history = weight_calibrator::HistoryStore::new(&config.db_path("calibration.db")).await?;
        let calibrator = Arc::new(WeightCalibrator::new(calibrator_history, config.weights_path.clone()).await?);
        scorer.reload_weights(calibrator.current_weights().await).await;

        let aggregator = Arc::new(IntelligenceAggregator::new(
            scorer.clone(),
            sequence_matcher.clone(),
            config.primary_ticker.clone(),
        ));

        let (events_tx, _rx) = broadcast::channel(256);

        Ok(Arc::new(Self {
            config,
            signal_store,
            connectors,
            scorer,
            calendar,
            surprise_detector,
            gex_engine,
            flow_decoder,
            dark_pool_mapper,
            sequence_matcher,
            calibrator,
            aggregator,
            events_tx,
        }))
    }
}

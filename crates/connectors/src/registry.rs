//! Static source registry surfaced at `/api/sources`. Display-only ground truth:
//! adding a row here does not register a connector, and every `Connector` built
//! below corresponds to an `IMPLEMENTED` row.

use connector_trait::{SourceRegistryEntry, SourceStatus};
use hydra_core::SignalCategory;

macro_rules! entry {
    ($id:expr, $name:expr, $api:expr, $cost:expr, $status:ident, $category:ident, $interval:expr, $desc:expr) => {
        SourceRegistryEntry {
            id: $id.to_string(),
            name: $name.to_string(),
            api: $api.to_string(),
            cost: $cost.to_string(),
            status: SourceStatus::$status,
            category: SignalCategory::$category,
            poll_interval_minutes: $interval,
            description: $desc.to_string(),
        }
    };
}

/// The full set of known data sources, implemented and planned.
pub fn data_source_registry() -> Vec<SourceRegistryEntry> {
    vec![
        entry!("binance_funding", "Binance Funding Rate", "Binance Futures", "free", Implemented, Crypto, 5, "Perpetual funding rate extremes signal crowded positioning"),
        entry!("binance_oi", "Binance Open Interest", "Binance Futures", "free", Implemented, Crypto, 5, "Sharp OI drops/rises signal cascading liquidations or new leverage"),
        entry!("coinglass_liquidations", "CoinGlass Liquidations", "CoinGlass", "free", Implemented, Crypto, 10, "Large liquidation clusters across exchanges"),
        entry!("btc_etf_flows", "BTC ETF Flows", "Farside/CoinGlass", "free", Planned, Crypto, 60, "Daily spot BTC ETF creation/redemption flow"),
        entry!("whale_alert", "Whale Alert", "whale-alert.io", "paid", Planned, Crypto, 10, "Large on-chain transfers to/from exchanges"),
        entry!("token_unlocks", "Token Unlocks", "token.unlocks.app", "free", Planned, Crypto, 1440, "Upcoming large token unlock events"),
        entry!("fred_series", "FRED Macro Series", "FRED (St. Louis Fed)", "free", Implemented, Macro, 60, "JOLTS, claims, CPI, Fed funds, yield curve, credit spreads"),
        entry!("economic_calendar", "Economic Calendar", "static schedule", "free", Implemented, Macro, 5, "NFP/CPI/FOMC/GDP/PCE proximity bands"),
        entry!("cme_margin", "CME Margin Monitor", "CME", "free", Planned, Rates, 1440, "Futures margin requirement changes"),
        entry!("shanghai_gold_premium", "Shanghai Gold Premium", "SGE", "free", Planned, Metals, 1440, "Shanghai vs. London gold price premium"),
        entry!("github_ai_monitor", "GitHub AI Release Monitor", "GitHub API", "free", Implemented, AiDisruption, 30, "Notable model/framework releases from tracked orgs"),
        entry!("hackernews_monitor", "Hacker News Monitor", "HN Algolia API", "free", Implemented, AiDisruption, 15, "Front-page velocity on AI/market-moving keywords"),
        entry!("cboe_vix", "CBOE VIX Monitor", "Polygon/Yahoo quotes", "free", Implemented, Equities, 5, "VIX level and term-structure inversion"),
        entry!("skew_index", "CBOE SKEW Index", "Polygon/Yahoo quotes", "free", Implemented, Equities, 15, "Tail-risk pricing in index options"),
        entry!("dxy_monitor", "Dollar Index Monitor", "Polygon/Yahoo quotes", "free", Implemented, Fx, 15, "USD strength cross-asset divergence input"),
        entry!("credit_spread_etfs", "HYG/LQD Spread Monitor", "Polygon/Yahoo quotes", "free", Implemented, Rates, 30, "High-yield vs investment-grade credit spread widening"),
        entry!("copper_gold_ratio", "Copper/Gold Ratio", "Polygon/Yahoo quotes", "free", Planned, Macro, 60, "Growth-vs-fear commodity ratio"),
        entry!("polymarket_odds", "Polymarket Odds", "Polymarket API", "free", Implemented, Structural, 15, "Prediction-market odds on macro/election/Fed events"),
        entry!("cme_fedwatch", "CME FedWatch", "CME", "free", Planned, Rates, 1440, "Implied Fed funds rate path from futures"),
        entry!("sec_13f_tracker", "13F Tracker", "SEC EDGAR", "free", Planned, Equities, 1440, "Large fund position changes on quarterly filings"),
        entry!("insider_transactions", "Insider Transaction Feed", "SEC EDGAR Form 4", "free", Planned, Equities, 60, "Cluster insider buying/selling"),
        entry!("dark_pool_short_interest", "FINRA Short Volume", "FINRA", "free", Planned, Equities, 1440, "Daily short-volume ratio by ticker"),
        entry!("treasury_auction", "Treasury Auction Monitor", "TreasuryDirect", "free", Planned, Rates, 1440, "Bid-to-cover ratio on note/bond auctions"),
        entry!("repo_rate_monitor", "SOFR/Repo Spread", "NY Fed", "free", Planned, Rates, 1440, "Repo market stress indicator"),
        entry!("china_pmi", "China PMI", "National Bureau of Statistics", "free", Planned, Macro, 1440, "Manufacturing/services PMI surprise"),
        entry!("german_ifo", "German IFO Index", "IFO Institute", "free", Planned, Macro, 1440, "Eurozone business climate surprise"),
        entry!("opec_inventory", "OPEC/EIA Inventory", "EIA", "free", Planned, Macro, 1440, "Crude oil inventory surprise"),
        entry!("natgas_storage", "Natural Gas Storage", "EIA", "free", Planned, Macro, 10080, "Weekly storage report surprise"),
        entry!("baltic_dry_index", "Baltic Dry Index", "Baltic Exchange", "paid", Planned, Macro, 1440, "Global shipping demand proxy"),
        entry!("semiconductor_lead_time", "Semiconductor Lead Times", "SIA", "paid", Planned, AiDisruption, 10080, "Chip supply tightness proxy"),
        entry!("reddit_wsb_sentiment", "r/wallstreetbets Velocity", "Reddit API", "free", Planned, Equities, 15, "Retail sentiment/mention velocity spikes"),
        entry!("google_trends", "Google Trends", "Google Trends API", "free", Planned, Structural, 1440, "Search-volume spikes on recession/crash terms"),
        entry!("satellite_parking", "Satellite Parking Lot Counts", "Orbital Insight", "paid", Planned, Equities, 10080, "Alt-data foot traffic proxy"),
        entry!("layoffs_tracker", "Layoffs.fyi Tracker", "layoffs.fyi", "free", Planned, Macro, 1440, "Tech layoff announcement velocity"),
        entry!("m2_money_supply", "M2 Money Supply", "FRED", "free", Planned, Macro, 10080, "Money-supply growth-rate signal"),
        entry!("cftc_positioning", "CFTC Commitment of Traders", "CFTC", "free", Planned, Macro, 10080, "Speculative futures positioning extremes"),
        entry!("geopolitical_risk_index", "Geopolitical Risk Index", "research feed", "paid", Planned, Geopolitical, 1440, "Composite geopolitical risk score"),
    ]
}

//! Web/API scrape connectors with conservative reliability: GitHub release activity
//! and Hacker News front-page velocity on tracked keywords.

use async_trait::async_trait;
use chrono::Utc;
use connector_trait::Connector;
use hydra_core::{ConnectorState, Signal, SignalCategory, SignalPriority};
use http_fetch::FetchClient;
use std::sync::Arc;

use crate::bookkeeping::PollBookkeeping;

const TRACKED_AI_ORGS: &[&str] = &["openai", "anthropics", "meta-llama", "google-deepmind"];

/// Flags notable releases (tagged, non-prerelease) from tracked AI orgs in the
/// trailing poll window.
pub struct GitHubAiMonitor {
    fetch: Arc<FetchClient>,
    bookkeeping: PollBookkeeping,
}

impl GitHubAiMonitor {
    pub fn new(fetch: Arc<FetchClient>) -> Self {
        Self {
            fetch,
            bookkeeping: PollBookkeeping::default(),
        }
    }
}

#[async_trait]
impl Connector for GitHubAiMonitor {
    fn name(&self) -> &str {
        "github_ai_monitor"
    }
    fn category(&self) -> SignalCategory {
        SignalCategory::AiDisruption
    }
    fn poll_interval_minutes(&self) -> i64 {
        30
    }
    fn reliability(&self) -> f64 {
        0.5
    }
    fn state(&self) -> ConnectorState {
        self.bookkeeping
            .connector_state(self.name(), self.poll_interval_minutes(), self.reliability())
    }

    async fn poll(&self) -> Vec<Signal> {
        self.bookkeeping.mark_polled();
        let mut signals = Vec::new();
        let mut any_ok = false;
        let since = Utc::now() - chrono::Duration::minutes(self.poll_interval_minutes());

        for org in TRACKED_AI_ORGS {
            let url = format!("https://api.github.com/orgs/{org}/repos");
            let Some(body) = self
                .fetch
                .get_json(&url, &[("sort", "pushed"), ("per_page", "5")])
                .await
            else {
                continue;
            };
            any_ok = true;
            let Some(repos) = body.as_array() else {
                continue;
            };
            for repo in repos {
                let Some(pushed_at) = repo.get("pushed_at").and_then(|v| v.as_str()) else {
                    continue;
                };
                let Ok(pushed_at) = chrono::DateTime::parse_from_rfc3339(pushed_at) else {
                    continue;
                };
                if pushed_at.with_timezone(&Utc) < since {
                    continue;
                }
                let name = repo.get("name").and_then(|v| v.as_str()).unwrap_or("repo");
                signals.push(Signal {
                    id: Signal::stable_id("github_ai_monitor", &[org, name, &pushed_at.to_rfc3339()]),
                    name: format!("{org}/{name} activity"),
                    source: "github_ai_monitor".to_string(),
                    category: SignalCategory::AiDisruption,
                    priority: SignalPriority::Low,
                    direction: 0.0,
                    strength: 0.2,
                    description: format!("{org}/{name} pushed recently"),
                    affected_symbols: vec![],
                    trade_hints: vec![],
                    raw_data: std::collections::HashMap::new(),
                    detected_at: Utc::now(),
                    ttl_hours: 4.0,
                    reliability: self.reliability(),
                });
            }
        }

        if any_ok {
            self.bookkeeping.record_success();
        } else {
            self.bookkeeping.record_failure();
        }
        signals
    }
}

const TRACKED_KEYWORDS: &[&str] = &["recession", "crash", "fed", "layoffs"];

/// Hacker News front-page velocity on tracked macro/AI keywords via the Algolia API.
pub struct HackerNewsMonitor {
    fetch: Arc<FetchClient>,
    bookkeeping: PollBookkeeping,
}

impl HackerNewsMonitor {
    pub fn new(fetch: Arc<FetchClient>) -> Self {
        Self {
            fetch,
            bookkeeping: PollBookkeeping::default(),
        }
    }
}

#[async_trait]
impl Connector for HackerNewsMonitor {
    fn name(&self) -> &str {
        "hackernews_monitor"
    }
    fn category(&self) -> SignalCategory {
        SignalCategory::Structural
    }
    fn poll_interval_minutes(&self) -> i64 {
        15
    }
    fn reliability(&self) -> f64 {
        0.4
    }
    fn state(&self) -> ConnectorState {
        self.bookkeeping
            .connector_state(self.name(), self.poll_interval_minutes(), self.reliability())
    }

    async fn poll(&self) -> Vec<Signal> {
        self.bookkeeping.mark_polled();
        let mut signals = Vec::new();
        let mut any_ok = false;

        for keyword in TRACKED_KEYWORDS {
            let Some(body) = self
                .fetch
                .get_json(
                    "https://hn.algolia.com/api/v1/search",
                    &[("query", *keyword), ("tags", "front_page")],
                )
                .await
            else {
                continue;
            };
            any_ok = true;
            let hits = body
                .get("nbHits")
                .and_then(|v| v.as_u64())
                .unwrap_or(0);
            if hits < 3 {
                continue;
            }
            let strength = ((hits as f64) / 10.0).min(1.0);
            signals.push(Signal {
                id: Signal::stable_id(
                    "hackernews_monitor",
                    &[keyword, &Utc::now().format("%Y-%m-%dT%H").to_string()],
                ),
                name: format!("HN front-page: {keyword}"),
                source: "hackernews_monitor".to_string(),
                category: SignalCategory::Structural,
                priority: SignalPriority::Low,
                direction: -0.2,
                strength,
                description: format!("{hits} front-page hits for \"{keyword}\""),
                affected_symbols: vec![],
                trade_hints: vec![],
                raw_data: std::collections::HashMap::new(),
                detected_at: Utc::now(),
                ttl_hours: 3.0,
                reliability: self.reliability(),
            });
        }

        if any_ok {
            self.bookkeeping.record_success();
        } else {
            self.bookkeeping.record_failure();
        }
        signals
    }
}

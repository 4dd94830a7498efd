//! Process-wide GET-with-cache helper shared by every connector and fetcher.
//!
//! A single [`FetchClient`] is constructed once at process start and handed to every
//! worker. It never raises to its caller: transport failures, non-200 responses, and
//! rate limiting all resolve to a cached body (if one exists) or `None`.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct CacheEntry {
    body: CachedBody,
    cached_at: Instant,
}

#[derive(Clone)]
enum CachedBody {
    Json(serde_json::Value),
    Text(String),
}

/// Sliding-window rate limiter: at most `max_requests` per `window`, shared per remote host.
struct RateLimiter {
    timestamps: Mutex<VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Mutex::new(VecDeque::new()),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }
            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }
            let wait_until = ts.front().unwrap().checked_add(self.window).unwrap();
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(25);
            drop(ts);
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Process-wide GET-with-cache helper. Text and JSON share one cache keyed by
/// canonicalized `(url, params)`.
pub struct FetchClient {
    client: reqwest::Client,
    cache: DashMap<String, CacheEntry>,
    cache_ttl: Duration,
    limiters: DashMap<String, Arc<RateLimiter>>,
    default_max_per_window: usize,
    default_window: Duration,
}

impl FetchClient {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            cache: DashMap::new(),
            cache_ttl: DEFAULT_CACHE_TTL,
            limiters: DashMap::new(),
            default_max_per_window: 60,
            default_window: Duration::from_secs(60),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    fn cache_key(url: &str, params: &[(&str, &str)]) -> String {
        let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);
        let qs: String = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{url}?{qs}")
    }

    fn host_of(url: &str) -> String {
        reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| url.to_string())
    }

    async fn limiter_for(&self, host: &str) -> Arc<RateLimiter> {
        if let Some(l) = self.limiters.get(host) {
            return l.clone();
        }
        let l = Arc::new(RateLimiter::new(
            self.default_max_per_window,
            self.default_window,
        ));
        self.limiters.insert(host.to_string(), l.clone());
        l
    }

    fn fresh(entry: &CacheEntry, ttl: Duration) -> bool {
        entry.cached_at.elapsed() < ttl
    }

    /// GET a URL, decoding the response as JSON. Returns `None` rather than raising
    /// on any transport error, non-200 status, or decode failure; on HTTP 429 or
    /// transport failure, returns the cached body (even if expired) when present.
    pub async fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Option<serde_json::Value> {
        let key = Self::cache_key(url, params);
        if let Some(entry) = self.cache.get(&key) {
            if Self::fresh(&entry, self.cache_ttl) {
                if let CachedBody::Json(v) = &entry.body {
                    return Some(v.clone());
                }
            }
        }

        let limiter = self.limiter_for(&Self::host_of(url)).await;
        limiter.acquire().await;

        let result = self.client.get(url).query(params).send().await;
        match result {
            Ok(resp) if resp.status().is_success() => match resp.json::<serde_json::Value>().await
            {
                Ok(body) => {
                    self.cache.insert(
                        key,
                        CacheEntry {
                            body: CachedBody::Json(body.clone()),
                            cached_at: Instant::now(),
                        },
                    );
                    Some(body)
                }
                Err(e) => {
                    tracing::debug!(%url, error = %e, "failed to decode JSON response");
                    self.stale_json(&key)
                }
            },
            Ok(resp) if resp.status().as_u16() == 429 => {
                tracing::debug!(%url, "rate limited, falling back to cache");
                self.stale_json(&key)
            }
            Ok(resp) => {
                tracing::debug!(%url, status = %resp.status(), "non-success response");
                self.stale_json(&key)
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "transport error");
                self.stale_json(&key)
            }
        }
    }

    /// GET a URL, returning the raw text body. Same cache/degradation contract as `get_json`.
    pub async fn get_text(&self, url: &str, params: &[(&str, &str)]) -> Option<String> {
        let key = Self::cache_key(url, params);
        if let Some(entry) = self.cache.get(&key) {
            if Self::fresh(&entry, self.cache_ttl) {
                if let CachedBody::Text(t) = &entry.body {
                    return Some(t.clone());
                }
            }
        }

        let limiter = self.limiter_for(&Self::host_of(url)).await;
        limiter.acquire().await;

        let result = self.client.get(url).query(params).send().await;
        match result {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => {
                    self.cache.insert(
                        key,
                        CacheEntry {
                            body: CachedBody::Text(body.clone()),
                            cached_at: Instant::now(),
                        },
                    );
                    Some(body)
                }
                Err(e) => {
                    tracing::debug!(%url, error = %e, "failed to read text body");
                    self.stale_text(&key)
                }
            },
            _ => self.stale_text(&key),
        }
    }

    fn stale_json(&self, key: &str) -> Option<serde_json::Value> {
        self.cache.get(key).and_then(|e| match &e.body {
            CachedBody::Json(v) => Some(v.clone()),
            CachedBody::Text(_) => None,
        })
    }

    fn stale_text(&self, key: &str) -> Option<String> {
        self.cache.get(key).and_then(|e| match &e.body {
            CachedBody::Text(t) => Some(t.clone()),
            CachedBody::Json(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_ignores_param_order() {
        let a = FetchClient::cache_key("https://x/y", &[("a", "1"), ("b", "2")]);
        let b = FetchClient::cache_key("https://x/y", &[("b", "2"), ("a", "1")]);
        assert_eq!(a, b);
    }

    #[test]
    fn host_of_extracts_hostname() {
        assert_eq!(
            FetchClient::host_of("https://api.polygon.io/v2/foo"),
            "api.polygon.io"
        );
    }

    #[tokio::test]
    async fn get_json_returns_none_without_cache_on_unreachable_host() {
        let client = FetchClient::new(Duration::from_millis(200));
        let result = client
            .get_json("http://127.0.0.1:1", &[("x", "1")])
            .await;
        assert!(result.is_none());
    }
}

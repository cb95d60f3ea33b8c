//! Scripted provider transport
//!
//! Replies come from a one-shot queue first, then from the first matching
//! route, then from a "Movie not found!" fallback. Every call is counted and
//! its parameters recorded.

use async_trait::async_trait;
use filmsift_core::error::ProviderError;
use filmsift_core::provider::{FetcherSettings, ProviderTransport, TransportResponse};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub type Params = Vec<(String, String)>;

#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, Value),
    Raw(u16, String),
    NetworkError,
    /// Never answers; exercises the per-call timeout
    Hang,
}

type Matcher = Box<dyn Fn(&Params) -> bool + Send + Sync>;

#[derive(Default)]
pub struct MockTransport {
    queue: Mutex<VecDeque<Reply>>,
    routes: Mutex<Vec<(Matcher, Reply)>>,
    default_reply: Mutex<Option<Reply>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Params>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `reply` once, before any route
    pub fn push(self, reply: Reply) -> Self {
        self.queue.lock().unwrap().push_back(reply);
        self
    }

    /// Serve `reply` when `param` equals `value` (case-insensitive)
    pub fn on(self, param: &'static str, value: &str, reply: Reply) -> Self {
        let value = value.to_lowercase();
        self.when(
            move |params| {
                params
                    .iter()
                    .any(|(k, v)| k == param && v.to_lowercase() == value)
            },
            reply,
        )
    }

    pub fn when(
        self,
        matcher: impl Fn(&Params) -> bool + Send + Sync + 'static,
        reply: Reply,
    ) -> Self {
        self.routes.lock().unwrap().push((Box::new(matcher), reply));
        self
    }

    /// Reply used when nothing else matches
    pub fn otherwise(self, reply: Reply) -> Self {
        *self.default_reply.lock().unwrap() = Some(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Params> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self, params: &Params) -> Reply {
        if let Some(reply) = self.queue.lock().unwrap().pop_front() {
            return reply;
        }
        if let Some((_, reply)) = self.routes.lock().unwrap().iter().find(|(m, _)| m(params)) {
            return reply.clone();
        }
        self.default_reply
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Reply::Json(200, not_found()))
    }
}

#[async_trait]
impl ProviderTransport for MockTransport {
    async fn get(
        &self,
        params: &[(&'static str, String)],
    ) -> Result<TransportResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let params: Params = params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        self.requests.lock().unwrap().push(params.clone());

        match self.next_reply(&params) {
            Reply::Json(status, body) => Ok(TransportResponse {
                status,
                body: body.to_string(),
            }),
            Reply::Raw(status, body) => Ok(TransportResponse { status, body }),
            Reply::NetworkError => Err(ProviderError::TransientNetwork(
                "connection refused".to_string(),
            )),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::TransientNetwork("unreachable".to_string()))
            }
        }
    }
}

/// Settings with millisecond waits so retry paths run quickly
pub fn fast_settings() -> FetcherSettings {
    FetcherSettings {
        request_timeout: Duration::from_millis(200),
        rate_limit_wait: Duration::from_millis(5),
        max_retries: 1,
        network_retries: 2,
        network_backoff: Duration::from_millis(1),
        requests_per_second: None,
        rate_limit_sentinel: "Request limit reached!".to_string(),
    }
}

pub fn movie(
    id: &str,
    title: &str,
    year: i32,
    rating: &str,
    votes: &str,
    secondary: Option<u32>,
) -> Value {
    let mut ratings = vec![json!({
        "Source": "Internet Movie Database",
        "Value": format!("{}/10", rating)
    })];
    if let Some(score) = secondary {
        ratings.push(json!({"Source": "Rotten Tomatoes", "Value": format!("{}%", score)}));
    }

    json!({
        "Title": title,
        "Year": year.to_string(),
        "imdbID": id,
        "imdbRating": rating,
        "imdbVotes": votes,
        "Metascore": "N/A",
        "Ratings": ratings,
        "Response": "True"
    })
}

pub fn not_found() -> Value {
    json!({"Response": "False", "Error": "Movie not found!"})
}

pub fn rate_limited() -> Value {
    json!({"Response": "False", "Error": "Request limit reached!"})
}

pub fn search_results(results: &[(&str, i32, &str)]) -> Value {
    let entries: Vec<Value> = results
        .iter()
        .map(|(title, year, id)| {
            json!({"Title": title, "Year": year.to_string(), "imdbID": id, "Type": "movie"})
        })
        .collect();
    json!({"Search": entries, "totalResults": results.len().to_string(), "Response": "True"})
}

pub fn has_param(params: &Params, key: &str) -> bool {
    params.iter().any(|(k, _)| k == key)
}

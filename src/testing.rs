//! Test fixtures: sample records and a mock registry server that counts requests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::Uri;
use axum::response::Response;
use axum::Router;
use chrono::{TimeZone, Utc};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::models::{Dependency, DependencyMetadata, Language};
use crate::registry::Metadata;

pub fn sample_metadata(source: &str) -> Metadata {
    Metadata {
        publish_date: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
        total_downloads: 10_000,
        recent_downloads: 500,
        license: Some("MIT".to_string()),
        source: source.to_string(),
    }
}

/// A Go dependency with the given age in days.
pub fn aged_dep(name: &str, age_days: i64) -> Dependency {
    Dependency::new(name, "v1.0.0", Language::Go)
        .with_metadata(DependencyMetadata::default().with_age_days(age_days))
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
    delay: Option<Duration>,
}

impl MockResponse {
    pub fn json(body: &str) -> Self {
        MockResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        MockResponse {
            status,
            headers: Vec::new(),
            body: String::new(),
            delay: None,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
struct ServerState {
    routes: HashMap<String, MockResponse>,
    hits: HashMap<String, usize>,
}

type SharedState = Arc<Mutex<ServerState>>;

/// Registry stand-in served by axum on an ephemeral port.
///
/// Every request falls through to one handler that counts it by path and
/// answers from the registered routes; unknown paths answer 404.
pub struct MockServer {
    addr: SocketAddr,
    state: SharedState,
    task: JoinHandle<()>,
}

async fn respond(State(state): State<SharedState>, uri: Uri) -> Response {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let response = {
        let mut state = state.lock().unwrap();
        *state.hits.entry(path.clone()).or_insert(0) += 1;
        state
            .routes
            .get(&path)
            .cloned()
            .unwrap_or_else(|| MockResponse::status(404))
    };

    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }

    let mut builder = Response::builder()
        .status(response.status)
        .header(CONTENT_TYPE, "application/json");
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.body(Body::from(response.body)).unwrap()
}

impl MockServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = SharedState::default();

        let app = Router::new()
            .fallback(respond)
            .with_state(Arc::clone(&state));
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        MockServer { addr, state, task }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn route(&self, path: &str, response: MockResponse) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(path.to_string(), response);
    }

    /// Total requests received.
    pub fn hits(&self) -> usize {
        self.state.lock().unwrap().hits.values().sum()
    }

    pub fn hits_for(&self, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .hits
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

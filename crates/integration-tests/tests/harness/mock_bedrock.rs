//! Mock Bedrock runtime for integration tests
//!
//! Serves `converse-stream` and `invoke` with scripted behaviour: failing
//! the first N calls, delaying headers, splitting stream frames on arbitrary
//! byte boundaries and holding a stream open.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use bytes::Bytes;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Captured details of the most recent request
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub model: String,
    pub authorization: Option<String>,
    pub trace_id: Option<String>,
    pub body: serde_json::Value,
}

/// Scripted behaviour for a [`MockBedrock`]
#[derive(Debug, Clone)]
pub struct MockBuilder {
    fail_first: u32,
    fail_status: StatusCode,
    fail_body: String,
    header_delay: Duration,
    chunks: Vec<Vec<u8>>,
    chunk_delay: Duration,
    hold_open: bool,
    embedding_delays: HashMap<String, Duration>,
}

impl Default for MockBuilder {
    fn default() -> Self {
        Self {
            fail_first: 0,
            fail_status: StatusCode::INTERNAL_SERVER_ERROR,
            fail_body: r#"{"message":"mock failure"}"#.to_owned(),
            header_delay: Duration::ZERO,
            chunks: Vec::new(),
            chunk_delay: Duration::ZERO,
            hold_open: false,
            embedding_delays: HashMap::new(),
        }
    }
}

impl MockBuilder {
    /// Fail the first `n` calls with `status` and `body`
    pub fn fail_first(mut self, n: u32, status: StatusCode, body: &str) -> Self {
        self.fail_first = n;
        self.fail_status = status;
        body.clone_into(&mut self.fail_body);
        self
    }

    /// Delay every response before headers are sent
    pub fn header_delay(mut self, delay: Duration) -> Self {
        self.header_delay = delay;
        self
    }

    /// Raw body chunks written for `converse-stream`, in order
    pub fn chunks<I, B>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        self.chunks = chunks.into_iter().map(|c| c.as_ref().to_vec()).collect();
        self
    }

    /// Pause before each body chunk
    pub fn chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Never end the stream after the scripted chunks
    pub const fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Delay the embedding response for one input text
    pub fn embedding_delay(mut self, input: &str, delay: Duration) -> Self {
        self.embedding_delays.insert(input.to_owned(), delay);
        self
    }

    pub async fn start(self) -> anyhow::Result<MockBedrock> {
        MockBedrock::start_inner(self).await
    }
}

pub struct MockBedrock {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    script: MockBuilder,
    converse_count: AtomicU32,
    invoke_count: AtomicU32,
    remaining_failures: AtomicU32,
    last: Mutex<Option<Captured>>,
}

impl MockBedrock {
    pub fn builder() -> MockBuilder {
        MockBuilder::default()
    }

    /// Start a mock that streams `chunks` verbatim
    pub async fn streaming<I, B>(chunks: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        Self::builder().chunks(chunks).start().await
    }

    async fn start_inner(script: MockBuilder) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            remaining_failures: AtomicU32::new(script.fail_first),
            script,
            converse_count: AtomicU32::new(0),
            invoke_count: AtomicU32::new(0),
            last: Mutex::new(None),
        });

        let app = Router::new()
            .route("/model/{model}/converse-stream", routing::post(handle_converse_stream))
            .route("/model/{model}/invoke", routing::post(handle_invoke))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Endpoint override pointing the adapter at this mock
    pub fn endpoint(&self) -> url::Url {
        url::Url::parse(&format!("http://{}/", self.addr)).unwrap()
    }

    /// Number of `converse-stream` calls received
    pub fn converse_count(&self) -> u32 {
        self.state.converse_count.load(Ordering::Relaxed)
    }

    /// Number of `invoke` calls received
    pub fn invoke_count(&self) -> u32 {
        self.state.invoke_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Captured {
        self.state.last.lock().unwrap().clone().unwrap_or_default()
    }
}

impl Drop for MockBedrock {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl MockState {
    fn capture(&self, model: String, headers: &HeaderMap, body: serde_json::Value) {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);

        *self.last.lock().unwrap() = Some(Captured {
            model,
            authorization: header("authorization"),
            trace_id: header("x-trace-id"),
            body,
        });
    }

    /// Consume one scripted failure, if any remain
    fn scripted_failure(&self) -> Option<Response> {
        let took = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        took.then(|| (self.script.fail_status, self.script.fail_body.clone()).into_response())
    }
}

async fn handle_converse_stream(
    State(state): State<Arc<MockState>>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.converse_count.fetch_add(1, Ordering::Relaxed);
    state.capture(model, &headers, body);

    tokio::time::sleep(state.script.header_delay).await;

    if let Some(failure) = state.scripted_failure() {
        return failure;
    }

    let delay = state.script.chunk_delay;
    let chunks = futures_util::stream::iter(state.script.chunks.clone()).then(move |chunk| async move {
        tokio::time::sleep(delay).await;
        Ok::<_, Infallible>(Bytes::from(chunk))
    });

    let body = if state.script.hold_open {
        Body::from_stream(chunks.chain(futures_util::stream::pending()))
    } else {
        Body::from_stream(chunks)
    };

    (
        StatusCode::OK,
        [("content-type", "application/vnd.amazon.eventstream")],
        body,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvokeBody {
    input_text: String,
    #[serde(default)]
    dimensions: Option<u32>,
}

async fn handle_invoke(
    State(state): State<Arc<MockState>>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(raw): Json<serde_json::Value>,
) -> Response {
    state.invoke_count.fetch_add(1, Ordering::Relaxed);
    state.capture(model, &headers, raw.clone());

    let Ok(body) = serde_json::from_value::<InvokeBody>(raw) else {
        return (StatusCode::BAD_REQUEST, "missing inputText").into_response();
    };

    if let Some(delay) = state.script.embedding_delays.get(&body.input_text) {
        tokio::time::sleep(*delay).await;
    }

    if body.input_text == "reject me" {
        return (StatusCode::BAD_REQUEST, r#"{"message":"input rejected"}"#).into_response();
    }

    if let Some(failure) = state.scripted_failure() {
        return failure;
    }

    // First component encodes the input length so callers can check ordering
    #[allow(clippy::cast_precision_loss)]
    let embedding = vec![body.input_text.len() as f32, body.dimensions.unwrap_or(0) as f32];

    Json(serde_json::json!({
        "embedding": embedding,
        "inputTextTokenCount": 3,
    }))
    .into_response()
}

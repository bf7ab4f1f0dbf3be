//! Local stand-in for the Cortex Analyst endpoints, for tests.

use std::collections::VecDeque;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode, Uri},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use crate::client::{AnalystClient, FEEDBACK_ENDPOINT, MESSAGE_ENDPOINT};
use crate::credentials::StaticCredentials;

/// A request as the mock server saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

/// A canned reply, served in queue order
#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    delay: Option<Duration>,
    body: Value,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            delay: None,
            body,
        }
    }

    /// A 200 reply sent only after `delay`
    pub fn delayed(delay: Duration, body: Value) -> Self {
        Self {
            status: 200,
            delay: Some(delay),
            body,
        }
    }
}

#[derive(Clone, Default)]
struct MockState {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct MockServer {
    addr: SocketAddr,
    state: MockState,
}

impl MockServer {
    pub async fn start(replies: Vec<Reply>) -> Self {
        let state = MockState {
            replies: Arc::new(Mutex::new(replies.into())),
            ..MockState::default()
        };

        let app = Router::new()
            .route(MESSAGE_ENDPOINT, post(handle))
            .route(FEEDBACK_ENDPOINT, post(handle))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        listener
            .set_nonblocking(true)
            .expect("set mock listener non-blocking");
        let addr = listener.local_addr().expect("mock server address");
        let server = axum::Server::from_tcp(listener)
            .expect("mock server from listener")
            .serve(app.into_make_service());
        tokio::spawn(async move {
            let _ = server.await;
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().expect("requests lock").clone()
    }
}

async fn handle(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    state
        .requests
        .lock()
        .expect("requests lock")
        .push(RecordedRequest {
            path: uri.path().to_string(),
            authorization: headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        });

    let reply = state.replies.lock().expect("replies lock").pop_front();
    match reply {
        Some(reply) => {
            if let Some(delay) = reply.delay {
                tokio::time::sleep(delay).await;
            }
            let status =
                StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(reply.body))
        }
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "no reply queued"})),
        ),
    }
}

/// A client pointed at `server` with token `test-token`
pub fn mock_client(server: &MockServer, timeout: Duration) -> AnalystClient {
    let credentials = Arc::new(StaticCredentials::new(server.url(), "test-token"));
    AnalystClient::new(credentials, timeout).expect("build client")
}

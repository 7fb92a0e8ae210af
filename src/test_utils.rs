//! Shared test utilities: recording API, style-fix and mirror doubles, and
//! webhook fixtures.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::git::{GitError, GitResult, StyleFixOutcome, StyleFixRequest, StyleFixer};
use crate::github::{ApiClient, ApiRequest, ApiResponse, Method, TransportError};
use crate::mirror::{MirrorError, MirrorStore};
use crate::webhooks::Event;

/// Headers GitHub attaches to an ordinary, non-rate-limited response.
pub fn default_response() -> ApiResponse {
    ApiResponse::new(200)
        .with_header("x-ratelimit-limit", "2")
        .with_header("x-ratelimit-remaining", "1")
        .with_header("x-ratelimit-reset", "0")
        .with_header("content-type", "application/json; charset=utf-8")
}

struct MockState {
    queued: VecDeque<Result<ApiResponse, TransportError>>,
    fallback: ApiResponse,
    requests: Vec<ApiRequest>,
    sleeps: Vec<Duration>,
}

/// An [`ApiClient`] that records every call and never touches the network.
///
/// Responses are served from a queue; once the queue is empty every call gets
/// the fallback response (200 with [`default_response`] headers unless
/// overridden). Clones share state, so a test can hand one clone to the code
/// under test and inspect the other.
#[derive(Clone)]
pub struct MockApiClient {
    state: Arc<Mutex<MockState>>,
}

impl MockApiClient {
    pub fn new() -> Self {
        Self::with_fallback(default_response())
    }

    pub fn with_fallback(fallback: ApiResponse) -> Self {
        MockApiClient {
            state: Arc::new(Mutex::new(MockState {
                queued: VecDeque::new(),
                fallback,
                requests: Vec::new(),
                sleeps: Vec::new(),
            })),
        }
    }

    pub fn push_response(&self, response: ApiResponse) {
        self.state.lock().unwrap().queued.push_back(Ok(response));
    }

    pub fn push_error(&self, error: TransportError) {
        self.state.lock().unwrap().queued.push_back(Err(error));
    }

    /// All requests made so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Only the POST requests made so far.
    pub fn posts(&self) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == Method::Post)
            .collect()
    }

    /// Every duration passed to `sleep`.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().sleeps.clone()
    }
}

impl Default for MockApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request);
        match state.queued.pop_front() {
            Some(result) => result,
            None => Ok(state.fallback.clone()),
        }
    }

    async fn sleep(&self, duration: Duration) {
        self.state.lock().unwrap().sleeps.push(duration);
    }
}

/// A [`StyleFixer`] that records requests and answers from a queue, falling
/// back to a clean `NothingToCommit`.
#[derive(Clone, Default)]
pub struct MockStyleFixer {
    queued: Arc<Mutex<VecDeque<GitResult<StyleFixOutcome>>>>,
    requests: Arc<Mutex<Vec<StyleFixRequest>>>,
}

impl MockStyleFixer {
    pub fn push_outcome(&self, outcome: StyleFixOutcome) {
        self.queued.lock().unwrap().push_back(Ok(outcome));
    }

    pub fn push_error(&self, error: GitError) {
        self.queued.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<StyleFixRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl StyleFixer for MockStyleFixer {
    async fn fix(&self, request: StyleFixRequest) -> GitResult<StyleFixOutcome> {
        self.requests.lock().unwrap().push(request);
        self.queued.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(StyleFixOutcome::NothingToCommit {
                style_output: String::new(),
            })
        })
    }
}

/// A [`MirrorStore`] that records deleted prefixes.
#[derive(Clone, Default)]
pub struct MockMirrorStore {
    deleted: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MockMirrorStore {
    /// Makes every later delete fail with `details`.
    pub fn fail_with(&self, details: &str) {
        *self.failure.lock().unwrap() = Some(details.to_string());
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MirrorStore for MockMirrorStore {
    fn bucket(&self) -> &str {
        "spack-binaries-prs"
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, MirrorError> {
        if let Some(details) = self.failure.lock().unwrap().clone() {
            return Err(MirrorError::Delete {
                bucket: self.bucket().to_string(),
                details,
            });
        }
        self.deleted.lock().unwrap().push(prefix.to_string());
        Ok(3)
    }
}

/// Loads a canned webhook payload by file name.
pub fn load_fixture(name: &str) -> Value {
    let raw = match name {
        "check_run.json" => include_str!("../fixtures/check_run.json"),
        "pull_request_opened.json" => include_str!("../fixtures/pull_request_opened.json"),
        "issue_comment_created.json" => include_str!("../fixtures/issue_comment_created.json"),
        other => panic!("unknown fixture: {other}"),
    };
    serde_json::from_str(raw).unwrap()
}

/// Builds an [`Event`] from a fixture, taking the action from the payload.
pub fn fixture_event(kind: &str, name: &str) -> Event {
    Event::new(kind, "1234", load_fixture(name))
}

/// Removes the value at a `/`-separated JSON pointer, for malformed-payload tests.
pub fn remove_path(payload: &mut Value, pointer: &str) {
    let (parent, key) = pointer.rsplit_once('/').unwrap();
    match payload.pointer_mut(parent) {
        Some(Value::Object(map)) => {
            map.remove(key);
        }
        Some(Value::Array(items)) => {
            let idx: usize = key.parse().unwrap();
            items.remove(idx);
        }
        _ => panic!("no container at {parent}"),
    }
}

/// Replaces the value at a JSON pointer.
pub fn set_path(payload: &mut Value, pointer: &str, value: Value) {
    *payload.pointer_mut(pointer).unwrap() = value;
}

//! Scripted [`HttpTransport`] for exercising the client's retry policy.
//!
//! Each `get` pops the next scripted reply and records the URL and the
//! (tokio) instant of the call, so tests running with a paused clock can
//! assert exact backoff gaps.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::adapter::outbound::coingecko::{HttpResponse, HttpTransport, TransportError};

type Reply = Result<HttpResponse, TransportError>;

pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(Url, Instant)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn push(self, reply: Reply) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    /// Queue a 200 with `body`.
    pub fn ok(self, body: &str) -> Self {
        self.push(Ok(HttpResponse {
            status: 200,
            retry_after_secs: None,
            body: body.to_string(),
        }))
    }

    /// Queue an empty-bodied response with `status`.
    pub fn status(self, status: u16) -> Self {
        self.push(Ok(HttpResponse {
            status,
            retry_after_secs: None,
            body: String::new(),
        }))
    }

    /// Queue a 429, optionally carrying `Retry-After`.
    pub fn rate_limited(self, retry_after_secs: Option<u64>) -> Self {
        self.push(Ok(HttpResponse {
            status: 429,
            retry_after_secs,
            body: String::new(),
        }))
    }

    /// Queue a network-level failure.
    pub fn fail(self, reason: &str) -> Self {
        self.push(Err(TransportError(reason.to_string())))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().iter().map(|(_, at)| *at).collect()
    }

    pub fn requests(&self) -> Vec<Url> {
        self.calls.lock().iter().map(|(url, _)| url.clone()).collect()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        self.calls.lock().push((url.clone(), Instant::now()));
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("no scripted reply left".into())))
    }
}

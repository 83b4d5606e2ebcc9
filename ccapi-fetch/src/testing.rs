//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use ccapi_core::HttpMethod;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::TransportError;
use crate::host::{HttpRequest, HttpResponse, Transport};
use crate::request::RequestBody;

/// A request as the transport saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    pub at: Instant,
}

impl RecordedCall {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            Some(RequestBody::Json(value)) => Some(value),
            _ => None,
        }
    }
}

/// Replays queued outcomes in order and records every call.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, status: u16, body: &str) -> Self {
        self.push(Ok(HttpResponse::new(status, body)))
    }

    pub fn reply_unreadable(self, status: u16) -> Self {
        self.push(Ok(HttpResponse { status, body: None }))
    }

    pub fn fail(self) -> Self {
        self.push(Err(TransportError::Other("connection refused".to_string())))
    }

    pub fn fail_build(self, reason: &str) -> Self {
        self.push(Err(TransportError::Build(reason.to_string())))
    }

    fn push(self, outcome: Result<HttpResponse, TransportError>) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method,
            url: request.url,
            headers: request.headers,
            body: request.body,
            at: Instant::now(),
        });

        if request.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            return Err(TransportError::Cancelled);
        }

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("script exhausted".to_string())))
    }
}

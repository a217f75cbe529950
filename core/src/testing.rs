//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

/// Records every request and replays scripted outcomes in order. Once the
/// script runs out it answers with the fallback response (200 `{}` unless
/// changed with `always`).
pub(crate) struct RecordingTransport {
    requests: Mutex<Vec<HttpRequest>>,
    script: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
    fallback: Mutex<(u16, String)>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new((200, "{}".to_string())),
        }
    }

    pub(crate) fn push_response(&self, status: u16, body: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body)));
    }

    pub(crate) fn push_error(&self, error: ApiError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    pub(crate) fn always(&self, status: u16, body: &str) {
        *self.fallback.lock().unwrap() = (status, body.to_string());
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request);
        if let Some(outcome) = self.script.lock().unwrap().pop_front() {
            return outcome;
        }
        let (status, body) = self.fallback.lock().unwrap().clone();
        Ok(HttpResponse::new(status, body))
    }
}

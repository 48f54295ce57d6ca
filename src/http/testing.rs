//! Scripted transport for unit tests

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::error::ApiError;
use super::transport::{HttpRequest, HttpResponse, Transport};

/// Replays queued responses in order and records every request it sees
///
/// Sending with an empty queue fails the test loudly: an unexpected network
/// call is exactly what most tests are checking against.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, String>>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, status: u16, body: Value) -> Self {
        let status = StatusCode::from_u16(status).expect("valid status");
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::json(status, &body)));
        self
    }

    pub fn reply_raw(self, response: HttpResponse) -> Self {
        self.replies.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.clone();
        self.sent.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(ApiError::Transport(message)),
            None => panic!("unexpected request to {}", url),
        }
    }
}

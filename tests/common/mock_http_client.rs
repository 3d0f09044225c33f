#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use authcode_session::{HttpClient, HttpRequest, HttpResponse};

/// Scripted `HttpClient` for driving the router without a network. Clones
/// share one script and one log, so a test keeps a handle while the router
/// owns another. Running out of script behaves like a transport failure.
#[derive(Clone, Default)]
pub struct MockHttpClient {
    script: Arc<Mutex<VecDeque<HttpResponse>>>,
    log: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_response(&self, response: HttpResponse) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn enqueue_json(&self, status: u16, body: serde_json::Value) {
        self.enqueue_response(HttpResponse {
            status,
            body: serde_json::to_vec(&body).unwrap(),
        });
    }

    /// Drains the request log.
    pub fn take_requests(&self) -> Vec<HttpRequest> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }

    pub fn request_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

impl HttpClient for MockHttpClient {
    async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, Box<dyn std::error::Error + Send + Sync>> {
        self.log.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        next.ok_or_else(|| "connection refused: no scripted response".into())
    }
}

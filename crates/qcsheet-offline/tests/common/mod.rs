#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use qcsheet_offline::{
    ControllerConfig, FetchError, Network, OfflineController, Request, ResourceCache, Response,
    ResponseKind,
};
use url::Url;

pub const SCOPE: &str = "https://qc.example.com/uipc/";

pub fn url(path: &str) -> Url {
    Url::parse(SCOPE)
        .and_then(|scope| scope.join(path))
        .expect("test url")
}

pub fn ok(body: &str) -> Response {
    Response::new(200, ResponseKind::Basic, body).with_header("Content-Type", "text/plain")
}

pub fn config(version: &str) -> ControllerConfig {
    ControllerConfig {
        version: version.to_string(),
        scope: Url::parse(SCOPE).expect("scope"),
        ..ControllerConfig::default()
    }
}

/// Canned responses keyed by URL; unknown URLs answer 404. While offline every fetch fails.
#[derive(Default)]
pub struct FakeNetwork {
    responses: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, path: &str, response: Response) {
        self.responses
            .lock()
            .expect("responses")
            .insert(url(path).to_string(), response);
    }

    /// Serves every default precache entry.
    pub fn serve_precache(&self) {
        for entry in ControllerConfig::default().precache {
            self.serve(&entry, ok(&entry));
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls").len()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.calls
            .lock()
            .expect("calls")
            .push(request.url.to_string());
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Status {
                status: 0,
                status_text: "network unreachable".to_string(),
                url: request.url.to_string(),
            });
        }
        let response = self
            .responses
            .lock()
            .expect("responses")
            .get(request.url.as_str())
            .cloned();
        Ok(response.unwrap_or_else(|| Response::new(404, ResponseKind::Basic, "not found")))
    }
}

pub fn controller(
    version: &str,
    cache: Arc<dyn ResourceCache>,
    network: Arc<FakeNetwork>,
) -> OfflineController {
    OfflineController::new(config(version), cache, network).expect("controller")
}

use async_trait::async_trait;
use qcsheet_net::{FetchError, DEFAULT_MAX_BODY_BYTES};
use url::{Origin, Url};

use crate::request::{Request, Response, ResponseKind};

/// Sends requests that the cache could not (or must not) answer.
///
/// Any HTTP response, including error statuses, is `Ok`; `Err` means no response arrived.
#[async_trait]
pub trait Network: Send + Sync + 'static {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// `reqwest`-backed network. Responses whose final URL shares the app's origin are `Basic`,
/// everything else is `Cors`.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
    origin: Origin,
    max_body_bytes: usize,
}

impl HttpNetwork {
    pub fn new(app_url: &Url) -> Result<Self, FetchError> {
        Ok(Self {
            client: qcsheet_net::build_client()?,
            origin: app_url.origin(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        const CONTEXT: &str = "app resource";
        qcsheet_net::ensure_url_allowed(&request.url, CONTEXT)?;

        let mut response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await?;

        let status = response.status();
        let kind = if response.url().origin() == self.origin {
            ResponseKind::Basic
        } else {
            ResponseKind::Cors
        };
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body =
            qcsheet_net::read_response_body_with_limit(&mut response, self.max_body_bytes, CONTEXT)
                .await?;

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
            kind,
        })
    }
}

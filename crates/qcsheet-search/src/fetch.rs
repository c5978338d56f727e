use async_trait::async_trait;
use qcsheet_net::{FetchError, DEFAULT_MAX_BODY_BYTES};
use url::Url;

/// Retrieves the raw bytes of a register by source id.
#[async_trait]
pub trait SourceFetcher: Send + Sync + 'static {
    async fn fetch(&self, source_id: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches sources over HTTP(S), resolving relative ids against `base_url`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Option<Url>,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(base_url: Option<Url>) -> Result<Self, FetchError> {
        Ok(Self {
            client: qcsheet_net::build_client()?,
            base_url,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, source_id: &str) -> Result<Vec<u8>, FetchError> {
        const CONTEXT: &str = "register download";

        let url = qcsheet_net::resolve_url(self.base_url.as_ref(), source_id)?;
        qcsheet_net::ensure_url_allowed(&url, CONTEXT)?;

        log::debug!("downloading `{source_id}` from {url}");
        let mut response = self.client.get(url).send().await?;
        qcsheet_net::ensure_success(&response)?;
        qcsheet_net::read_response_body_with_limit(&mut response, self.max_body_bytes, CONTEXT)
            .await
    }
}

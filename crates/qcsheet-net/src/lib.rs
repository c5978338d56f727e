//! HTTP plumbing shared by `qcsheet-search` and `qcsheet-offline`.
//!
//! Both consumers download whole payloads into memory (register workbooks, app assets), so every
//! body read goes through [`read_response_body_with_limit`]:
//! - If `Content-Length` is present and exceeds the limit, the read fails before downloading.
//! - Otherwise the body is streamed and the read fails once `limit + 1` bytes have been observed.
//!
//! Redirects are followed like a browser `fetch` would, but every hop must stay on http/https.

use thiserror::Error;
use url::Url;

/// Default cap for a single downloaded payload.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024; // 64 MiB

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{context}: only http/https allowed, got `{scheme}` ({url})")]
    DisallowedScheme {
        context: String,
        scheme: String,
        url: String,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status} {status_text} for {url}")]
    Status {
        status: u16,
        status_text: String,
        url: String,
    },
    #[error("Response body too large for {context} (limit {limit} bytes, Content-Length {content_length} bytes)")]
    ContentLengthTooLarge {
        context: String,
        limit: usize,
        content_length: u64,
    },
    #[error("Response body too large for {context} (limit {limit} bytes, received {received} bytes)")]
    BodyTooLarge {
        context: String,
        limit: usize,
        received: usize,
    },
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Parse `url`, or resolve it against `base` when it is relative.
pub fn resolve_url(base: Option<&Url>, url: &str) -> Result<Url> {
    let parsed = match base {
        Some(base) => base.join(url),
        None => Url::parse(url),
    };
    parsed.map_err(|source| FetchError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}

pub fn ensure_url_allowed(url: &Url, context: &str) -> Result<()> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FetchError::DisallowedScheme {
            context: context.to_string(),
            scheme: other.to_string(),
            url: url.to_string(),
        }),
    }
}

/// Build the shared client. Redirect hops that leave http/https are not followed; the 3xx
/// response is then surfaced to the caller as a non-success status.
pub fn build_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::custom(|attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.stop();
            }
            match ensure_url_allowed(attempt.url(), "redirect") {
                Ok(()) => attempt.follow(),
                Err(_) => attempt.stop(),
            }
        }))
        .build()?;
    Ok(client)
}

/// Fail with [`FetchError::Status`] unless the response has a 2xx status.
pub fn ensure_success(response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    Err(FetchError::Status {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("").to_string(),
        url: response.url().to_string(),
    })
}

/// Read a `reqwest::Response` body into memory, enforcing a hard maximum size.
pub async fn read_response_body_with_limit(
    response: &mut reqwest::Response,
    limit_bytes: usize,
    context: &str,
) -> Result<Vec<u8>> {
    if let Some(content_length) = response.content_length() {
        if content_length > limit_bytes as u64 {
            return Err(FetchError::ContentLengthTooLarge {
                context: context.to_string(),
                limit: limit_bytes,
                content_length,
            });
        }
    }

    let max_bytes = limit_bytes.saturating_add(1);
    let mut out: Vec<u8> = Vec::new();

    while let Some(chunk) = response.chunk().await? {
        if out.len().saturating_add(chunk.len()) >= max_bytes {
            return Err(FetchError::BodyTooLarge {
                context: context.to_string(),
                limit: limit_bytes,
                received: max_bytes,
            });
        }
        out.extend_from_slice(&chunk);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(
        status_line: &'static str,
        body: Vec<u8>,
        content_length: Option<usize>,
    ) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test http listener");
        let addr = listener.local_addr().expect("listener addr");

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");

            let mut buf = [0u8; 1024];
            let mut request = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.expect("read request");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request.windows(4).any(|w| w == b"\r\n\r\n") || request.len() > 16 * 1024 {
                    break;
                }
            }

            let mut headers = format!("HTTP/1.1 {status_line}\r\n");
            if let Some(len) = content_length {
                headers.push_str(&format!("Content-Length: {len}\r\n"));
            }
            headers.push_str("Connection: close\r\n\r\n");

            // The client may stop reading early once it hits the size cap.
            let _ = socket.write_all(headers.as_bytes()).await;
            let _ = socket.write_all(&body).await;
        });

        (format!("http://{addr}/"), handle)
    }

    #[tokio::test]
    async fn allows_small_bodies() {
        let (url, handle) = serve_once("200 OK", b"hello".to_vec(), Some(5)).await;

        let client = build_client().expect("build client");
        let mut response = client.get(url).send().await.expect("send");

        let body = read_response_body_with_limit(&mut response, 10, "test")
            .await
            .unwrap();
        assert_eq!(body, b"hello");

        handle.await.expect("server task");
    }

    #[tokio::test]
    async fn rejects_oversized_content_length() {
        let (url, handle) = serve_once("200 OK", Vec::new(), Some(11)).await;

        let client = build_client().expect("build client");
        let mut response = client.get(url).send().await.expect("send");

        let err = read_response_body_with_limit(&mut response, 10, "test")
            .await
            .expect_err("expected limit error");
        let msg = err.to_string();
        assert!(
            msg.contains("limit 10") && msg.contains("Content-Length 11"),
            "unexpected error: {msg}"
        );

        handle.await.expect("server task");
    }

    #[tokio::test]
    async fn streams_until_limit_plus_one() {
        let (url, handle) = serve_once("200 OK", vec![b'a'; 32], None).await;

        let client = build_client().expect("build client");
        let mut response = client.get(url).send().await.expect("send");

        let err = read_response_body_with_limit(&mut response, 10, "test")
            .await
            .expect_err("expected limit error");
        let msg = err.to_string();
        assert!(
            msg.contains("limit 10") && msg.contains("received 11"),
            "unexpected error: {msg}"
        );

        handle.await.expect("server task");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, handle) = serve_once("404 Not Found", Vec::new(), Some(0)).await;

        let client = build_client().expect("build client");
        let response = client.get(url).send().await.expect("send");

        let err = ensure_success(&response).expect_err("404 should fail");
        assert!(
            matches!(err, FetchError::Status { status: 404, .. }),
            "unexpected error: {err}"
        );

        handle.await.expect("server task");
    }

    #[test]
    fn rejects_non_http_schemes() {
        let url = Url::parse("ftp://example.com/book.xlsx").unwrap();
        let err = ensure_url_allowed(&url, "fetch").unwrap_err();
        assert!(err.to_string().contains("only http/https allowed"));

        let ok = Url::parse("https://example.com/book.xlsx").unwrap();
        ensure_url_allowed(&ok, "fetch").unwrap();
    }

    #[test]
    fn resolves_relative_sources_against_base() {
        let base = Url::parse("https://qc.example.com/app/").unwrap();
        let url = resolve_url(Some(&base), "excel/环保测试记录表.xlsx").unwrap();
        assert!(url.as_str().starts_with("https://qc.example.com/app/excel/"));

        let err = resolve_url(None, "excel/book.xlsx").unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}

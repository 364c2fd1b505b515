use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app::FetchError;
use crate::fetcher::Fetcher;

pub const DEFAULT_USER_AGENT: &str = concat!("broadsheet/", env!("CARGO_PKG_VERSION"));

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_options(DEFAULT_USER_AGENT, None)
    }

    /// Without a `timeout` the transport default applies (no overall limit).
    pub fn with_options(user_agent: &str, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent);

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let declared_len = response.content_length();

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Truncated(e.to_string()))?;

        if let Some(expected) = declared_len {
            if (body.len() as u64) < expected {
                return Err(FetchError::Truncated(format!(
                    "received {} of {} bytes",
                    body.len(),
                    expected
                )));
            }
        }

        tracing::debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"[]".to_vec()))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let body = fetcher
            .fetch(&format!("{}/data.json", server.uri()))
            .await
            .unwrap();

        assert_eq!(body, b"[]");
    }

    #[tokio::test]
    async fn test_fetch_accepts_any_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "text/plain")
                    .set_body_bytes(b"not json at all".to_vec()),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let body = fetcher.fetch(&server.uri()).await.unwrap();
        assert_eq!(body, b"not json at all");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let result = fetcher.fetch(&format!("{}/missing", server.uri())).await;

        assert_eq!(result, Err(FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_fetch_server_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let result = fetcher.fetch(&server.uri()).await;

        assert_eq!(result, Err(FetchError::Status(503)));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Reserve a port, then close it so nothing is listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new().unwrap();
        let result = fetcher.fetch(&format!("http://{}/data.json", addr)).await;

        assert!(
            matches!(result, Err(FetchError::Connection(_))),
            "expected connection error, got {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_fetch_truncated_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n[{\"id\":")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let fetcher = HttpFetcher::new().unwrap();
        let result = fetcher.fetch(&format!("http://{}/", addr)).await;

        assert!(
            matches!(result, Err(FetchError::Truncated(_))),
            "expected truncation, got {:?}",
            result
        );
    }
}

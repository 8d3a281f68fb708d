//! HTTP client abstraction for testability

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Identifies this client to tile servers, per their usage policies.
const DEFAULT_USER_AGENT: &str = "tracklapse/0.1 (+https://github.com/tracklapse/tracklapse)";

/// Errors from a single HTTP request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The request never produced a usable response.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

/// A successful response body plus its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Trait for HTTP GET operations.
///
/// This abstraction allows for dependency injection and easier testing by
/// enabling mock HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request with extra request headers.
    ///
    /// Returns the response body and content type, or an [`HttpError`] for
    /// transport failures and non-2xx statuses.
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<HttpResponse, HttpError>>;
}

impl<T: AsyncHttpClient + ?Sized> AsyncHttpClient for Arc<T> {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<HttpResponse, HttpError>> {
        (**self).get(url, headers)
    }
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::Client,
    user_agent: String,
}

impl ReqwestClient {
    /// Creates a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::Transport {
                url: String::new(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    /// Overrides the User-Agent header sent with every request.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl AsyncHttpClient for ReqwestClient {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<HttpResponse, HttpError>> {
        Box::pin(async move {
            let mut request = self
                .client
                .get(url)
                .header(reqwest::header::USER_AGENT, &self.user_agent);
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }

            let response = request.send().await.map_err(|e| HttpError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(HttpError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();

            let bytes = response
                .bytes()
                .await
                .map_err(|e| HttpError::Transport {
                    url: url.to_string(),
                    reason: format!("failed to read response: {e}"),
                })?
                .to_vec();

            Ok(HttpResponse {
                bytes,
                content_type,
            })
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock HTTP client for testing.
    ///
    /// Serves a scripted response sequence, then keeps repeating the final
    /// entry. Every call is counted and its URL recorded.
    pub struct MockHttpClient {
        script: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
        fallback: Result<HttpResponse, HttpError>,
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        /// Responds identically to every request.
        pub fn always(response: Result<HttpResponse, HttpError>) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback: response,
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            }
        }

        /// Serves the scripted responses in order, then repeats the last one.
        pub fn sequence(mut responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            let fallback = responses
                .pop()
                .unwrap_or_else(|| Err(HttpError::Transport {
                    url: String::new(),
                    reason: "empty mock script".to_string(),
                }));
            Self {
                script: Mutex::new(responses.into()),
                fallback,
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            }
        }

        /// Shorthand for a client that always succeeds with `bytes`.
        pub fn serving(bytes: Vec<u8>, content_type: &str) -> Self {
            Self::always(Ok(HttpResponse {
                bytes,
                content_type: content_type.to_string(),
            }))
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn requested_urls(&self) -> Vec<String> {
            self.urls.lock().clone()
        }
    }

    impl AsyncHttpClient for MockHttpClient {
        fn get<'a>(
            &'a self,
            url: &'a str,
            _headers: &'a [(String, String)],
        ) -> BoxFuture<'a, Result<HttpResponse, HttpError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().push(url.to_string());
            let response = self
                .script
                .lock()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());
            Box::pin(async move { response })
        }
    }

    #[tokio::test]
    async fn test_mock_client_success() {
        let mock = MockHttpClient::serving(vec![1, 2, 3, 4], "image/png");
        let result = mock.get("http://example.com/tile.png", &[]).await.unwrap();
        assert_eq!(result.bytes, vec![1, 2, 3, 4]);
        assert_eq!(result.content_type, "image/png");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_client_error() {
        let mock = MockHttpClient::always(Err(HttpError::Status {
            status: 503,
            url: "http://example.com".to_string(),
        }));
        let result = mock.get("http://example.com", &[]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_client_sequence_then_fallback() {
        let mock = MockHttpClient::sequence(vec![
            Err(HttpError::Transport {
                url: "u".to_string(),
                reason: "reset".to_string(),
            }),
            Ok(HttpResponse {
                bytes: vec![9],
                content_type: String::new(),
            }),
        ]);
        assert!(mock.get("http://a", &[]).await.is_err());
        assert!(mock.get("http://b", &[]).await.is_ok());
        // Script exhausted: the final entry keeps repeating.
        assert!(mock.get("http://c", &[]).await.is_ok());
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.requested_urls().len(), 3);
    }
}

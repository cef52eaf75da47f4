use std::pin::Pin;
use std::time::{Duration, Instant};

use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::process_sse;
use crate::types::{ChatCompletion, ChatCompletionChunk, ChatCompletionRequest};

/// The base URL of the GonkaGate OpenAI-compatible API.
pub const DEFAULT_BASE_URL: &str = "https://api.gonkagate.com/v1";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A boxed stream of chat completion chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>;

/// The remote completion capability the chat engine talks to.
///
/// Implementations perform exactly one attempt per call; zero-choice or empty-content
/// responses are not errors at this level.
#[async_trait::async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Send a request and wait for the complete response.
    async fn send(&self, request: ChatCompletionRequest) -> Result<ChatCompletion>;

    /// Send a request and return the response as a stream of chunks.
    async fn stream(&self, request: ChatCompletionRequest) -> Result<ChunkStream>;
}

/// Client for an OpenAI-compatible Chat Completions API.
#[derive(Debug, Clone)]
pub struct OpenAi {
    api_key: String,
    client: ReqwestClient,
    base_url: Url,
    timeout: Option<Duration>,
}

impl OpenAi {
    /// Create a new client for the given API key and base URL.
    ///
    /// No overall request timeout is applied; in-flight requests end when they complete or
    /// when the caller drops them.
    pub fn new(api_key: impl Into<String>, base_url: &str) -> Result<Self> {
        Self::with_options(api_key, base_url, None)
    }

    /// Create a new client with an optional whole-request timeout.
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::authentication("API key must not be empty"));
        }

        // Url::join replaces the last path segment unless the base ends with a slash.
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = Url::parse(&base_url)?;

        let mut builder = ReqwestClient::builder().connect_timeout(CONNECT_TIMEOUT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
        })
    }

    /// Returns the base URL requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn completions_url(&self) -> Result<Url> {
        Ok(self.base_url.join("chat/completions")?)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key.trim()))
            .map_err(|_| Error::validation("API key is not a valid header value", None))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    async fn post(&self, request: &ChatCompletionRequest, headers: HeaderMap) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let started = Instant::now();
        let response = self
            .client
            .post(self.completions_url()?)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e));
        CLIENT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                return Err(err);
            }
        };
        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                self.timeout.map(|t| t.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        error_from_status(status_code, &error_body, request_id, retry_after)
    }
}

/// Map an HTTP error status and body to an [`Error`].
///
/// The message comes from `{"error": {"message": ...}}` when the body has that shape and
/// from the raw body otherwise.
pub(crate) fn error_from_status(
    status_code: u16,
    body: &str,
    request_id: Option<String>,
    retry_after: Option<u64>,
) -> Error {
    #[derive(Deserialize)]
    struct ErrorResponse {
        error: Option<ErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        #[serde(rename = "type")]
        error_type: Option<String>,
        message: Option<String>,
        param: Option<String>,
    }

    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.error);
    let error_type = detail.as_ref().and_then(|e| e.error_type.clone());
    let error_param = detail.as_ref().and_then(|e| e.param.clone());
    let error_message = detail
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.trim().to_string());

    match status_code {
        400 => Error::bad_request(error_message, error_param),
        401 => Error::authentication(error_message),
        402 => Error::payment_required(error_message),
        403 => Error::permission(error_message),
        404 => Error::not_found(error_message),
        408 => Error::timeout(error_message, None),
        429 => Error::rate_limit(error_message, retry_after),
        500 => Error::internal_server(error_message, request_id),
        503 => Error::service_unavailable(error_message, retry_after),
        _ => Error::api(status_code, error_type, error_message, request_id),
    }
}

#[async_trait::async_trait]
impl CompletionTransport for OpenAi {
    async fn send(&self, mut request: ChatCompletionRequest) -> Result<ChatCompletion> {
        request.stream = false;
        let response = self.post(&request, self.default_headers()?).await?;
        response.json::<ChatCompletion>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    async fn stream(&self, mut request: ChatCompletionRequest) -> Result<ChunkStream> {
        request.stream = true;
        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let response = self.post(&request, headers).await?;
        Ok(Box::pin(process_sse(response.bytes_stream())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessageParam;

    #[test]
    fn client_creation() {
        let client = OpenAi::new("test-key", DEFAULT_BASE_URL).unwrap();
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.base_url.as_str(), "https://api.gonkagate.com/v1/");
        assert_eq!(client.timeout, None);
        assert_eq!(
            client.completions_url().unwrap().as_str(),
            "https://api.gonkagate.com/v1/chat/completions"
        );

        let client = OpenAi::with_options(
            "test-key",
            "https://custom.example.com/api/v1/",
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(
            client.completions_url().unwrap().as_str(),
            "https://custom.example.com/api/v1/chat/completions"
        );
        assert_eq!(client.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn rejects_bad_settings() {
        assert!(OpenAi::new("  ", DEFAULT_BASE_URL).unwrap_err().is_authentication());
        assert!(matches!(
            OpenAi::new("key", "not a url"),
            Err(Error::Url { .. })
        ));
    }

    #[test]
    fn headers_carry_bearer_token() {
        let client = OpenAi::new("sk-123", DEFAULT_BASE_URL).unwrap();
        let headers = client.default_headers().unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Bearer sk-123");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn status_mapping() {
        let body = r#"{"error":{"message":"Invalid API key","type":"invalid_request_error"}}"#;
        let err = error_from_status(401, body, None, None);
        assert!(err.is_authentication());
        assert_eq!(err.to_string(), "Authentication error: Invalid API key");

        let err = error_from_status(402, "insufficient balance", None, None);
        assert_eq!(err.status_code(), Some(402));
        assert_eq!(err.to_string(), "Payment required: insufficient balance");

        let err = error_from_status(429, "{}", None, Some(7));
        assert!(matches!(
            err,
            Error::RateLimit {
                retry_after: Some(7),
                ..
            }
        ));

        let err = error_from_status(503, "", None, None);
        assert_eq!(err.status_code(), Some(503));

        let err = error_from_status(502, "bad gateway", Some("req-1".to_string()), None);
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(err.request_id(), Some("req-1"));
    }

    #[tokio::test]
    async fn live_round_trip() {
        // Runs only when a real endpoint is configured.
        let (Ok(api_key), Ok(model)) = (
            std::env::var("GONKAGATE_API_KEY"),
            std::env::var("GONKAGATE_MODEL"),
        ) else {
            eprintln!("Skipping live_round_trip: GONKAGATE_API_KEY/GONKAGATE_MODEL not set");
            return;
        };

        let client = OpenAi::new(api_key, DEFAULT_BASE_URL).unwrap();
        let request = ChatCompletionRequest::new(
            model,
            vec![ChatMessageParam::user("Say hi in one short sentence.")],
        )
        .with_temperature(0.2);
        let completion = client.send(request).await.unwrap();
        assert!(!completion.choices.is_empty());
    }
}

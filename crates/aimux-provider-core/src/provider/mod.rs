use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::headers::{Headers, header_get};
use crate::{
    Completion, ErrorKind, GenerateRequest, ProviderDescriptor, ProviderKind, ProviderResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamHttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

#[derive(Debug, Clone)]
pub struct UpstreamHttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpstreamTransportErrorKind {
    Timeout,
    ReadTimeout,
    Connect,
    Dns,
    Tls,
    Other,
}

#[derive(Debug, Clone)]
pub enum UpstreamFailure {
    /// Transport-level failures (no HTTP response).
    Transport {
        kind: UpstreamTransportErrorKind,
        message: String,
    },
    /// Non-2xx HTTP response captured as bytes.
    Http {
        status: u16,
        headers: Headers,
        body: Bytes,
    },
}

/// Per-attempt error with a deterministic failover classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    /// Provider `Retry-After` hint, when one was sent.
    pub retry_after: Option<Duration>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ClassifiedError {}

const MAX_ERROR_DETAIL_CHARS: usize = 512;

/// Status/transport based classification shared by every adapter.
pub fn classify_failure(failure: &UpstreamFailure) -> ClassifiedError {
    match failure {
        UpstreamFailure::Http {
            status,
            headers,
            body,
        } => {
            let kind = match *status {
                429 => ErrorKind::RateLimited,
                401 | 403 => ErrorKind::AuthError,
                408 => ErrorKind::Timeout,
                500..=599 => ErrorKind::ServerError,
                400..=499 => ErrorKind::InvalidRequest,
                // Redirects and other oddities: treat as a broken upstream.
                _ => ErrorKind::ServerError,
            };
            ClassifiedError {
                kind,
                message: format!("http_status_{status}: {}", error_detail(body)),
                retry_after: if kind == ErrorKind::RateLimited {
                    parse_retry_after(headers)
                } else {
                    None
                },
            }
        }
        UpstreamFailure::Transport { kind, message } => {
            let kind = match kind {
                UpstreamTransportErrorKind::Timeout | UpstreamTransportErrorKind::ReadTimeout => {
                    ErrorKind::Timeout
                }
                UpstreamTransportErrorKind::Connect
                | UpstreamTransportErrorKind::Dns
                | UpstreamTransportErrorKind::Tls
                | UpstreamTransportErrorKind::Other => ErrorKind::ServerError,
            };
            ClassifiedError::new(kind, message.clone())
        }
    }
}

fn parse_retry_after(headers: &Headers) -> Option<Duration> {
    let value = header_get(headers, "retry-after")?.trim();
    if value.is_empty() {
        return None;
    }
    let secs = value.parse::<u64>().ok()?;
    Some(Duration::from_secs(secs))
}

fn error_detail(body: &Bytes) -> String {
    let text = String::from_utf8_lossy(body);
    let compact = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.is_empty() {
        return "empty body".to_string();
    }
    let mut out = compact
        .chars()
        .take(MAX_ERROR_DETAIL_CHARS)
        .collect::<String>();
    if compact.chars().count() > MAX_ERROR_DETAIL_CHARS {
        out.push_str("...");
    }
    out
}

/// Performs the outbound IO for adapters. Tests substitute a scripted fake.
pub trait UpstreamClient: Send + Sync {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>;
}

/// One implementation per backend family. Stateless: health bookkeeping is the
/// orchestrator's job.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn build_request(
        &self,
        descriptor: &ProviderDescriptor,
        request: &GenerateRequest,
    ) -> ProviderResult<UpstreamHttpRequest>;

    /// Decodes a 2xx body into text + usage.
    fn parse_response(&self, body: &Bytes) -> Result<Completion, ClassifiedError>;

    /// Hook for families whose error signals need more than the status code.
    fn classify_failure(&self, failure: &UpstreamFailure) -> ClassifiedError {
        classify_failure(failure)
    }

    /// Sends one attempt bounded by `timeout`.
    async fn send(
        &self,
        client: &dyn UpstreamClient,
        descriptor: &ProviderDescriptor,
        request: &GenerateRequest,
        timeout: Duration,
    ) -> Result<Completion, ClassifiedError> {
        // A slot that cannot even build its request is broken locally, not the request.
        let upstream_req = self.build_request(descriptor, request).map_err(|err| {
            ClassifiedError::new(ErrorKind::ServerError, format!("build request: {err}"))
        })?;
        tracing::debug!(
            event = "upstream_request",
            slot = descriptor.slot,
            provider = %descriptor.kind,
            method = upstream_req.method.as_str(),
            url = %upstream_req.url,
        );

        let resp = match tokio::time::timeout(timeout, client.send(upstream_req)).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(failure)) => return Err(self.classify_failure(&failure)),
            Err(_) => {
                return Err(ClassifiedError::new(
                    ErrorKind::Timeout,
                    format!("no response within {}ms", timeout.as_millis()),
                ));
            }
        };

        if !(200..300).contains(&resp.status) {
            return Err(self.classify_failure(&UpstreamFailure::Http {
                status: resp.status,
                headers: resp.headers,
                body: resp.body,
            }));
        }
        self.parse_response(&resp.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> UpstreamFailure {
        UpstreamFailure::Http {
            status,
            headers: Vec::new(),
            body: Bytes::from_static(b"{\"error\":\"x\"}"),
        }
    }

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(classify_failure(&http(429)).kind, ErrorKind::RateLimited);
        assert_eq!(classify_failure(&http(401)).kind, ErrorKind::AuthError);
        assert_eq!(classify_failure(&http(403)).kind, ErrorKind::AuthError);
        assert_eq!(classify_failure(&http(408)).kind, ErrorKind::Timeout);
        assert_eq!(classify_failure(&http(502)).kind, ErrorKind::ServerError);
        assert_eq!(classify_failure(&http(400)).kind, ErrorKind::InvalidRequest);
        assert_eq!(classify_failure(&http(422)).kind, ErrorKind::InvalidRequest);
    }

    #[test]
    fn transport_kinds_map_to_timeout_or_server() {
        let timeout = UpstreamFailure::Transport {
            kind: UpstreamTransportErrorKind::ReadTimeout,
            message: "read timed out".to_string(),
        };
        assert_eq!(classify_failure(&timeout).kind, ErrorKind::Timeout);
        let dns = UpstreamFailure::Transport {
            kind: UpstreamTransportErrorKind::Dns,
            message: "no such host".to_string(),
        };
        assert_eq!(classify_failure(&dns).kind, ErrorKind::ServerError);
    }

    #[test]
    fn retry_after_is_kept_for_rate_limits_only() {
        let failure = UpstreamFailure::Http {
            status: 429,
            headers: vec![("Retry-After".to_string(), "17".to_string())],
            body: Bytes::new(),
        };
        let err = classify_failure(&failure);
        assert_eq!(err.retry_after, Some(Duration::from_secs(17)));
        assert!(err.message.contains("empty body"));

        let failure = UpstreamFailure::Http {
            status: 503,
            headers: vec![("retry-after".to_string(), "17".to_string())],
            body: Bytes::new(),
        };
        assert_eq!(classify_failure(&failure).retry_after, None);
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let failure = UpstreamFailure::Http {
            status: 500,
            headers: Vec::new(),
            body: Bytes::from("x".repeat(2_000)),
        };
        let err = classify_failure(&failure);
        assert!(err.message.ends_with("..."));
        assert!(err.message.len() < 600);
    }
}

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use aimux_common::GlobalConfig;
use aimux_provider_core::{
    Headers, HttpMethod, UpstreamClient, UpstreamFailure, UpstreamHttpRequest,
    UpstreamHttpResponse, UpstreamTransportErrorKind,
};

#[derive(Debug, Clone)]
pub struct UpstreamClientConfig {
    pub proxy: Option<String>,
    pub connect_timeout: Duration,
    /// Outer bound for a whole exchange; attempts are usually cut shorter by the adapter.
    pub request_timeout: Duration,
}

impl UpstreamClientConfig {
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            proxy: global
                .proxy
                .as_deref()
                .map(str::trim)
                .filter(|proxy| !proxy.is_empty())
                .map(str::to_string),
            request_timeout: Duration::from_secs(global.request_timeout_secs.max(1)),
            ..Self::default()
        }
    }
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(300),
        }
    }
}

/// Shared wreq client; one connection pool for every slot.
#[derive(Clone)]
pub struct WreqUpstreamClient {
    inner: wreq::Client,
}

impl WreqUpstreamClient {
    pub fn new(config: UpstreamClientConfig) -> Result<Self, wreq::Error> {
        let mut builder = wreq::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout);
        if let Some(proxy) = config.proxy.as_deref() {
            builder = builder.proxy(wreq::Proxy::all(proxy)?);
        }
        Ok(Self {
            inner: builder.build()?,
        })
    }

    async fn execute(&self, req: UpstreamHttpRequest) -> Result<UpstreamHttpResponse, UpstreamFailure> {
        let method = match req.method {
            HttpMethod::Post => wreq::Method::POST,
        };
        let mut call = self.inner.request(method, &req.url);
        for (name, value) in &req.headers {
            call = call.header(name, value);
        }
        if let Some(body) = req.body {
            call = call.body(body);
        }

        let resp = call.send().await.map_err(transport_failure)?;
        let status = resp.status().as_u16();
        let headers: Headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = resp.bytes().await.map_err(transport_failure)?;
        Ok(UpstreamHttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl UpstreamClient for WreqUpstreamClient {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>
    {
        Box::pin(self.execute(req))
    }
}

fn transport_failure(err: wreq::Error) -> UpstreamFailure {
    let message = err.to_string();
    let kind = transport_kind(
        &message.to_ascii_lowercase(),
        err.is_timeout(),
        err.is_connect() || err.is_connection_reset(),
    );
    UpstreamFailure::Transport { kind, message }
}

/// wreq exposes only coarse predicates; the message tells DNS and TLS apart.
fn transport_kind(message: &str, timed_out: bool, connecting: bool) -> UpstreamTransportErrorKind {
    let mentions = |needles: &[&str]| needles.iter().any(|needle| message.contains(needle));
    if timed_out {
        if mentions(&["read"]) {
            UpstreamTransportErrorKind::ReadTimeout
        } else {
            UpstreamTransportErrorKind::Timeout
        }
    } else if mentions(&["tls", "ssl", "certificate"]) {
        UpstreamTransportErrorKind::Tls
    } else if connecting && mentions(&["dns", "resolve", "lookup"]) {
        UpstreamTransportErrorKind::Dns
    } else if connecting {
        UpstreamTransportErrorKind::Connect
    } else {
        UpstreamTransportErrorKind::Other
    }
}

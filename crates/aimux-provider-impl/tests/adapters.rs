use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use aimux_common::ProvidersConfig;
use aimux_provider_core::{
    ChatMessage, ErrorKind, GenerateRequest, ProviderAdapter, UpstreamClient, UpstreamFailure,
    UpstreamHttpRequest, UpstreamHttpResponse, header_get,
};
use aimux_provider_impl::build_registry;
use bytes::Bytes;

/// Replays canned responses and records the requests it saw.
struct CannedClient {
    status: u16,
    headers: Vec<(String, String)>,
    body: &'static str,
    seen: Mutex<Vec<UpstreamHttpRequest>>,
}

impl CannedClient {
    fn new(status: u16, body: &'static str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl UpstreamClient for CannedClient {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>
    {
        Box::pin(async move {
            self.seen.lock().unwrap().push(req);
            Ok(UpstreamHttpResponse {
                status: self.status,
                headers: self.headers.clone(),
                body: Bytes::from_static(self.body.as_bytes()),
            })
        })
    }
}

fn config(vars: &[(&str, &str)]) -> ProvidersConfig {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ProvidersConfig::from_lookup(|key| map.get(key).cloned())
}

fn request() -> GenerateRequest {
    GenerateRequest::new(vec![ChatMessage::user("ping")])
}

#[tokio::test]
async fn openrouter_slot_round_trips_through_the_registry() {
    let registry = build_registry(&config(&[
        ("AIMUX_PROVIDER_1_TYPE", "OpenRouter"),
        ("AIMUX_PROVIDER_1_KEY", "or-key"),
    ]))
    .unwrap();
    let provider = &registry.providers()[0];
    let client = CannedClient::new(
        200,
        r#"{"choices":[{"message":{"content":"pong"}}],"usage":{"prompt_tokens":1,"completion_tokens":1,"total_tokens":2}}"#,
    );

    let completion = provider
        .adapter
        .send(&client, &provider.descriptor, &request(), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(completion.text, "pong");

    let seen = client.seen.lock().unwrap();
    assert_eq!(seen[0].url, "https://openrouter.ai/api/v1/chat/completions");
    assert_eq!(header_get(&seen[0].headers, "authorization"), Some("Bearer or-key"));
}

#[tokio::test]
async fn gemini_slot_honours_base_url_override() {
    let registry = build_registry(&config(&[
        ("AIMUX_PROVIDER_3_TYPE", "gemini"),
        ("AIMUX_PROVIDER_3_KEY", "g-key"),
        ("AIMUX_PROVIDER_3_MODEL", "gemini-2.0-flash"),
        ("AIMUX_PROVIDER_3_BASE_URL", "http://127.0.0.1:9000/"),
    ]))
    .unwrap();
    let provider = registry.get(3).unwrap();
    let client = CannedClient::new(200, r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]}}]}"#);

    let completion = provider
        .adapter
        .send(&client, &provider.descriptor, &request(), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(completion.text, "ok");
    assert_eq!(completion.usage, None);
    assert_eq!(
        client.seen.lock().unwrap()[0].url,
        "http://127.0.0.1:9000/v1beta/models/gemini-2.0-flash:generateContent"
    );
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let registry = build_registry(&config(&[
        ("AIMUX_PROVIDER_1_TYPE", "groq"),
        ("AIMUX_PROVIDER_1_KEY", "gsk"),
    ]))
    .unwrap();
    let provider = &registry.providers()[0];
    let mut client = CannedClient::new(429, r#"{"error":{"message":"Rate limit reached"}}"#);
    client.headers.push(("retry-after".to_string(), "90".to_string()));

    let err = provider
        .adapter
        .send(&client, &provider.descriptor, &request(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimited);
    assert_eq!(err.retry_after, Some(Duration::from_secs(90)));
}

#[tokio::test]
async fn deepseek_auth_failure_is_classified() {
    let registry = build_registry(&config(&[
        ("AIMUX_PROVIDER_2_TYPE", "deepseek"),
        ("AIMUX_PROVIDER_2_KEY", "bad"),
    ]))
    .unwrap();
    let provider = &registry.providers()[0];
    let client = CannedClient::new(401, r#"{"error":{"message":"Authentication Fails"}}"#);

    let err = provider
        .adapter
        .send(&client, &provider.descriptor, &request(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthError);
    assert_eq!(provider.descriptor.model, "deepseek-chat");
}

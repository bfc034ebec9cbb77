use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use aimux_provider_core::{
    ChatMessage, ClassifiedError, Completion, ErrorKind, GenerateRequest, HttpMethod,
    ProviderAdapter, ProviderDescriptor, ProviderKind, ProviderResult, UpstreamClient,
    UpstreamFailure, UpstreamHttpRequest, UpstreamHttpResponse, UpstreamTransportErrorKind,
};
use bytes::Bytes;

struct EchoAdapter;

impl ProviderAdapter for EchoAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAI
    }

    fn build_request(
        &self,
        descriptor: &ProviderDescriptor,
        request: &GenerateRequest,
    ) -> ProviderResult<UpstreamHttpRequest> {
        Ok(UpstreamHttpRequest {
            method: HttpMethod::Post,
            url: format!("https://example.test/{}", descriptor.model),
            headers: Vec::new(),
            body: Some(Bytes::from(request.messages[0].content.clone())),
        })
    }

    fn parse_response(&self, body: &Bytes) -> Result<Completion, ClassifiedError> {
        Ok(Completion {
            text: String::from_utf8_lossy(body).into_owned(),
            usage: None,
        })
    }
}

enum Reply {
    Respond(u16, &'static str),
    Fail(UpstreamTransportErrorKind),
    Hang,
}

struct ScriptedClient {
    reply: Reply,
    seen: Mutex<Vec<String>>,
}

impl UpstreamClient for ScriptedClient {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>
    {
        Box::pin(async move {
            self.seen.lock().unwrap().push(req.url.clone());
            match self.reply {
                Reply::Respond(status, body) => Ok(UpstreamHttpResponse {
                    status,
                    headers: Vec::new(),
                    body: Bytes::from_static(body.as_bytes()),
                }),
                Reply::Fail(kind) => Err(UpstreamFailure::Transport {
                    kind,
                    message: "boom".to_string(),
                }),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!()
                }
            }
        })
    }
}

fn client(reply: Reply) -> ScriptedClient {
    ScriptedClient {
        reply,
        seen: Mutex::new(Vec::new()),
    }
}

fn descriptor() -> ProviderDescriptor {
    ProviderDescriptor {
        slot: 1,
        kind: ProviderKind::OpenAI,
        api_key: "sk".to_string(),
        model: "m1".to_string(),
        priority: 1,
        base_url: None,
    }
}

fn request() -> GenerateRequest {
    GenerateRequest::new(vec![ChatMessage::user("hello")])
}

#[tokio::test]
async fn success_body_is_parsed() {
    let client = client(Reply::Respond(200, "hi there"));
    let completion = EchoAdapter
        .send(&client, &descriptor(), &request(), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(completion.text, "hi there");
    assert_eq!(
        client.seen.lock().unwrap().as_slice(),
        &["https://example.test/m1".to_string()]
    );
}

#[tokio::test]
async fn http_errors_are_classified() {
    let client = client(Reply::Respond(429, "slow down"));
    let err = EchoAdapter
        .send(&client, &descriptor(), &request(), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimited);
    assert!(err.message.contains("slow down"));
}

#[tokio::test]
async fn transport_errors_are_classified() {
    let client = client(Reply::Fail(UpstreamTransportErrorKind::Connect));
    let err = EchoAdapter
        .send(&client, &descriptor(), &request(), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServerError);
}

#[tokio::test(start_paused = true)]
async fn hanging_upstream_times_out() {
    let client = client(Reply::Hang);
    let err = EchoAdapter
        .send(&client, &descriptor(), &request(), Duration::from_millis(250))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Timeout);
    assert!(err.message.contains("250ms"));
}

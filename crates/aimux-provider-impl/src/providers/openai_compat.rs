use aimux_provider_core::headers::{set_bearer, set_json_content};
use aimux_provider_core::{
    ClassifiedError, Completion, ErrorKind, GenerateRequest, HttpMethod, ProviderAdapter,
    ProviderDescriptor, ProviderError, ProviderKind, ProviderResult, UpstreamHttpRequest,
    UsageSummary,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::build_url;

/// Chat-completions adapter shared by every OpenAI-compatible backend.
#[derive(Debug, Clone, Copy)]
pub struct OpenAICompatibleAdapter {
    kind: ProviderKind,
    default_base: &'static str,
}

impl OpenAICompatibleAdapter {
    /// Returns `None` for kinds that do not speak the chat-completions dialect.
    pub fn new(kind: ProviderKind) -> Option<Self> {
        default_base_url(kind).map(|default_base| Self { kind, default_base })
    }
}

fn default_base_url(kind: ProviderKind) -> Option<&'static str> {
    match kind {
        ProviderKind::OpenRouter => Some("https://openrouter.ai/api/v1"),
        ProviderKind::Groq => Some("https://api.groq.com/openai/v1"),
        ProviderKind::OpenAI => Some("https://api.openai.com/v1"),
        ProviderKind::DeepSeek => Some("https://api.deepseek.com/v1"),
        ProviderKind::Gemini => None,
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    /// OpenRouter reports some upstream failures inside a 200 body.
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    code: Option<serde_json::Value>,
}

impl ProviderAdapter for OpenAICompatibleAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn build_request(
        &self,
        descriptor: &ProviderDescriptor,
        request: &GenerateRequest,
    ) -> ProviderResult<UpstreamHttpRequest> {
        if descriptor.api_key.is_empty() {
            return Err(ProviderError::MissingField("api_key"));
        }
        let url = build_url(descriptor.base_url.as_deref(), self.default_base, "chat/completions");
        let body = ChatCompletionBody {
            model: &descriptor.model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };
        let body = serde_json::to_vec(&body)?;

        let mut headers = Vec::new();
        set_bearer(&mut headers, &descriptor.api_key);
        set_json_content(&mut headers);
        Ok(UpstreamHttpRequest {
            method: HttpMethod::Post,
            url,
            headers,
            body: Some(Bytes::from(body)),
        })
    }

    fn parse_response(&self, body: &Bytes) -> Result<Completion, ClassifiedError> {
        let resp: ChatCompletionResponse = serde_json::from_slice(body).map_err(|err| {
            ClassifiedError::new(ErrorKind::ServerError, format!("undecodable response: {err}"))
        })?;
        if let Some(error) = resp.error {
            return Err(embedded_error(error));
        }
        let Some(choice) = resp.choices.into_iter().next() else {
            return Err(ClassifiedError::new(
                ErrorKind::ServerError,
                "response had no choices",
            ));
        };
        let text = choice
            .message
            .and_then(|m| m.content)
            .unwrap_or_default();
        Ok(Completion {
            text,
            usage: resp.usage.map(|u| UsageSummary {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

fn embedded_error(error: ErrorBody) -> ClassifiedError {
    let code = match &error.code {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    };
    let kind = match code {
        Some(429) => ErrorKind::RateLimited,
        Some(401) | Some(403) => ErrorKind::AuthError,
        Some(408) => ErrorKind::Timeout,
        Some(400) | Some(404) | Some(413) | Some(422) => ErrorKind::InvalidRequest,
        _ => ErrorKind::ServerError,
    };
    ClassifiedError::new(kind, format!("upstream error: {}", error.message))
}

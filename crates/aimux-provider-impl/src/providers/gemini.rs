use aimux_provider_core::headers::{header_set, set_json_content};
use aimux_provider_core::{
    ClassifiedError, Completion, ErrorKind, GenerateRequest, HttpMethod, ProviderAdapter,
    ProviderDescriptor, ProviderError, ProviderKind, ProviderResult, Role, UpstreamFailure,
    UpstreamHttpRequest, UsageSummary, classify_failure,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::build_url;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google AI Studio `generateContent` adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeminiAdapter;

impl GeminiAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl ProviderAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn build_request(
        &self,
        descriptor: &ProviderDescriptor,
        request: &GenerateRequest,
    ) -> ProviderResult<UpstreamHttpRequest> {
        if descriptor.api_key.is_empty() {
            return Err(ProviderError::MissingField("api_key"));
        }
        let model = descriptor
            .model
            .strip_prefix("models/")
            .unwrap_or(&descriptor.model);
        let url = build_url(
            descriptor.base_url.as_deref(),
            DEFAULT_BASE_URL,
            &format!("v1beta/models/{model}:generateContent"),
        );

        // System turns are folded into one systemInstruction; the rest keep their order.
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();
        for message in &request.messages {
            let part = Part {
                text: &message.content,
            };
            match message.role {
                Role::System => system_parts.push(part),
                Role::User => contents.push(Content {
                    role: Some("user"),
                    parts: vec![part],
                }),
                Role::Assistant => contents.push(Content {
                    role: Some("model"),
                    parts: vec![part],
                }),
            }
        }
        let body = GenerateContentBody {
            contents,
            system_instruction: (!system_parts.is_empty()).then_some(Content {
                role: None,
                parts: system_parts,
            }),
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };
        let body = serde_json::to_vec(&body)?;

        let mut headers = Vec::new();
        header_set(&mut headers, "x-goog-api-key", descriptor.api_key.as_str());
        set_json_content(&mut headers);
        Ok(UpstreamHttpRequest {
            method: HttpMethod::Post,
            url,
            headers,
            body: Some(Bytes::from(body)),
        })
    }

    fn parse_response(&self, body: &Bytes) -> Result<Completion, ClassifiedError> {
        let resp: GenerateContentResponse = serde_json::from_slice(body).map_err(|err| {
            ClassifiedError::new(ErrorKind::ServerError, format!("undecodable response: {err}"))
        })?;
        if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ClassifiedError::new(
                ErrorKind::InvalidRequest,
                format!("prompt blocked: {reason}"),
            ));
        }
        let Some(candidate) = resp.candidates.into_iter().next() else {
            return Err(ClassifiedError::new(
                ErrorKind::ServerError,
                "response had no candidates",
            ));
        };
        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();
        if text.is_empty() && candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(ClassifiedError::new(
                ErrorKind::InvalidRequest,
                "candidate blocked: SAFETY",
            ));
        }
        Ok(Completion {
            text,
            usage: resp.usage_metadata.map(|u| UsageSummary {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            }),
        })
    }

    fn classify_failure(&self, failure: &UpstreamFailure) -> ClassifiedError {
        let mut classified = classify_failure(failure);
        // AI Studio answers a bad key with 400 INVALID_ARGUMENT instead of 401.
        if let UpstreamFailure::Http {
            status: 400, body, ..
        } = failure
            && String::from_utf8_lossy(body).contains("API_KEY_INVALID")
        {
            classified.kind = ErrorKind::AuthError;
        }
        classified
    }
}

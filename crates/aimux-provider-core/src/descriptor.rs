use std::fmt;

use serde::{Deserialize, Serialize};

pub type SlotId = u8;

/// Backend family selected once per slot at registry build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenRouter,
    Gemini,
    Groq,
    OpenAI,
    DeepSeek,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::OpenRouter,
        ProviderKind::Gemini,
        ProviderKind::Groq,
        ProviderKind::OpenAI,
        ProviderKind::DeepSeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Groq => "groq",
            ProviderKind::OpenAI => "openai",
            ProviderKind::DeepSeek => "deepseek",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("google") || value.eq_ignore_ascii_case("aistudio") {
            return Some(ProviderKind::Gemini);
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "meta-llama/llama-3.1-8b-instruct:free",
            ProviderKind::Gemini => "gemini-1.5-flash",
            ProviderKind::Groq => "llama-3.1-8b-instant",
            ProviderKind::OpenAI => "gpt-4o-mini",
            ProviderKind::DeepSeek => "deepseek-chat",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static configuration for one backend slot. Immutable once the registry is built.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub slot: SlotId,
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
    /// Lower runs first; defaults to the slot number.
    pub priority: i64,
    pub base_url: Option<String>,
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("slot", &self.slot)
            .field("kind", &self.kind)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("priority", &self.priority)
            .field("base_url", &self.base_url)
            .finish()
    }
}

// chatsql Engine — Text-generation provider registry
// Every supported provider speaks the OpenAI chat-completions wire format, so a
// single client covers them; the kind only picks the default endpoint and
// whether a key is sent.

pub mod openai;

pub use openai::OpenAiProvider;

use crate::atoms::types::ProviderKind;

impl ProviderKind {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::OpenAI => "https://api.openai.com/v1",
            ProviderKind::Ollama => "http://localhost:11434/v1",
            // Custom endpoints always come from config.base_url
            ProviderKind::Custom => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::OpenAI => "openai",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Custom => "custom",
        }
    }
}

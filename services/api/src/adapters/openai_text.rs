//! services/api/src/adapters/openai_text.rs
//!
//! Text generation through any OpenAI-compatible chat completion endpoint.
//! Implements the `TextGenerationService` port from the core crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use research_core::ports::{
    GenerationOptions, PortError, PortResult, SafetySettings, TextGenerationService,
};
use tracing::debug;

use super::API_KEY_MISSING;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiTextAdapter {
    client: Option<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiTextAdapter {
    /// Creates a new `OpenAiTextAdapter`. Without a client every call fails
    /// with an "API key not configured" error.
    pub fn new(client: Option<Client<OpenAIConfig>>, model: String) -> Self {
        Self { client, model }
    }

    /// Builds the client from an optional key and base URL.
    pub fn from_credentials(api_key: Option<&str>, api_base: Option<&str>, model: String) -> Self {
        let client = api_key.map(|key| {
            let mut config = OpenAIConfig::new().with_api_key(key);
            if let Some(base) = api_base {
                config = config.with_api_base(base);
            }
            Client::with_config(config)
        });
        Self::new(client, model)
    }
}

//=========================================================================================
// `TextGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextGenerationService for OpenAiTextAdapter {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        safety: &SafetySettings,
    ) -> PortResult<String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| PortError::Unexpected(API_KEY_MISSING.to_string()))?;

        // Chat completion endpoints have neither top-k sampling nor configurable filters.
        if options.top_k.is_some() || !safety.rules.is_empty() {
            debug!(model = %self.model, "Ignoring top_k and safety settings for chat completions");
        }

        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into()];

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages).n(1);
        if let Some(temperature) = options.temperature {
            args.temperature(temperature);
        }
        if let Some(top_p) = options.top_p {
            args.top_p(top_p);
        }
        if let Some(max_tokens) = options.max_output_tokens {
            args.max_completion_tokens(max_tokens);
        }
        let request = args
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Text generation response contained no text content.".to_string())
            })
    }
}

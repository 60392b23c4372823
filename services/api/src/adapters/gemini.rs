//! services/api/src/adapters/gemini.rs
//!
//! Text generation against the Gemini `generateContent` REST endpoint.
//! Implements the `TextGenerationService` port from the core crate.

use async_trait::async_trait;
use research_core::ports::{
    BlockThreshold, GenerationOptions, HarmCategory, PortError, PortResult, SafetySettings,
    TextGenerationService,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::API_KEY_MISSING;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

fn category_name(category: HarmCategory) -> &'static str {
    match category {
        HarmCategory::Harassment => "HARM_CATEGORY_HARASSMENT",
        HarmCategory::HateSpeech => "HARM_CATEGORY_HATE_SPEECH",
        HarmCategory::SexuallyExplicit => "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        HarmCategory::DangerousContent => "HARM_CATEGORY_DANGEROUS_CONTENT",
    }
}

fn threshold_name(threshold: BlockThreshold) -> &'static str {
    match threshold {
        BlockThreshold::BlockNone => "BLOCK_NONE",
        BlockThreshold::BlockOnlyHigh => "BLOCK_ONLY_HIGH",
        BlockThreshold::BlockMediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
        BlockThreshold::BlockLowAndAbove => "BLOCK_LOW_AND_ABOVE",
    }
}

fn build_request<'a>(
    prompt: &'a str,
    options: &GenerationOptions,
    safety: &SafetySettings,
) -> GenerateRequest<'a> {
    let generation_config = (*options != GenerationOptions::default()).then(|| GenerationConfig {
        temperature: options.temperature,
        top_p: options.top_p,
        top_k: options.top_k,
        max_output_tokens: options.max_output_tokens,
    });
    GenerateRequest {
        contents: vec![RequestContent {
            role: "user",
            parts: vec![RequestPart { text: prompt }],
        }],
        generation_config,
        safety_settings: safety
            .rules
            .iter()
            .map(|(category, threshold)| SafetySetting {
                category: category_name(*category),
                threshold: threshold_name(*threshold),
            })
            .collect(),
    }
}

/// Concatenates the text parts of the first candidate.
fn response_text(response: GenerateResponse) -> PortResult<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(PortError::Unexpected(format!("Prompt blocked: {}", reason)));
    }
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| PortError::Unexpected("Gemini returned no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".to_string());
        return Err(PortError::Unexpected(format!(
            "Gemini response contained no text (finish reason {})",
            reason
        )));
    }
    Ok(text)
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextGenerationService` over the Gemini REST API.
#[derive(Clone)]
pub struct GeminiTextAdapter {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_base: String,
}

impl GeminiTextAdapter {
    pub fn new(api_key: Option<String>, model: String, api_base: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            api_base: api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl TextGenerationService for GeminiTextAdapter {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        safety: &SafetySettings,
    ) -> PortResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PortError::Unexpected(API_KEY_MISSING.to_string()))?;

        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "Calling Gemini");
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&build_request(prompt, options, safety))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Gemini request failed");
            return Err(PortError::Unexpected(format!(
                "Gemini returned {}: {}",
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        response_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_carries_sampling_and_safety() {
        let request = build_request(
            "Write",
            &GenerationOptions::for_content(),
            &SafetySettings::block_medium_and_above(),
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "Write");
        assert_eq!(value["generationConfig"]["topK"], 40);
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(value["safetySettings"].as_array().map(Vec::len), Some(4));
        assert_eq!(value["safetySettings"][0]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[test]
    fn default_options_are_omitted() {
        let request = build_request("x", &GenerationOptions::default(), &SafetySettings::default());
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("generationConfig").is_none());
        assert!(value.get("safetySettings").is_none());
    }

    #[test]
    fn text_parts_are_joined() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}]}, "finishReason": "STOP"}]
        }))
        .unwrap();
        assert_eq!(response_text(response).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn blocked_prompts_are_errors() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert!(response_text(response).unwrap_err().to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let adapter = GeminiTextAdapter::new(None, "gemini-2.0-flash-lite".into(), None);
        let err = adapter
            .generate("x", &GenerationOptions::default(), &SafetySettings::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains(API_KEY_MISSING));
    }
}

// src/llm/gemini.rs

use crate::config::Config;
use crate::error::ProviderError;
use crate::llm::Generator;
use crate::transcript::{Role, Turn};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

/// The key travels in this header, never in the URL.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

// --- Request Structs ---

#[derive(Serialize, Debug)]
struct GeminiRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Debug)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug)]
struct Part {
    text: String,
}

#[derive(Serialize, Debug, Default)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "topP", skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

impl GenerationConfig {
    fn from_config(config: &Config) -> Option<Self> {
        if config.temperature.is_none() && config.top_p.is_none() && config.max_tokens.is_none() {
            return None;
        }
        Some(GenerationConfig {
            temperature: config.temperature,
            top_p: config.top_p,
            max_output_tokens: config.max_tokens,
        })
    }
}

// --- Response Structs ---

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<ContentResponse>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ContentResponse {
    parts: Option<Vec<Part>>,
}

#[derive(Deserialize, Debug)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    code: u16,
    message: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize, Debug)]
struct GeminiListModelsResponse {
    models: Option<Vec<GeminiModelInfo>>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct GeminiModelInfo {
    name: String,
    #[serde(rename = "supportedGenerationMethods")]
    supported_generation_methods: Option<Vec<String>>,
}

// --- Helper function to handle API responses ---
async fn handle_api_response<T: serde::de::DeserializeOwned + std::fmt::Debug>(
    response: reqwest::Response,
    operation_name: &str,
) -> Result<T, ProviderError> {
    let status = response.status();
    let response_bytes = response.bytes().await?;

    // Error bodies carry {"error": {...}}; classify them by status first.
    if !status.is_success() {
        let body_string = String::from_utf8_lossy(&response_bytes).into_owned();
        error!(status = ?status, response_body = ?body_string, "{} request failed", operation_name);
        let (status_text, message) = match serde_json::from_slice::<ErrorEnvelope>(&response_bytes) {
            Ok(envelope) => (envelope.error.status, envelope.error.message),
            Err(_) => (
                status.canonical_reason().unwrap_or("UNKNOWN").to_string(),
                body_string,
            ),
        };
        return Err(ProviderError::from_status(status.as_u16(), &status_text, message));
    }

    match serde_json::from_slice::<T>(&response_bytes) {
        Ok(parsed_response) => {
            debug!(?parsed_response, "Successfully parsed {} response", operation_name);
            Ok(parsed_response)
        }
        Err(parse_error) => {
            let body_string = String::from_utf8_lossy(&response_bytes);
            error!(error = ?parse_error, response_body = ?body_string, "Failed to parse {} response", operation_name);
            Err(ProviderError::Api {
                code: status.as_u16(),
                status: "INVALID_RESPONSE".to_string(),
                message: format!("Failed to parse {} response: {}", operation_name, parse_error),
            })
        }
    }
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ApiError,
}

fn api_error(err: ApiError) -> ProviderError {
    ProviderError::from_status(err.code, &err.status, err.message)
}

// --- Client ---

pub struct GeminiClient<'a> {
    client: &'a Client,
    config: &'a Config,
}

impl<'a> GeminiClient<'a> {
    pub fn new(client: &'a Client, config: &'a Config) -> Self {
        GeminiClient { client, config }
    }

    fn build_request(&self, system_prompt: &str, history: &[Turn], input: &str) -> GeminiRequest {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|turn| Content {
                role: Some(match turn.role {
                    Role::User => "user",
                    Role::Model => "model",
                }),
                parts: vec![Part { text: turn.text.clone() }],
            })
            .collect();
        contents.push(Content {
            role: Some("user"),
            parts: vec![Part { text: input.to_string() }],
        });

        GeminiRequest {
            system_instruction: (!system_prompt.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part { text: system_prompt.to_string() }],
            }),
            contents,
            generation_config: GenerationConfig::from_config(self.config),
        }
    }

    // --- list_models function ---
    #[instrument(skip(self))]
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.config.api_base_url);
        debug!("Sending list models request to Gemini API: {}", url);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, self.config.api_key.as_str())
            .send()
            .await?;
        let list_response: GeminiListModelsResponse = handle_api_response(response, "Gemini list models").await?;

        if let Some(api_err) = list_response.error {
            error!(?api_err, "Gemini API returned an error listing models");
            return Err(api_error(api_err));
        }

        let chat_model_ids: Vec<String> = list_response
            .models
            .unwrap_or_default()
            .into_iter()
            .filter(|model| {
                model
                    .supported_generation_methods
                    .as_deref()
                    .unwrap_or(&[])
                    .iter()
                    .any(|m| m == "generateContent")
            })
            .filter_map(|model| model.name.strip_prefix("models/").map(String::from))
            .collect();
        if chat_model_ids.is_empty() {
            warn!("Gemini list models parsed successfully, but no models supporting 'generateContent' were found.");
        }
        Ok(chat_model_ids)
    }

    // --- check_connection function ---
    #[instrument(skip(self))]
    pub async fn check_connection(&self) -> Result<(), ProviderError> {
        debug!("Checking Gemini connection status...");
        self.list_models().await?;
        debug!("Gemini connection check successful.");
        Ok(())
    }
}

#[async_trait]
impl Generator for GeminiClient<'_> {
    #[instrument(skip_all)]
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[Turn],
        input: &str,
    ) -> Result<String, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_base_url, self.config.model
        );
        let request_payload = self.build_request(system_prompt, history, input);

        debug!(?url, turns = history.len(), ?request_payload, "Sending generate request to Gemini API");
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, self.config.api_key.as_str())
            .json(&request_payload)
            .send()
            .await?;

        let gemini_response: GeminiResponse = handle_api_response(response, "Gemini generate").await?;

        if let Some(api_err) = gemini_response.error {
            error!(?api_err, "Gemini API returned an error in the response body");
            return Err(api_error(api_err));
        }

        if let Some(reason) = gemini_response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            error!("Gemini prompt blocked. Reason: {}", reason);
            return Err(ProviderError::Blocked(format!("prompt blocked due to '{}'", reason)));
        }

        let first_candidate = gemini_response
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .ok_or_else(|| ProviderError::EmptyResponse("no candidates in response".to_string()))?;

        let finish_reason = first_candidate.finish_reason.as_deref().unwrap_or("UNKNOWN");
        match finish_reason {
            "STOP" | "MAX_TOKENS" => {}
            "UNKNOWN" => warn!("Gemini response candidate is missing a 'finishReason'. Proceeding cautiously."),
            other => {
                warn!("Gemini generation finished due to reason: {}", other);
                return Err(ProviderError::Blocked(format!("generation stopped early: '{}'", other)));
            }
        }

        let text: String = first_candidate
            .content
            .as_ref()
            .and_then(|c| c.parts.as_ref())
            .map(|parts| parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            error!(?first_candidate, "Candidate carried no text.");
            return Err(ProviderError::EmptyResponse("candidate carried no text".to_string()));
        }
        Ok(text)
    }
}

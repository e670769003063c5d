use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GenerationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// `assistant` and `model` are the reply tags; anything else was said by the user.
    pub fn from_speaker(speaker: &str) -> Self {
        match speaker {
            "assistant" | "model" => Role::Assistant,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationMessage {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request timed out")]
    Timeout,

    #[error("generation service returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed generation response: {0}")]
    Malformed(String),

    #[error("generation transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(
        &self,
        system_instruction: &str,
        messages: &[GenerationMessage],
    ) -> std::result::Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
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

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
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

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.api_base, self.model)
    }
}

fn build_request<'a>(
    system_instruction: &'a str,
    messages: &'a [GenerationMessage],
) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part { text: system_instruction }],
        },
        contents: messages
            .iter()
            .map(|m| Content {
                role: Some(match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                }),
                parts: vec![Part { text: &m.text }],
            })
            .collect(),
    }
}

fn extract_text(response: GenerateContentResponse) -> std::result::Result<String, GenerationError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::Malformed("no candidates returned".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationError::Malformed("candidate has no text".to_string()));
    }

    Ok(text)
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(
        &self,
        system_instruction: &str,
        messages: &[GenerationMessage],
    ) -> std::result::Result<String, GenerationError> {
        let request = build_request(system_instruction, messages);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Transport(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        extract_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_mapping() {
        assert_eq!(Role::from_speaker("assistant"), Role::Assistant);
        assert_eq!(Role::from_speaker("model"), Role::Assistant);
        assert_eq!(Role::from_speaker("user"), Role::User);
        assert_eq!(Role::from_speaker("ai"), Role::User);
    }

    #[test]
    fn test_request_body_shape() {
        let messages = vec![
            GenerationMessage { role: Role::User, text: "habari".to_string() },
            GenerationMessage { role: Role::Assistant, text: "nzuri".to_string() },
        ];

        let body = serde_json::to_value(build_request("be kind", &messages)).unwrap();
        assert_eq!(
            body,
            json!({
                "systemInstruction": { "parts": [{ "text": "be kind" }] },
                "contents": [
                    { "role": "user", "parts": [{ "text": "habari" }] },
                    { "role": "model", "parts": [{ "text": "nzuri" }] }
                ]
            })
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hello " }, { "text": "there" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(extract_text(response).unwrap(), "Hello there");
    }

    #[test]
    fn test_extract_text_rejects_empty_responses() {
        let no_candidates: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(extract_text(no_candidates), Err(GenerationError::Malformed(_))));

        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        assert!(matches!(extract_text(blocked), Err(GenerationError::Malformed(_))));
    }
}

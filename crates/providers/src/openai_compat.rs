//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI and any endpoint exposing the same REST surface.
//!
//! Supports:
//! - Chat completions (the prompt-refinement step)
//! - Image generations (basic and extended request shapes)
//! - Model listing as a credential health check

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use weathercanvas_core::error::{AcquisitionError, ProviderError};
use weathercanvas_core::image::{ImageGenerator, ImageRequest};
use weathercanvas_core::message::{Message, Role};
use weathercanvas_core::provider::*;

/// An OpenAI-compatible text and image provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: crate::http_client()?,
        })
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the chat-completion request body.
    fn chat_body(request: &ProviderRequest) -> serde_json::Value {
        let messages: Vec<ApiMessage> = request
            .messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: Some(m.content.clone()),
            })
            .collect();

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(top_p) = request.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }
        if let Some(penalty) = request.frequency_penalty {
            body["frequency_penalty"] = serde_json::json!(penalty);
        }
        if let Some(penalty) = request.presence_penalty {
            body["presence_penalty"] = serde_json::json!(penalty);
        }

        body
    }

    /// Take the first choice out of a chat-completion response.
    fn first_choice(api_response: ApiResponse) -> Result<ProviderResponse, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyChoices)?;

        let content = choice.message.content.ok_or(ProviderError::EmptyContent)?;

        Ok(ProviderResponse {
            message: Message {
                role: Role::Assistant,
                content,
            },
            usage: api_response.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: api_response.model,
        })
    }

    /// Extract the image URL from an image-generation response body.
    fn image_url(body: &str) -> Result<String, AcquisitionError> {
        let parsed: ImageApiResponse = serde_json::from_str(body)
            .map_err(|e| AcquisitionError::MalformedResponse(format!("invalid JSON: {e}")))?;

        let first = parsed
            .data
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| {
                AcquisitionError::MalformedResponse("'data' is missing or empty".into())
            })?;

        first
            .url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AcquisitionError::MalformedResponse("no 'url' in response data".into()))
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::chat_body(&request);

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Self::first_choice(api_response)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl ImageGenerator for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &ImageRequest) -> Result<String, AcquisitionError> {
        let url = format!("{}/images/generations", self.base_url);

        debug!(
            provider = %self.name,
            model = %request.model,
            size = %request.size,
            "Sending image generation request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| AcquisitionError::Generation(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AcquisitionError::Generation(format!("failed to read body: {e}")))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %body, "Image generation rejected");
            return Err(AcquisitionError::Generation(format!(
                "status {}: {body}",
                status.as_u16()
            )));
        }

        Self::image_url(&body)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    model: String,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ImageApiResponse {
    #[serde(default)]
    data: Option<Vec<ImageApiDatum>>,
}

#[derive(Debug, Deserialize)]
struct ImageApiDatum {
    #[serde(default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refinement_request() -> ProviderRequest {
        ProviderRequest {
            model: "gpt-3.5-turbo".into(),
            messages: vec![
                Message::system("Create a succinct DALL-E prompt"),
                Message::user("In Oslo, it is noon in Winter."),
            ],
            temperature: 1.0,
            max_tokens: Some(256),
            top_p: Some(1.0),
            frequency_penalty: Some(0.0),
            presence_penalty: Some(0.0),
        }
    }

    #[test]
    fn openai_constructor() {
        let provider = OpenAiCompatProvider::openai("sk-test").unwrap();
        assert_eq!(TextGenerator::name(&provider), "openai");
        assert!(provider.base_url().contains("api.openai.com"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider =
            OpenAiCompatProvider::new("local", "http://localhost:1234/v1/", "k").unwrap();
        assert_eq!(provider.base_url(), "http://localhost:1234/v1");
    }

    #[test]
    fn chat_body_carries_sampling_parameters() {
        let body = OpenAiCompatProvider::chat_body(&refinement_request());
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["top_p"], 1.0);
        assert_eq!(body["frequency_penalty"], 0.0);
        assert_eq!(body["presence_penalty"], 0.0);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "In Oslo, it is noon in Winter.");
    }

    #[test]
    fn empty_choice_list_is_an_error() {
        let response: ApiResponse =
            serde_json::from_str(r#"{"choices": [], "model": "gpt-3.5-turbo"}"#).unwrap();
        let err = OpenAiCompatProvider::first_choice(response).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyChoices));
    }

    #[test]
    fn first_choice_extracts_content_and_usage() {
        let response: ApiResponse = serde_json::from_str(
            r#"{
                "model": "gpt-3.5-turbo-0125",
                "choices": [
                    {"message": {"role": "assistant", "content": "  Snow-dusted rooftops  "}},
                    {"message": {"role": "assistant", "content": "ignored"}}
                ],
                "usage": {"prompt_tokens": 40, "completion_tokens": 12, "total_tokens": 52}
            }"#,
        )
        .unwrap();
        let parsed = OpenAiCompatProvider::first_choice(response).unwrap();
        assert_eq!(parsed.message.content, "  Snow-dusted rooftops  ");
        assert_eq!(parsed.model, "gpt-3.5-turbo-0125");
        assert_eq!(parsed.usage.unwrap().total_tokens, 52);
    }

    #[test]
    fn image_url_extracted_from_first_datum() {
        let url = OpenAiCompatProvider::image_url(
            r#"{"created": 1, "data": [{"url": "https://cdn.example/img.png"}]}"#,
        )
        .unwrap();
        assert_eq!(url, "https://cdn.example/img.png");
    }

    #[test]
    fn empty_data_array_is_malformed() {
        let err = OpenAiCompatProvider::image_url(r#"{"data": []}"#).unwrap_err();
        assert!(matches!(err, AcquisitionError::MalformedResponse(_)));
    }

    #[test]
    fn missing_data_or_url_is_malformed() {
        assert!(matches!(
            OpenAiCompatProvider::image_url(r#"{"created": 1}"#),
            Err(AcquisitionError::MalformedResponse(_))
        ));
        assert!(matches!(
            OpenAiCompatProvider::image_url(r#"{"data": [{"b64_json": "AAAA"}]}"#),
            Err(AcquisitionError::MalformedResponse(_))
        ));
        assert!(matches!(
            OpenAiCompatProvider::image_url("not json"),
            Err(AcquisitionError::MalformedResponse(_))
        ));
    }
}

use crate::{
    config::SamplingParams, core::generator::Generator, err, error::RagError, map_err,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Client for the OpenAI chat completions API.
///
/// The assembled prompt is sent as a single user message, so the response
/// contains only the continuation.
pub struct OpenAiGenerator {
    endpoint: String,
    key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        tracing::info!("Initializing OpenAI chat with '{model}' at {endpoint}");
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Generator for OpenAiGenerator {
    fn id(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, RagError> {
        let request = CompletionRequest::new(&self.model, prompt, params);

        let response = map_err!(
            self.client
                .post(format!("{}/v1/chat/completions", self.endpoint))
                .bearer_auth(&self.key)
                .json(&request)
                .send()
                .await
        );

        let status = response.status();

        if !status.is_success() {
            let body = map_err!(response.text().await);
            return err!(Generation, "OpenAI responded with {}: {}", status, body);
        }

        let response: CompletionResponse = map_err!(response.json().await);

        if let Some(usage) = response.usage {
            debug!(
                "Generated with '{}', used tokens {}-{} (prompt-total)",
                self.model, usage.prompt_tokens, usage.total_tokens
            );
        }

        let Some(choice) = response.choices.into_iter().next() else {
            return err!(Generation, "OpenAI returned no choices");
        };

        Ok(choice.message.content.unwrap_or_default())
    }
}

impl std::fmt::Debug for OpenAiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiGenerator")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 1],
    max_tokens: usize,
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> CompletionRequest<'a> {
    /// `top_k` and `repetition_penalty` have no counterpart in the API and are dropped.
    fn new(model: &'a str, prompt: &'a str, params: &SamplingParams) -> Self {
        Self {
            model,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
            max_tokens: params.max_new_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_maps_supported_parameters() {
        let params = SamplingParams::default();
        let request =
            serde_json::to_value(CompletionRequest::new("gpt-4o-mini", "prompt", &params)).unwrap();

        assert_eq!(
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{ "role": "user", "content": "prompt" }],
                "max_tokens": 100,
                "temperature": 0.8,
                "top_p": 0.95
            }),
            request
        );
    }

    #[test]
    fn response_without_content_decodes() {
        let response: CompletionResponse = serde_json::from_str(
            r#"{ "choices": [{ "message": { "role": "assistant", "content": null } }] }"#,
        )
        .unwrap();

        assert!(response.choices[0].message.content.is_none());
        assert!(response.usage.is_none());
    }
}

use crate::{
    config::SamplingParams, core::generator::Generator, err, error::RagError, map_err,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Client for a text-generation-inference compatible server.
///
/// The server is asked to return the full text, prompt included, the same
/// way an on-device decoder would. The reply is extracted by the caller.
pub struct TgiGenerator {
    url: String,
    client: reqwest::Client,
}

impl TgiGenerator {
    pub fn new(url: &str) -> Self {
        tracing::info!("Initializing text generation client at {url}");
        Self {
            url: url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Generator for TgiGenerator {
    fn id(&self) -> &'static str {
        "tgi"
    }

    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, RagError> {
        let request = GenerateRequest::new(prompt, params);

        let response = map_err!(
            self.client
                .post(format!("{}/generate", self.url))
                .json(&request)
                .send()
                .await
        );

        let status = response.status();

        if !status.is_success() {
            let body = map_err!(response.text().await);
            return err!(Generation, "server responded with {}: {}", status, body);
        }

        let response: GenerateResponse = map_err!(response.json().await);

        debug!(
            "Generated {} chars from {} char prompt",
            response.generated_text.len(),
            prompt.len()
        );

        Ok(response.generated_text)
    }
}

impl std::fmt::Debug for TgiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TgiGenerator")
            .field("url", &self.url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerateParameters,
}

#[derive(Debug, Serialize)]
struct GenerateParameters {
    max_new_tokens: usize,
    do_sample: bool,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    repetition_penalty: f64,
    return_full_text: bool,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str, params: &SamplingParams) -> Self {
        Self {
            inputs: prompt,
            parameters: GenerateParameters {
                max_new_tokens: params.max_new_tokens,
                do_sample: params.do_sample,
                temperature: params.temperature,
                // The server rejects 0 and 1.0, both mean "disabled".
                top_k: (params.top_k > 0).then_some(params.top_k),
                top_p: (params.top_p < 1.).then_some(params.top_p),
                repetition_penalty: params.repetition_penalty,
                return_full_text: true,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    generated_text: String,
}

//! Google Gemini API provider.

use super::provider::{
    NarrativeProvider, NarrativeRequest, NarrativeResponse, STORYTELLER_INSTRUCTION,
};
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Provider backed by the Gemini `generateContent` REST API.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "systemInstruction")]
    system_instruction: Content<'a>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u32>,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[async_trait]
impl NarrativeProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(
        &self,
        request: &NarrativeRequest,
    ) -> Result<NarrativeResponse, PipelineError> {
        let start = Instant::now();

        // Checked before anything touches the network.
        let api_key =
            self.api_key
                .as_ref()
                .ok_or_else(|| PipelineError::CredentialMissing {
                    message: "No Gemini API key configured".to_string(),
                })?;

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            system_instruction: Content {
                parts: vec![Part {
                    text: STORYTELLER_INSTRUCTION,
                }],
            },
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_p: request.top_p,
                max_output_tokens: request.max_output_tokens,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        tracing::debug!(model = %self.model, "Sending narrative request");

        // The key travels as a query parameter; never log the assembled URL.
        let resp = self
            .client
            .post(&url)
            .query(&[("key", api_key.as_str())])
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status_error(status, &body));
        }

        let parsed: GenerateContentResponse =
            resp.json()
                .await
                .map_err(|e| PipelineError::RemoteServiceError {
                    message: format!("Failed to parse Gemini response: {e}"),
                    status_code: None,
                })?;

        let text = clean_reply(&extract_text(&parsed)?);
        if text.is_empty() {
            return Err(PipelineError::RemoteServiceError {
                message: "Gemini returned an empty response".to_string(),
                status_code: None,
            });
        }

        let latency_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(latency_ms, "Narrative response received");

        Ok(NarrativeResponse {
            text,
            model: parsed.model_version.unwrap_or_else(|| self.model.clone()),
            tokens_used: parsed.usage_metadata.and_then(|u| u.total_token_count),
            latency_ms,
        })
    }
}

fn transport_error(e: &reqwest::Error, timeout: Duration) -> PipelineError {
    if e.is_timeout() {
        PipelineError::RemoteServiceError {
            message: format!("Gemini request timed out after {}ms", timeout.as_millis()),
            status_code: None,
        }
    } else {
        PipelineError::RemoteServiceError {
            message: format!("Failed to reach Gemini: {e}"),
            status_code: None,
        }
    }
}

fn map_status_error(status: reqwest::StatusCode, body: &str) -> PipelineError {
    let detail = error_detail(body);
    match status.as_u16() {
        401 | 403 => PipelineError::CredentialMissing {
            message: format!("Gemini rejected the API key: {detail}"),
        },
        // Gemini reports an invalid key as a 400, not a 401
        400 if detail.to_ascii_lowercase().contains("api key") => {
            PipelineError::CredentialMissing {
                message: format!("Gemini rejected the API key: {detail}"),
            }
        }
        429 => PipelineError::RateLimited {
            message: format!("Gemini rate limit exceeded: {detail}"),
        },
        code => PipelineError::RemoteServiceError {
            message: format!("Gemini API error: {detail}"),
            status_code: Some(code),
        },
    }
}

/// Pull the human-readable message out of a Gemini error body.
fn error_detail(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorInfo,
    }
    #[derive(Deserialize)]
    struct ErrorInfo {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.chars().take(200).collect(),
    }
}

fn extract_text(response: &GenerateContentResponse) -> Result<String, PipelineError> {
    if response.candidates.is_empty() {
        let reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
            .unwrap_or("no candidates returned");
        return Err(PipelineError::RemoteServiceError {
            message: format!("Gemini returned no content: {reason}"),
            status_code: None,
        });
    }

    let text = response.candidates[0]
        .content
        .as_ref()
        .map(|c| {
            c.parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    Ok(text)
}

/// Strip whitespace and stray quotation marks from the model's reply.
fn clean_reply(raw: &str) -> String {
    raw.trim().replace('"', "").trim().to_string()
}

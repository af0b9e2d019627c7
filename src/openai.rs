// OpenAI-backed generation, analysis and embedding services

use crate::config::DuetConfig;
use crate::error::{DuetError, Result};
use crate::logging;
use crate::prompts::{
    build_analysis_prompt, build_generation_prompt, ANALYSIS_SYSTEM_PROMPT,
    GENERATION_SYSTEM_PROMPT,
};
use crate::services::{
    parse_structured, AnalysisRequest, AnalysisResponse, AnalysisService, EmbeddingService,
    GenerationRequest, GenerationResponse, GenerationService, RawAnalysis, RawGeneration,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Serialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: String) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
    config: DuetConfig,
}

impl OpenAIClient {
    pub fn new(config: &DuetConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, service: &str, path: &str, body: &B) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DuetError::provider(
                service,
                format!("OpenAI API error ({}): {}", status, error_text),
            ));
        }
        Ok(response)
    }

    /// JSON-mode chat completion. Returns the raw message content.
    pub async fn chat_completion(
        &self,
        service: &str,
        model: &str,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let request = ChatCompletionRequest {
            model,
            messages,
            temperature,
            max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let completion: ChatCompletionResponse =
            self.post(service, "/chat/completions", &request).await?.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| DuetError::provider(service, "No content in response"))
    }

    pub async fn create_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: text,
        };
        let response: EmbeddingResponse =
            self.post("embedding", "/embeddings", &request).await?.json().await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| DuetError::provider("embedding", "No embedding in response"))
    }
}

#[async_trait]
impl GenerationService for OpenAIClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let messages = vec![
            ChatMessage::system(GENERATION_SYSTEM_PROMPT),
            ChatMessage::user(build_generation_prompt(request)),
        ];
        let content = self
            .chat_completion(
                "generation",
                &self.config.generation_model,
                messages,
                self.config.generation_temperature,
                self.config.generation_max_tokens,
            )
            .await?;

        let raw: RawGeneration = parse_structured("generation", &content)?;
        Ok(raw.normalize())
    }
}

#[async_trait]
impl AnalysisService for OpenAIClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        let messages = vec![
            ChatMessage::system(ANALYSIS_SYSTEM_PROMPT),
            ChatMessage::user(build_analysis_prompt(request)),
        ];
        let content = self
            .chat_completion(
                "analysis",
                &self.config.analysis_model,
                messages,
                self.config.analysis_temperature,
                self.config.analysis_max_tokens,
            )
            .await?;

        let raw: RawAnalysis = parse_structured("analysis", &content)?;
        let response = raw.sanitize(&request.dialogue, &request.previous_trajectory);
        logging::log_analysis(None, &format!(
            "{} signals, sentiment {}",
            response.trait_signals.len(),
            response.sentiment.as_str()
        ));
        Ok(response)
    }
}

#[async_trait]
impl EmbeddingService for OpenAIClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.create_embedding(text).await
    }
}

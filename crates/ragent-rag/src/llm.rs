//! LLM client implementations and answer assembly.
//!
//! Provides Gemini and Ollama generation clients behind the `LlmClient`
//! trait, a prompt builder for grounded question answering, and the
//! `AnswerAssembler` that turns retrieved context into a final answer.

use async_trait::async_trait;
use ragent_core::{LlmClient, LlmConfig, LlmProvider, RagentError, Result, RetrievedContext};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Gemini Client
// ============================================================================

/// Gemini generation API client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct GeminiGenerateRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiGenerateResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: model.into(),
            max_tokens,
            temperature,
        }
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .gemini_api_key
            .as_ref()
            .ok_or_else(|| RagentError::ConfigError("Gemini API key required".to_string()))?;

        let mut client = Self::new(
            api_key.clone(),
            config.model.clone(),
            config.max_tokens,
            config.temperature,
        );
        if let Some(url) = &config.gemini_base_url {
            client.base_url = format!("{url}/models");
        }
        Ok(client)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GeminiGenerateRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.max_tokens,
                temperature: self.temperature,
            },
        };

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagentError::ServiceUnavailable(format!("generation request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                RagentError::RateLimited(error_text)
            } else if status.is_server_error() {
                RagentError::ServiceUnavailable(error_text)
            } else {
                RagentError::GenerationFailed(format!("{status}: {error_text}"))
            });
        }

        let result: GeminiGenerateResponse = response.json().await.map_err(|e| {
            RagentError::GenerationFailed(format!("failed to parse generation response: {e}"))
        })?;

        result
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| RagentError::GenerationFailed("no candidates returned".to_string()))
    }
}

// ============================================================================
// Ollama Client
// ============================================================================

/// Ollama generation API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.ollama_url.clone(), config.model.clone())
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| RagentError::ServiceUnavailable(format!("generation request: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagentError::GenerationFailed(format!(
                "Ollama error: {error_text}"
            )));
        }

        let result: OllamaResponse = response.json().await.map_err(|e| {
            RagentError::GenerationFailed(format!("failed to parse Ollama response: {e}"))
        })?;

        Ok(result.response)
    }
}

/// Create an LLM client from config
pub fn create_llm_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider {
        LlmProvider::Gemini => Ok(Box::new(GeminiClient::from_config(config)?)),
        LlmProvider::Ollama => Ok(Box::new(OllamaClient::from_config(config))),
    }
}

// ============================================================================
// Prompt Builder
// ============================================================================

/// Builder for grounded question-answering prompts
pub struct PromptBuilder {
    system_instruction: String,
    context_sections: Vec<String>,
    question: String,
    instructions: Vec<String>,
}

impl PromptBuilder {
    /// Create a new prompt builder
    pub fn new() -> Self {
        Self {
            system_instruction: String::new(),
            context_sections: Vec::new(),
            question: String::new(),
            instructions: Vec::new(),
        }
    }

    /// Set system instruction
    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Add a context section
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context_sections.push(context.into());
        self
    }

    /// Set the question
    pub fn question(mut self, q: impl Into<String>) -> Self {
        self.question = q.into();
        self
    }

    /// Add an instruction
    pub fn add_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    /// Build the final prompt
    pub fn build(self) -> String {
        let mut prompt = String::new();

        if !self.system_instruction.is_empty() {
            prompt.push_str("<s>\n");
            prompt.push_str(&self.system_instruction);
            prompt.push_str("\n</s>\n\n");
        }

        if !self.context_sections.is_empty() {
            prompt.push_str("<context>\n");
            for section in &self.context_sections {
                prompt.push_str(section);
                prompt.push_str("\n\n");
            }
            prompt.push_str("</context>\n\n");
        }

        if !self.question.is_empty() {
            prompt.push_str("<question>\n");
            prompt.push_str(&self.question);
            prompt.push_str("\n</question>\n\n");
        }

        if !self.instructions.is_empty() {
            prompt.push_str("<instructions>\n");
            for (i, inst) in self.instructions.iter().enumerate() {
                prompt.push_str(&format!("{}. {}\n", i + 1, inst));
            }
            prompt.push_str("</instructions>\n");
        }

        prompt
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Answer Assembler
// ============================================================================

/// A generated answer with the document sources that informed it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Generated answer text
    pub answer: String,

    /// Source filenames in first-retrieved order, deduplicated
    pub sources: Vec<String>,
}

/// Turns retrieved context and a question into a grounded answer.
///
/// Generation errors from the LLM client pass through unchanged so the
/// caller sees the provider's failure, not a rewrapped one.
pub struct AnswerAssembler {
    llm: Arc<dyn LlmClient>,
    max_context_length: usize,
}

impl AnswerAssembler {
    /// Create an assembler over an LLM client
    pub fn new(llm: Arc<dyn LlmClient>, max_context_length: usize) -> Self {
        Self {
            llm,
            max_context_length,
        }
    }

    /// Generate an answer for `question` grounded in `context`
    pub async fn answer(&self, question: &str, context: &RetrievedContext) -> Result<Answer> {
        let prompt = self.build_prompt(question, context);

        tracing::debug!(prompt_chars = prompt.len(), "calling LLM");
        let answer = self.llm.generate(&prompt).await?;
        tracing::debug!(answer_chars = answer.len(), "LLM response received");

        Ok(Answer {
            answer,
            sources: context.sources(),
        })
    }

    fn build_prompt(&self, question: &str, context: &RetrievedContext) -> String {
        let mut builder = PromptBuilder::new()
            .system(
                "You are a knowledgeable assistant. Answer the question using only \
                 the provided context. If the context does not contain the answer, \
                 say that you could not find the information.",
            )
            .question(question)
            .add_instruction("Read the context carefully")
            .add_instruction("Use only information relevant to the question")
            .add_instruction("Do not mention information absent from the context");

        // Cap counts chars, matching the chunker's units
        let mut total_length = 0;
        for (i, result) in context.results.iter().enumerate() {
            let chunk_chars = result.chunk.text.chars().count();
            if total_length + chunk_chars > self.max_context_length {
                break;
            }
            total_length += chunk_chars;

            let source = result
                .source
                .get("filename")
                .map(|s| s.as_str())
                .unwrap_or("unknown");
            builder = builder.add_context(format!(
                "[{}] source: {}\n{}",
                i + 1,
                source,
                result.chunk.text
            ));
        }

        builder.build()
    }
}

// ============================================================================
// Tests
// ============================================================================

use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{LedgerError, Result};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-pro";

/// Hard cap on a single assistant exchange; the boundary must never hang.
pub const DEFAULT_ASSISTANT_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "Você é um assistente financeiro especializado em CFOs e análise \
empresarial. Você tem acesso aos dados financeiros da empresa e deve fornecer insights \
precisos e acionáveis.

INSTRUÇÕES:
- Seja preciso e use os dados reais fornecidos
- Forneça insights práticos para tomada de decisão
- Use formato português brasileiro
- Se não tiver dados suficientes, seja transparente sobre as limitações
- Priorize análises que ajudem na gestão financeira
- Use formatação em markdown quando apropriado";

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Timeout-bounded client for the chat collaborator. Every failure surfaces
/// through one of two error paths: transport (including timeout) or a
/// non-success API status.
pub struct AssistantClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AssistantClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, DEFAULT_ASSISTANT_TIMEOUT)
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Overrides the endpoint, for tests and self-hosted gateways.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sends the financial context and the user's question, returning the
    /// reply as opaque display text.
    pub async fn ask(&self, financial_context: &str, question: &str) -> Result<String> {
        let prompt = format!(
            "{}\n\nDADOS DISPONÍVEIS:\n{}\n\nUSUÁRIO: {}",
            SYSTEM_PROMPT, financial_context, question
        );

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let payload = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 2048,
            },
        };

        debug!("assistant: sending question ({} context bytes)", financial_context.len());
        let response = self.client.post(&url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::AssistantApi {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        let reply = body
            .candidates
            .and_then(|mut c| c.drain(..).next())
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| LedgerError::AssistantApi {
                status: status.as_u16(),
                body: "response carried no text candidates".to_string(),
            })?;

        info!("assistant: received {} bytes", reply.len());
        Ok(reply)
    }
}

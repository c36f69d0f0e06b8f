use crate::config::RewriteConfig;
use crate::traits::{RewriteRequest, RewriteResponse, RewriteService};
use crate::types::{PipelineError, Result};
use crate::utils::text;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Chat-completions adapter for Groq (or any OpenAI-compatible endpoint).
pub struct GroqAdapter {
    client: Client,
    config: RewriteConfig,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl GroqAdapter {
    pub fn new(config: RewriteConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PipelineError::Config("GROQ_API_KEY is not set".to_string()))?;

        // Backstop only; the transformer enforces the real per-call timeout.
        let client = Client::builder().timeout(config.timeout * 2).build()?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }
}

/// Prompt asking for a forum-ready Dutch rewrite that ends with the source line.
pub fn build_prompt(request: &RewriteRequest) -> String {
    let categories = if request.categories.is_empty() {
        String::new()
    } else {
        format!("\nCATEGORIEËN: {}\n", request.categories.join(", "))
    };

    format!(
        r#"Je schrijft voor een Nederlands forum over politie en veiligheid. Herschrijf het onderstaande politiebericht als openingspost van een discussie.

REGELS:
- Neem alle feiten en details ongewijzigd over, verzin niets
- Een pakkende maar zakelijke titel
- Helder Nederlands, in alinea's gescheiden door een lege regel
- Begin met een korte inleiding die uitnodigt tot discussie
- Sluit af met een vraag aan de lezers
- De laatste regel is altijd letterlijk: Bron: {link}
- Maximaal 300 woorden

TITEL:
{title}
{categories}
BERICHT:
{body}

Antwoord uitsluitend met JSON in dit formaat:
{{"title": "herschreven titel", "content": "herschreven tekst met de bronregel onderaan"}}"#,
        link = request.source_link,
        title = request.title,
        categories = categories,
        body = request.body,
    )
}

/// Parses the model's message into the two required fields.
///
/// Tolerates a surrounding Markdown code fence. Missing fields are a failure; blank ones
/// are left for the transformer to reject.
pub fn parse_payload(raw: &str) -> Result<RewriteResponse> {
    let trimmed = raw.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    let response: RewriteResponse = serde_json::from_str(json.trim()).map_err(|e| {
        PipelineError::Rewrite(format!(
            "malformed payload ({}): {}",
            e,
            text::excerpt(trimmed, 120)
        ))
    })?;

    Ok(RewriteResponse {
        title: response.title.trim().to_string(),
        body: response.body.trim().to_string(),
    })
}

#[async_trait]
impl RewriteService for GroqAdapter {
    fn adapter_name(&self) -> String {
        format!("Groq ({})", self.config.model)
    }

    async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteResponse> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(request),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PipelineError::Rewrite(format!(
                "HTTP {}: {}",
                status,
                text::excerpt(&detail, 200)
            )));
        }

        let completion: ChatResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PipelineError::Rewrite("no content in completion".to_string()))?;

        debug!("Received {} bytes from {}", content.len(), self.adapter_name());
        parse_payload(&content)
    }
}

/// Offline adapter that reshapes the item deterministically.
pub struct MockLlmAdapter {
    name: String,
    response_delay_ms: u64,
}

impl MockLlmAdapter {
    pub fn new(name: String) -> Self {
        Self {
            name,
            response_delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    async fn simulate_processing(&self) {
        if self.response_delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.response_delay_ms)).await;
        }
    }
}

#[async_trait]
impl RewriteService for MockLlmAdapter {
    fn adapter_name(&self) -> String {
        format!("Mock LLM Adapter ({})", self.name)
    }

    async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteResponse> {
        self.simulate_processing().await;

        let summary = text::excerpt(&request.body, 600);
        let body = format!(
            "Nieuw politiebericht: {}\n\n{}\n\nWat vinden jullie hiervan?\n\nBron: {}",
            request.title, summary, request.source_link
        );

        Ok(RewriteResponse {
            title: request.title.clone(),
            body,
        })
    }
}

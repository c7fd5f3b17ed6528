//! # Semantic Engine
//!
//! Asks an OpenAI-compatible chat-completions endpoint whether a shopping-list
//! item and a price tag describe the same product. The engine answers with a
//! JSON object `{ "is_match", "confidence", "reasoning" }`; any transport error,
//! non-success status or unparseable answer is reported as a [`SemanticError`]
//! and the caller falls back to the fuzzy matcher.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SemanticConfig;
use crate::fuzzy_match::MatchVerdict;

/// Reasoning used when the engine omits one
pub const DEFAULT_REASONING: &str = "Nije moguće utvrditi.";

const TEXT_TEMPERATURE: f32 = 0.1;
const TEXT_MAX_TOKENS: u32 = 200;
const IMAGE_TEMPERATURE: f32 = 0.2;
const IMAGE_MAX_TOKENS: u32 = 250;

const TEXT_SYSTEM_PROMPT: &str = r#"Ti si asistent za provjeru kupovine na bosanskom/hrvatskom jeziku.

Dobijaš artikal sa liste za kupovinu i tekst pročitan (OCR) sa cjenovnika ili etikete. Utvrdi da li tekst SEMANTIČKI opisuje traženi artikal.

PRAVILA:
1. Traži semantičko, a ne doslovno podudaranje riječi.
2. "mlijeko" odgovara tekstu "Dukat svježe mlijeko 1L"; "kruh" odgovara tekstu "Bijeli kruh 500g".
3. Dozvoli uobičajene oblike i skraćenice ("jaja" = "jaje", "jabuke" = "jabuka").
4. Ako je proizvod iz potpuno druge kategorije ("kruh" i "Čokoladna torta"), to NIJE podudaranje.
5. OCR tekst može sadržavati greške u pojedinim slovima.

Odgovori ISKLJUČIVO JSON objektom:
{"is_match": true/false, "confidence": 0.0-1.0, "reasoning": "kratko objašnjenje na bosanskom/hrvatskom"}"#;

const IMAGE_SYSTEM_PROMPT: &str = r#"Ti si asistent za provjeru kupovine na bosanskom/hrvatskom jeziku.

Dobijaš artikal sa liste za kupovinu i SLIKU proizvoda. Utvrdi da li proizvod na slici SEMANTIČKI odgovara artiklu.

PRAVILA:
1. Podudaranje po kategoriji je dozvoljeno: "čokoladica" odgovara slici Snickersa ili Marsa.
2. Brend i varijanta nisu obavezni ako je kategorija jasna.
3. Ako je slika nejasna, budi umjereno oprezan.
4. Odbij samo kada je očigledno riječ o drugoj vrsti proizvoda.

Odgovori ISKLJUČIVO JSON objektom:
{"is_match": true/false, "confidence": 0.0-1.0, "reasoning": "kratko objašnjenje na bosanskom/hrvatskom"}"#;

/// Errors from the semantic engine; all of them trigger the fallback matcher.
#[derive(Debug, Clone, PartialEq)]
pub enum SemanticError {
    /// Request never produced a response
    Transport(String),
    /// Endpoint answered with a non-success status
    Status { status: u16, body: String },
    /// Response did not contain a usable JSON judgment
    MalformedResponse(String),
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticError::Transport(msg) => write!(f, "[SEMANTIC_TRANSPORT] Request failed: {}", msg),
            SemanticError::Status { status, body } => {
                write!(f, "[SEMANTIC_STATUS] Endpoint returned {}: {}", status, body)
            }
            SemanticError::MalformedResponse(msg) => {
                write!(f, "[SEMANTIC_PARSE] Malformed judgment: {}", msg)
            }
        }
    }
}

impl std::error::Error for SemanticError {}

/// A collaborator that judges whether an item matches a price tag.
#[async_trait]
pub trait SemanticEngine: Send + Sync {
    /// Model identifier reported by the health endpoint
    fn model_name(&self) -> &str;

    /// Judges an item name against recognized price-tag text.
    async fn judge_text(
        &self,
        item_name: &str,
        recognized_text: &str,
    ) -> Result<MatchVerdict, SemanticError>;

    /// Judges an item name against an image given as a data URL.
    async fn judge_image(
        &self,
        item_name: &str,
        image_data_url: &str,
    ) -> Result<MatchVerdict, SemanticError>;
}

/// Parses the engine's JSON answer.
///
/// Absent fields default to `false` / `0.0` / [`DEFAULT_REASONING`].
/// `"true"`/`"false"` and numeric strings are accepted; any other value of the
/// wrong type makes the whole answer malformed. Confidence is clamped into
/// `[0, 1]`. Markdown code fences around the object are tolerated.
pub fn parse_judgment(content: &str) -> Result<MatchVerdict, SemanticError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let value: Value = serde_json::from_str(body)
        .map_err(|e| SemanticError::MalformedResponse(format!("invalid JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| SemanticError::MalformedResponse("expected a JSON object".to_string()))?;

    let is_match = match object.get("is_match") {
        None => false,
        Some(value) => coerce_bool(value).ok_or_else(|| wrong_type("is_match", value))?,
    };
    let confidence = match object.get("confidence") {
        None => 0.0,
        Some(value) => coerce_f64(value).ok_or_else(|| wrong_type("confidence", value))?,
    };
    let reasoning = match object.get("reasoning") {
        None | Some(Value::Null) => DEFAULT_REASONING,
        Some(Value::String(text)) => text.as_str(),
        Some(value) => return Err(wrong_type("reasoning", value)),
    };

    Ok(MatchVerdict::new(is_match, confidence, reasoning))
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn wrong_type(field: &str, value: &Value) -> SemanticError {
    SemanticError::MalformedResponse(format!("field '{}' has unusable value {}", field, value))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(String),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: String },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
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

/// OpenAI-compatible chat-completions client.
pub struct OpenAiSemanticEngine {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiSemanticEngine {
    /// Builds the client, or `None` when no API key is configured.
    pub fn from_config(config: &SemanticConfig) -> Result<Option<Self>, SemanticError> {
        let api_key = match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => return Ok(None),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SemanticError::Transport(format!("client setup failed: {}", e)))?;

        Ok(Some(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        }))
    }

    async fn complete(&self, request: ChatRequest<'_>) -> Result<MatchVerdict, SemanticError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SemanticError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SemanticError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| SemanticError::MalformedResponse(format!("unexpected body: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| SemanticError::MalformedResponse("no choices returned".to_string()))?;

        let verdict = parse_judgment(&content)?;
        tracing::info!(
            model = %self.model,
            is_match = verdict.is_match,
            confidence = verdict.confidence,
            "Semantic judgment received"
        );
        Ok(verdict)
    }
}

/// User message for a text judgment
pub fn text_user_message(item_name: &str, recognized_text: &str) -> String {
    format!(
        "Artikal sa liste: \"{}\"\n\nTekst sa cjenovnika (OCR): \"{}\"\n\nDa li tekst sa cjenovnika SEMANTIČKI odgovara artiklu sa liste?",
        item_name, recognized_text
    )
}

/// User message for an image judgment
pub fn image_user_message(item_name: &str) -> String {
    format!(
        "Artikal sa liste: \"{}\"\n\nDa li slika prikazuje proizvod koji SEMANTIČKI odgovara artiklu?",
        item_name
    )
}

#[async_trait]
impl SemanticEngine for OpenAiSemanticEngine {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn judge_text(
        &self,
        item_name: &str,
        recognized_text: &str,
    ) -> Result<MatchVerdict, SemanticError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(TEXT_SYSTEM_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Text(text_user_message(item_name, recognized_text)),
                },
            ],
            temperature: TEXT_TEMPERATURE,
            max_tokens: TEXT_MAX_TOKENS,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        self.complete(request).await
    }

    async fn judge_image(
        &self,
        item_name: &str,
        image_data_url: &str,
    ) -> Result<MatchVerdict, SemanticError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(IMAGE_SYSTEM_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: image_user_message(item_name),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: image_data_url,
                            },
                        },
                    ]),
                },
            ],
            temperature: IMAGE_TEMPERATURE,
            max_tokens: IMAGE_MAX_TOKENS,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        self.complete(request).await
    }
}

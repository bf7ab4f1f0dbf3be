use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::errors::{ApiError, TransportError};
use crate::semantic_model::SemanticModelRef;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    /// The service calls its own side of the conversation "analyst".
    #[serde(rename = "analyst", alias = "assistant")]
    Assistant,
}

/// A typed unit of message content.
///
/// Keyed on the wire by its `type` field. The tag and the remaining fields
/// are kept exactly as received, so a block is sent back as history in the
/// same shape the service produced it. `view` is the typed reading of that
/// payload; tags this client does not know, and known tags whose payload has
/// an unexpected shape, read as `BlockView::Other`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    kind: String,
    payload: Map<String, Value>,
    view: BlockView,
}

/// Typed reading of a content block payload
#[derive(Debug, Clone, PartialEq)]
pub enum BlockView {
    Text {
        text: String,
    },
    Sql {
        statement: String,
        confidence: Option<Value>,
    },
    Suggestions {
        suggestions: Vec<String>,
    },
    /// Tagged `result_table`, or `table` by older service versions
    ResultTable {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Chart {
        chart_spec: Value,
    },
    Other,
}

#[derive(Deserialize)]
struct TextPayload {
    text: String,
}

#[derive(Deserialize)]
struct SqlPayload {
    statement: String,
    #[serde(default)]
    confidence: Option<Value>,
}

#[derive(Deserialize)]
struct SuggestionsPayload {
    suggestions: Vec<String>,
}

#[derive(Deserialize)]
struct TablePayload {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct ChartPayload {
    chart_spec: Value,
}

impl BlockView {
    fn parse(kind: &str, payload: &Map<String, Value>) -> Self {
        let body = Value::Object(payload.clone());
        let parsed = match kind {
            "text" => serde_json::from_value::<TextPayload>(body)
                .ok()
                .map(|p| BlockView::Text { text: p.text }),
            "sql" => serde_json::from_value::<SqlPayload>(body)
                .ok()
                .map(|p| BlockView::Sql {
                    statement: p.statement,
                    confidence: p.confidence,
                }),
            "suggestions" => serde_json::from_value::<SuggestionsPayload>(body)
                .ok()
                .map(|p| BlockView::Suggestions {
                    suggestions: p.suggestions,
                }),
            "result_table" | "table" => serde_json::from_value::<TablePayload>(body)
                .ok()
                .map(|p| BlockView::ResultTable {
                    columns: p.columns,
                    rows: p.rows,
                }),
            "chart" => serde_json::from_value::<ChartPayload>(body)
                .ok()
                .map(|p| BlockView::Chart {
                    chart_spec: p.chart_spec,
                }),
            _ => None,
        };
        parsed.unwrap_or(BlockView::Other)
    }
}

impl ContentBlock {
    /// Builds a block from its wire tag and the fields besides `type`
    pub fn new(kind: impl Into<String>, payload: Map<String, Value>) -> Self {
        let kind = kind.into();
        let view = BlockView::parse(&kind, &payload);
        Self {
            kind,
            payload,
            view,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        let mut payload = Map::new();
        payload.insert("text".to_string(), Value::String(text.into()));
        Self::new("text", payload)
    }

    pub fn suggestions<S: Into<String>>(suggestions: impl IntoIterator<Item = S>) -> Self {
        let list: Vec<Value> = suggestions
            .into_iter()
            .map(|s| Value::String(s.into()))
            .collect();
        let mut payload = Map::new();
        payload.insert("suggestions".to_string(), Value::Array(list));
        Self::new("suggestions", payload)
    }

    /// The wire tag of this block, as received
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Every field of the block except `type`
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn view(&self) -> &BlockView {
        &self.view
    }

    /// Builds a block from a JSON object carrying a string `type` field.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(mut payload) = value else {
            return Err("content block is not a JSON object".to_string());
        };
        let kind = match payload.remove("type") {
            Some(Value::String(kind)) => kind,
            Some(other) => return Err(format!("content block type is not a string: {}", other)),
            None => return Err("content block has no type".to_string()),
        };
        Ok(Self::new(kind, payload))
    }

    /// The wire representation of this block
    pub fn to_value(&self) -> Value {
        let mut map = self.payload.clone();
        map.insert("type".to_string(), Value::String(self.kind.clone()));
        Value::Object(map)
    }
}

impl Serialize for ContentBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ContentBlock::from_value(value).map_err(D::Error::custom)
    }
}

/// One message in the chat history. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
            request_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: Vec<ContentBlock>, request_id: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            request_id,
            created_at: Utc::now(),
        }
    }

    /// All text blocks joined by blank lines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block.view() {
                BlockView::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Suggested follow-up questions carried by this turn
    pub fn suggestions(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|block| match block.view() {
                BlockView::Suggestions { suggestions } => Some(suggestions),
                _ => None,
            })
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

/// A role/content pair in the service's message schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

impl From<&ConversationTurn> for AnalystMessage {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Body of `POST /api/v2/cortex/analyst/message`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalystRequest {
    pub messages: Vec<AnalystMessage>,
    pub semantic_model_file: String,
}

impl AnalystRequest {
    pub fn from_turns(turns: &[ConversationTurn], semantic_model: &SemanticModelRef) -> Self {
        Self {
            messages: turns.iter().map(AnalystMessage::from).collect(),
            semantic_model_file: semantic_model.stage_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ServerWarning {
    Message { message: String },
    Plain(String),
}

impl From<ServerWarning> for String {
    fn from(warning: ServerWarning) -> Self {
        match warning {
            ServerWarning::Message { message } => message,
            ServerWarning::Plain(message) => message,
        }
    }
}

/// Successful response body.
///
/// The service nests content under `message`; a flat `content` array is
/// accepted as well.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalystResponse {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    message: Option<AnalystMessage>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    warnings: Vec<ServerWarning>,
}

impl AnalystResponse {
    pub fn into_reply(self) -> AnalystReply {
        let content = match self.message {
            Some(message) if !message.content.is_empty() => message.content,
            _ => self.content,
        };
        AnalystReply {
            content,
            request_id: self.request_id,
            warnings: self.warnings.into_iter().map(String::from).collect(),
        }
    }
}

/// Error response body. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /api/v2/cortex/analyst/feedback`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRequest {
    pub request_id: String,
    pub positive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_message: Option<String>,
}

/// Parsed content of a successful analyst call
#[derive(Debug, Clone, PartialEq)]
pub struct AnalystReply {
    pub content: Vec<ContentBlock>,
    pub request_id: Option<String>,
    /// Non-fatal warnings the service attached to the answer
    pub warnings: Vec<String>,
}

/// Classified outcome of one analyst call
#[derive(Debug, Clone, PartialEq)]
pub enum AnalystResult {
    Success(AnalystReply),
    ApiError(ApiError),
    TransportError(TransportError),
}

impl AnalystResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalystResult::Success(_))
    }
}

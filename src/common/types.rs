use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Người gửi của một tin nhắn trong transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

/// Domain model đại diện một tin nhắn chat.
///
/// Immutable once appended to a transcript.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            text: text.into(),
            timestamp: Local::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }
}

/// Monotonic identifier handed out by the session for every issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Category tag sent alongside a question. The backend accepts exactly these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    General,
    Finance,
    Marketing,
    Operations,
    Hr,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Finance => "finance",
            Category::Marketing => "marketing",
            Category::Operations => "operations",
            Category::Hr => "hr",
        }
    }

    /// Lenient parse: trims, lowercases, and falls back to `General` for
    /// anything the backend would not accept.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "finance" => Category::Finance,
            "marketing" => Category::Marketing,
            "operations" => Category::Operations,
            "hr" => Category::Hr,
            _ => Category::General,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nút tắt theo danh mục: nhãn cũng chính là câu hỏi được gửi đi.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    pub label: String,
    #[serde(default)]
    pub category: Category,
}

impl Shortcut {
    pub fn new(label: impl Into<String>, category: Category) -> Self {
        Self {
            label: label.into(),
            category,
        }
    }
}

/// A question ready to be dispatched to the network worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsultRequest {
    pub id: RequestId,
    pub question: String,
    pub category: Category,
}

/// How a single consult request settled. Exactly one per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsultOutcome {
    /// Body parsed and carried no `error` field.
    Answer(String),
    /// Body parsed and carried an `error` field.
    ErrorPayload(String),
    /// The call itself failed: unreachable host, non-JSON body, etc.
    TransportError(String),
}

impl ConsultOutcome {
    /// Text of the assistant message this outcome renders as.
    pub fn display_text(&self) -> String {
        match self {
            ConsultOutcome::Answer(answer) => answer.clone(),
            ConsultOutcome::ErrorPayload(error) => format!("Error: {error}"),
            ConsultOutcome::TransportError(description) => {
                format!("Network error: {description}")
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, ConsultOutcome::Answer(_))
    }
}

/// Model details reported by `/api/model-info` and `/health`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub torch_dtype: Option<String>,
    #[serde(default)]
    pub parameters: Option<String>,
}

/// Trạng thái backend lấy từ `/health`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub detail: String,
    /// `Err` when the backend reported the model itself as unavailable.
    pub model_info: Option<Result<ModelInfo, String>>,
}

/// One answered question out of a batch consult.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAnswer {
    pub question: String,
    pub answer: String,
    pub index: usize,
}

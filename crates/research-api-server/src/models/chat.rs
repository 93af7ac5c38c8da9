use serde::{Deserialize, Serialize};

/// Opaque caller-scoped conversation key
pub type SessionId = String;

// ===== REQUEST MODELS =====

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default, rename = "sessionId", alias = "session_id")]
    pub session_id: Option<String>,
    #[serde(default, rename = "maxResults", alias = "max_results")]
    pub max_results: Option<usize>,
}

// ===== HISTORY MODELS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of a session history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ===== RESPONSE STREAM MODELS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Status,
    Content,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
}

impl Message {
    pub fn status(content: impl Into<String>) -> Self {
        Self {
            kind: MessageType::Status,
            content: content.into(),
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            kind: MessageType::Content,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            kind: MessageType::Error,
            content: content.into(),
        }
    }
}

/// A single line of the NDJSON response stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StreamRecord {
    Session {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
    },
    Message(Message),
}

impl StreamRecord {
    pub fn session(session_id: impl Into<SessionId>) -> Self {
        Self::Session {
            session_id: session_id.into(),
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message(message) => Some(message),
            Self::Session { .. } => None,
        }
    }

    /// Serialize as one newline-terminated JSON line
    pub fn to_ndjson(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        line.push('\n');
        line
    }
}

impl From<Message> for StreamRecord {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

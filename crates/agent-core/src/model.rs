use action_primitives::PageContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a conversation turn exchanged with the judgment service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    /// Engine-authored task framing and output contract.
    System,
    /// The concrete question for this call.
    User,
}

impl ConversationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationRole::System => "system",
            ConversationRole::User => "user",
        }
    }
}

/// A single message of a judgment prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: ConversationRole,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: ConversationRole, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// What the caller wants the service to decide.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JudgmentPurpose {
    PathDecision,
    AlternativeCode,
}

impl JudgmentPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            JudgmentPurpose::PathDecision => "path_decision",
            JudgmentPurpose::AlternativeCode => "alternative_code",
        }
    }
}

/// Structured prompt plus optional page context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgmentRequest {
    pub purpose: JudgmentPurpose,
    pub turns: Vec<ConversationTurn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_context: Option<PageContext>,
}

impl JudgmentRequest {
    pub fn new(purpose: JudgmentPurpose, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            purpose,
            turns: vec![
                ConversationTurn::new(ConversationRole::System, system),
                ConversationTurn::new(ConversationRole::User, user),
            ],
            page_context: None,
        }
    }

    pub fn with_page_context(mut self, context: PageContext) -> Self {
        self.page_context = Some(context);
        self
    }

    pub fn system_prompt(&self) -> String {
        self.messages_for(ConversationRole::System)
    }

    /// User turns, followed by the serialized page context when present.
    pub fn user_prompt(&self) -> String {
        let mut prompt = self.messages_for(ConversationRole::User);
        if let Some(context) = self.page_context.as_ref() {
            if let Ok(json) = serde_json::to_string(context) {
                prompt.push_str("\n\nPage context: ");
                prompt.push_str(&json);
            }
        }
        prompt
    }

    fn messages_for(&self, role: ConversationRole) -> String {
        self.turns
            .iter()
            .filter(|turn| turn.role == role)
            .map(|turn| turn.message.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an inbound message was posted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum ChatScope {
    Private,
    Group { group_id: String },
}

/// A message addressed to the agent, already filtered by the transport
/// (group messages only arrive if they mention the agent, with the mention removed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(flatten)]
    pub scope: ChatScope,
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl InboundEvent {
    pub fn private(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            scope: ChatScope::Private,
            sender_id: sender_id.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn group(
        group_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            scope: ChatScope::Group {
                group_id: group_id.into(),
            },
            sender_id: sender_id.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.scope, ChatScope::Group { .. })
    }

    /// Session key: the sender for private chats, `group_<id>` for groups.
    pub fn identity(&self) -> String {
        match &self.scope {
            ChatScope::Private => self.sender_id.clone(),
            ChatScope::Group { group_id } => format!("group_{}", group_id),
        }
    }

    /// Where replies go. Group replies mention the sender.
    pub fn reply_target(&self) -> ReplyTarget {
        match &self.scope {
            ChatScope::Private => ReplyTarget::Private {
                user_id: self.sender_id.clone(),
            },
            ChatScope::Group { group_id } => ReplyTarget::Group {
                group_id: group_id.clone(),
                mention: Some(self.sender_id.clone()),
            },
        }
    }
}

/// Destination for outbound text and files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReplyTarget {
    Private {
        user_id: String,
    },
    Group {
        group_id: String,
        mention: Option<String>,
    },
}

impl ReplyTarget {
    pub fn private(user_id: impl Into<String>) -> Self {
        Self::Private {
            user_id: user_id.into(),
        }
    }

    pub fn identity(&self) -> String {
        match self {
            Self::Private { user_id } => user_id.clone(),
            Self::Group { group_id, .. } => format!("group_{}", group_id),
        }
    }
}

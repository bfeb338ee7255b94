//! Delivered messages
//!
//! A delivered message is the plaintext recovered at the terminal relay (or
//! written through the direct side channel), as stored in the delivery log
//! and pushed to live subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author attached to a non-anonymous message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
}

impl Author {
    /// Author whose id and name are both `name`, avatar is its first two
    /// characters upper-cased.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let avatar = name.chars().take(2).collect::<String>().to_uppercase();
        Self {
            id: name.clone(),
            name,
            avatar,
        }
    }
}

/// Message content before the store assigns an id and timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub content: String,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl NewMessage {
    pub fn anonymous(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            author: None,
            is_anonymous: true,
        }
    }

    pub fn by(content: impl Into<String>, author: Author) -> Self {
        Self {
            content: content.into(),
            author: Some(author),
            is_anonymous: false,
        }
    }

    /// Interpret a terminal plaintext.
    ///
    /// A JSON object carrying a string `content` field is read as a message
    /// draft (other fields such as `id` or `votes` are ignored). Anything
    /// else becomes an anonymous message whose content is the text itself.
    pub fn from_plaintext(text: &str) -> Self {
        match serde_json::from_str::<NewMessage>(text) {
            Ok(draft) => draft,
            Err(_) => Self::anonymous(text),
        }
    }

    /// Attach the store-assigned id and timestamp
    pub fn into_delivered(self, id: u64, timestamp: DateTime<Utc>) -> DeliveredMessage {
        DeliveredMessage {
            id,
            content: self.content,
            author: self.author,
            is_anonymous: self.is_anonymous,
            timestamp,
            votes: 0,
            comments: Vec::new(),
        }
    }
}

/// A message as persisted in the delivery store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveredMessage {
    pub id: u64,
    pub content: String,
    pub author: Option<Author>,
    pub is_anonymous: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub votes: i64,
    #[serde(default)]
    pub comments: Vec<Value>,
}

impl DeliveredMessage {
    /// Serialize as a single JSON line (no trailing newline)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

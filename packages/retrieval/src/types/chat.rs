//! Chat wire types.
//!
//! `ChatEntry` is the unit the agent consumes and produces. The serialized
//! shape (numeric author, camelCase flags) is what the transport layer
//! forwards to clients unchanged.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Who authored a chat entry.
///
/// Serialized as `0` (agent) / `1` (user) on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    Agent,
    User,
}

impl Serialize for Author {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            Author::Agent => 0,
            Author::User => 1,
        })
    }
}

impl<'de> Deserialize<'de> for Author {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Author::Agent),
            1 => Ok(Author::User),
            other => Err(de::Error::custom(format!("unknown author code {other}"))),
        }
    }
}

/// One entry of a conversation.
///
/// A chat is an ordered sequence alternating user and agent entries, not
/// necessarily of even length while a turn is in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    /// The entry's text.
    pub content: String,

    /// Who wrote it.
    pub author: Author,

    /// The retrieved context the answer was grounded in, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Progress-only entry; callers should not persist it as history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_transient: Option<bool>,

    /// Final entry of a streamed turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_stop: Option<bool>,
}

impl ChatEntry {
    /// Create an agent-authored entry.
    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            author: Author::Agent,
            context: None,
            is_transient: None,
            is_stop: None,
        }
    }

    /// Create a user-authored entry.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            author: Author::User,
            context: None,
            is_transient: None,
            is_stop: None,
        }
    }

    /// Attach grounding context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Mark the entry transient (progress-only).
    pub fn transient(mut self, transient: bool) -> Self {
        self.is_transient = Some(transient);
        self
    }

    /// Mark the entry as the stop entry of a streamed turn.
    pub fn stop(mut self, stop: bool) -> Self {
        self.is_stop = Some(stop);
        self
    }

    /// True when this entry ends a streamed turn.
    pub fn is_stop_entry(&self) -> bool {
        self.is_stop == Some(true)
    }

    /// True when this entry is progress-only.
    pub fn is_transient_entry(&self) -> bool {
        self.is_transient == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let entry = ChatEntry::agent("hello")
            .with_context("ctx")
            .transient(true)
            .stop(false);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["author"], 0);
        assert_eq!(json["content"], "hello");
        assert_eq!(json["context"], "ctx");
        assert_eq!(json["isTransient"], true);
        assert_eq!(json["isStop"], false);
    }

    #[test]
    fn test_unset_flags_are_omitted() {
        let entry = ChatEntry::user("hi");
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("isTransient"));
        assert!(!json.contains("isStop"));
        assert!(!json.contains("context"));
        assert!(json.contains("\"author\":1"));
    }

    #[test]
    fn test_round_trip() {
        let entry = ChatEntry::agent("answer").with_context("ctx").stop(true);
        let json = serde_json::to_string(&entry).unwrap();
        let back: ChatEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_unknown_author_code_rejected() {
        let err = serde_json::from_str::<ChatEntry>(r#"{"content":"x","author":7}"#);
        assert!(err.is_err());
    }
}

//! Message module - the append-only conversation record

use crate::{Department, Response};
use std::fmt;

/// Unique identifier for a message based on UUIDv7
///
/// UUIDv7 provides:
/// - Chronological sortability, used as the tie-breaker after `created_at`
/// - 128-bit uniqueness
/// - No coordination required between concurrent sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(u128);

impl MessageId {
    /// Generate a new UUIDv7-based MessageId
    ///
    /// # Examples
    ///
    /// ```
    /// use civic_domain::MessageId;
    ///
    /// let id = MessageId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a MessageId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a MessageId from its UUID string form
    ///
    /// # Examples
    ///
    /// ```
    /// use civic_domain::MessageId;
    ///
    /// let id = MessageId::new();
    /// let parsed = MessageId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid message id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Opaque token isolating one visit's conversation from others
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing session token
    ///
    /// # Errors
    /// Returns error if the token is empty or blank
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err("Session id cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    /// Generate a fresh random session token
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().simple().to_string())
    }

    /// Get the token as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Typed by the visitor
    User,
    /// Produced by the assistant
    Assistant,
}

impl Role {
    /// Get the role name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a role from its name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// The (department, session) pair a message is filed under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    /// Department context
    pub department: Department,

    /// Session token
    pub session: SessionId,
}

impl Partition {
    /// Create a new partition key
    pub fn new(department: Department, session: SessionId) -> Self {
        Self {
            department,
            session,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.department, self.session)
    }
}

/// A conversation message
///
/// Messages are append-only; once created they are never mutated.
/// Within a partition they are ordered by `(created_at, id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Unique identifier
    pub id: MessageId,

    /// Who wrote the message
    pub role: Role,

    /// Plain display string
    pub content: String,

    /// Structured response payload (assistant messages only)
    pub data: Option<Response>,

    /// Department context the message is filed under
    pub department: Department,

    /// Session the message belongs to
    pub session_id: SessionId,

    /// Creation time in milliseconds since the Unix epoch
    pub created_at: u64,
}

impl Message {
    /// Create a user message
    pub fn user(
        content: impl Into<String>,
        partition: &Partition,
        created_at: u64,
    ) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::User,
            content: content.into(),
            data: None,
            department: partition.department,
            session_id: partition.session.clone(),
            created_at,
        }
    }

    /// Create an assistant message carrying a structured response
    pub fn assistant(response: Response, partition: &Partition, created_at: u64) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::Assistant,
            content: response.text.clone(),
            data: Some(response),
            department: partition.department,
            session_id: partition.session.clone(),
            created_at,
        }
    }

    /// Create the welcome message that opens an empty partition
    pub fn welcome(text: impl Into<String>, partition: &Partition, created_at: u64) -> Self {
        Self::assistant(Response::plain(text), partition, created_at)
    }

    /// Partition this message is filed under
    pub fn partition(&self) -> Partition {
        Partition::new(self.department, self.session_id.clone())
    }

    /// Whether this message belongs to the given partition
    pub fn belongs_to(&self, partition: &Partition) -> bool {
        self.department == partition.department && self.session_id == partition.session
    }

    /// Sort key used on every read path
    pub fn ordering_key(&self) -> (u64, MessageId) {
        (self.created_at, self.id)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: MessageId ordering matches u128 ordering
        #[test]
        fn test_id_ordering_property(a: u128, b: u128) {
            let id_a = MessageId::from_value(a);
            let id_b = MessageId::from_value(b);

            prop_assert_eq!(id_a < id_b, a < b);
            prop_assert_eq!(id_a == id_b, a == b);
        }

        /// Property: Round-trip through string representation preserves ID
        #[test]
        fn test_id_string_roundtrip(value: u128) {
            let id = MessageId::from_value(value);

            match MessageId::from_string(&id.to_string()) {
                Ok(parsed) => prop_assert_eq!(id, parsed),
                Err(e) => return Err(TestCaseError::fail(e)),
            }
        }
    }
}

//! Gateway protocol types for communication between Pinbot and a chat platform.
//!
//! This crate defines the two halves of the contract between the pin policy and
//! a platform gateway:
//!
//! - **Events** (Gateway → Pinbot): [`GatewayEvent`], delivered over an mpsc channel
//! - **Commands** (Pinbot → Gateway): the [`ChatClient`] capability trait
//!
//! The policy only ever sees these types, so it can be driven by a fake client
//! in tests without a live connection.
//!
//! # Example: Minimal Gateway
//!
//! ```ignore
//! use pinbot_gateway_protocol::{Emoji, GatewayEvent, MessageRef, ReactionEvent, ReactionKind};
//!
//! event_tx
//!     .send(GatewayEvent::Reaction(ReactionEvent {
//!         kind: ReactionKind::Added,
//!         message: MessageRef::new(channel_id, message_id),
//!         emoji: Emoji::new("📌"),
//!         user_id: Some(user_id),
//!     }))
//!     .await?;
//! ```

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// Events (Gateway → Pinbot)
// ============================================================================

/// Events sent from a gateway to Pinbot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// The gateway connection is established.
    Ready { user: String, user_id: u64 },

    /// A reaction was added to or removed from a message.
    Reaction(ReactionEvent),

    /// The gateway is shutting down.
    Shutdown { reason: String },
}

/// Whether a reaction was added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    Added,
    Removed,
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactionKind::Added => f.write_str("added"),
            ReactionKind::Removed => f.write_str("removed"),
        }
    }
}

/// A single reaction-added or reaction-removed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub kind: ReactionKind,
    pub message: MessageRef,
    pub emoji: Emoji,
    /// The user who reacted, when the platform reports one.
    pub user_id: Option<u64>,
}

// ============================================================================
// Data Types
// ============================================================================

/// Reference to a message that may still need to be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel_id: u64,
    pub message_id: u64,
}

impl MessageRef {
    pub fn new(channel_id: u64, message_id: u64) -> Self {
        Self {
            channel_id,
            message_id,
        }
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message_id)
    }
}

/// Emoji identified by name: the unicode glyph, or the name of a custom emoji.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Emoji(String);

impl Emoji {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Emoji {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub id: u64,
    pub name: String,
}

impl User {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Snapshot of a resolved message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub reference: MessageRef,
    /// Pin state at fetch time.
    pub pinned: bool,
}

// ============================================================================
// Commands (Pinbot → Gateway)
// ============================================================================

/// Capability interface onto the chat platform.
///
/// Exactly the operations the pin policy needs. Implementations must be safe
/// to call from many concurrent event handlers.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Fetch a message. Returns `Ok(None)` if it no longer exists.
    async fn fetch_message(&self, message: &MessageRef) -> Result<Option<Message>, ClientError>;

    /// List the users who reacted with `emoji`. `None` means no limit.
    async fn reaction_users(
        &self,
        message: &MessageRef,
        emoji: &Emoji,
        limit: Option<usize>,
    ) -> Result<Vec<User>, ClientError>;

    /// Remove `user`'s `emoji` reaction from the message.
    async fn remove_reaction(
        &self,
        message: &MessageRef,
        emoji: &Emoji,
        user: &User,
    ) -> Result<(), ClientError>;

    async fn pin(&self, message: &MessageRef) -> Result<(), ClientError>;

    async fn unpin(&self, message: &MessageRef) -> Result<(), ClientError>;

    /// Query the current pin state of the message.
    async fn is_pinned(&self, message: &MessageRef) -> Result<bool, ClientError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Errors returned by a [`ChatClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The platform rejected the request for lack of permission.
    #[error("{operation} forbidden: {message}")]
    Forbidden {
        operation: &'static str,
        message: String,
    },

    /// Rate limited by the platform.
    #[error("{operation} rate limited")]
    RateLimited { operation: &'static str },

    /// Any other request failure (network, unexpected status, decoding).
    #[error("{operation} failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },
}

impl ClientError {
    pub fn request(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Request {
            operation,
            message: message.into(),
        }
    }

    pub fn forbidden(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Forbidden {
            operation,
            message: message.into(),
        }
    }

    /// The operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            ClientError::Forbidden { operation, .. }
            | ClientError::RateLimited { operation }
            | ClientError::Request { operation, .. } => operation,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

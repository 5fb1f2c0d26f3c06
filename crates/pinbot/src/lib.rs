//! Pinbot - pins chat messages by reaction, and unpins them when the reaction goes away.

// ============================================================================
// Always Available
// ============================================================================

pub mod config;
pub mod dispatch;
pub mod logging;
pub mod policy;

// ============================================================================
// Discord runtime (behind `gateway-discord` feature)
// ============================================================================

#[cfg(feature = "gateway-discord")]
pub mod bot;

// Re-export protocol types from the protocol crate
pub use pinbot_gateway_protocol::{
    ChatClient, ClientError, Emoji, GatewayEvent, Message, MessageRef, ReactionEvent,
    ReactionKind, User,
};

pub use dispatch::{Dispatcher, StopReason};
pub use policy::{Action, PolicyEmoji, ReactionPolicy};

//! Reaction pin policy.
//!
//! Maps reaction events to pin, unpin and reaction-cleanup commands:
//!
//! - Pin emoji added: pin the message unless it is already pinned.
//! - Pin emoji removed: strip the pin emoji from every remaining user, then
//!   unpin if pinned.
//! - Escalation emoji added: strip both tracked emoji from every user, then
//!   unpin unconditionally.
//!
//! The policy keeps no state between events. Every decision is made from the
//! event itself plus a fresh fetch of the message, so concurrent invocations
//! need no locking.

use std::fmt;
use std::sync::Arc;

use pinbot_gateway_protocol::{
    ChatClient, ClientError, Emoji, Message, MessageRef, ReactionEvent, ReactionKind, User,
};
use tracing::{debug, info};

use crate::config::EmojiConfig;

// ============================================================================
// PolicyEmoji
// ============================================================================

/// The two emoji the policy tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEmoji {
    pub pin: Emoji,
    pub escalate: Emoji,
}

impl PolicyEmoji {
    pub fn new(pin: impl Into<String>, escalate: impl Into<String>) -> Self {
        Self {
            pin: Emoji::new(pin),
            escalate: Emoji::new(escalate),
        }
    }

    /// Emoji stripped from every user on escalation, in sweep order.
    pub fn tracked(&self) -> [&Emoji; 2] {
        [&self.pin, &self.escalate]
    }
}

impl Default for PolicyEmoji {
    fn default() -> Self {
        Self::from(&EmojiConfig::default())
    }
}

impl From<&EmojiConfig> for PolicyEmoji {
    fn from(config: &EmojiConfig) -> Self {
        Self {
            pin: config.pin_emoji(),
            escalate: config.escalate_emoji(),
        }
    }
}

// ============================================================================
// Action
// ============================================================================

/// A state change applied to a message. Each one is logged exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    RemovedReaction {
        message: MessageRef,
        emoji: Emoji,
        user: User,
    },
    Pinned {
        message: MessageRef,
    },
    Unpinned {
        message: MessageRef,
    },
}

impl Action {
    pub fn message(&self) -> &MessageRef {
        match self {
            Action::RemovedReaction { message, .. }
            | Action::Pinned { message }
            | Action::Unpinned { message } => message,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::RemovedReaction { emoji, user, .. } => {
                write!(f, "removed {}/{}", emoji, user.name)
            }
            Action::Pinned { message } => write!(f, "pinned {}", message),
            Action::Unpinned { message } => write!(f, "unpinned {}", message),
        }
    }
}

// ============================================================================
// ReactionPolicy
// ============================================================================

/// Stateless reaction handler backed by a [`ChatClient`].
#[derive(Clone)]
pub struct ReactionPolicy {
    client: Arc<dyn ChatClient>,
    emoji: PolicyEmoji,
}

impl ReactionPolicy {
    pub fn new(client: Arc<dyn ChatClient>, emoji: PolicyEmoji) -> Self {
        Self { client, emoji }
    }

    pub fn emoji(&self) -> &PolicyEmoji {
        &self.emoji
    }

    /// Route an event to its handler by kind.
    pub async fn handle(&self, event: &ReactionEvent) -> Result<Vec<Action>, ClientError> {
        match event.kind {
            ReactionKind::Added => self.on_reaction_added(event).await,
            ReactionKind::Removed => self.on_reaction_removed(event).await,
        }
    }

    /// Handle a reaction being added. Escalation takes priority over pinning.
    pub async fn on_reaction_added(
        &self,
        event: &ReactionEvent,
    ) -> Result<Vec<Action>, ClientError> {
        if event.emoji != self.emoji.escalate && event.emoji != self.emoji.pin {
            return Ok(Vec::new());
        }

        let Some(message) = self.resolve(&event.message).await? else {
            return Ok(Vec::new());
        };

        let mut actions = Vec::new();

        if event.emoji == self.emoji.escalate {
            for emoji in self.emoji.tracked() {
                self.sweep(&message.reference, emoji, &mut actions).await?;
            }
            self.client.unpin(&message.reference).await?;
            record(
                &mut actions,
                Action::Unpinned {
                    message: message.reference,
                },
            );
            return Ok(actions);
        }

        // The snapshot was fetched for this event, so its pin state is current
        if message.pinned {
            debug!(message_id = %message.reference, "Message already pinned");
        } else {
            self.client.pin(&message.reference).await?;
            record(
                &mut actions,
                Action::Pinned {
                    message: message.reference,
                },
            );
        }

        Ok(actions)
    }

    /// Handle a reaction being removed.
    ///
    /// Losing any one pin reaction clears the pin emoji from all users and
    /// unpins; there is no per-user co-pinning. Pin state is re-queried after
    /// the sweep since the fetched snapshot may be stale by then.
    pub async fn on_reaction_removed(
        &self,
        event: &ReactionEvent,
    ) -> Result<Vec<Action>, ClientError> {
        if event.emoji != self.emoji.pin {
            return Ok(Vec::new());
        }

        let Some(message) = self.resolve(&event.message).await? else {
            return Ok(Vec::new());
        };

        let mut actions = Vec::new();
        self.sweep(&message.reference, &self.emoji.pin, &mut actions)
            .await?;

        if self.client.is_pinned(&message.reference).await? {
            self.client.unpin(&message.reference).await?;
            record(
                &mut actions,
                Action::Unpinned {
                    message: message.reference,
                },
            );
        }

        Ok(actions)
    }

    async fn resolve(&self, message: &MessageRef) -> Result<Option<Message>, ClientError> {
        let resolved = self.client.fetch_message(message).await?;
        if resolved.is_none() {
            debug!(message_id = %message, "Message not found, skipping event");
        }
        Ok(resolved)
    }

    /// Remove every user's `emoji` reaction from the message.
    async fn sweep(
        &self,
        message: &MessageRef,
        emoji: &Emoji,
        actions: &mut Vec<Action>,
    ) -> Result<(), ClientError> {
        let users = self.client.reaction_users(message, emoji, None).await?;
        for user in users {
            self.client.remove_reaction(message, emoji, &user).await?;
            record(
                actions,
                Action::RemovedReaction {
                    message: *message,
                    emoji: emoji.clone(),
                    user,
                },
            );
        }
        Ok(())
    }
}

fn record(actions: &mut Vec<Action>, action: Action) {
    info!(message_id = %action.message(), ">> {}", action);
    actions.push(action);
}

//! Common test utilities.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use pinbot::{
    ChatClient, ClientError, Emoji, Message, MessageRef, PolicyEmoji, ReactionEvent, ReactionKind,
    ReactionPolicy, User,
};

pub const PIN: &str = "📌";
pub const ESCALATE: &str = "🔨";

/// A command observed by [`FakeChatClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Fetch(MessageRef),
    ReactionUsers(MessageRef, Emoji),
    RemoveReaction(MessageRef, Emoji, u64),
    Pin(MessageRef),
    Unpin(MessageRef),
    IsPinned(MessageRef),
}

impl Command {
    /// Whether this command changes platform state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::RemoveReaction(..) | Command::Pin(_) | Command::Unpin(_)
        )
    }
}

#[derive(Debug, Default)]
struct FakeMessage {
    pinned: bool,
    reactions: Vec<(Emoji, User)>,
}

#[derive(Debug, Default)]
struct State {
    messages: HashMap<MessageRef, FakeMessage>,
    failures: Vec<(&'static str, MessageRef)>,
    commands: Vec<Command>,
}

/// In-memory chat platform that records every command it receives.
#[derive(Debug, Default)]
pub struct FakeChatClient {
    state: Mutex<State>,
}

impl FakeChatClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_message(&self, message: MessageRef, pinned: bool) {
        let mut state = self.state.lock().expect("mutex poisoned");
        state.messages.insert(
            message,
            FakeMessage {
                pinned,
                reactions: Vec::new(),
            },
        );
    }

    pub fn add_reaction(&self, message: MessageRef, emoji: &str, user: &User) {
        let mut state = self.state.lock().expect("mutex poisoned");
        state
            .messages
            .get_mut(&message)
            .expect("message registered")
            .reactions
            .push((Emoji::new(emoji), user.clone()));
    }

    /// Make `operation` fail for `message`.
    pub fn fail(&self, operation: &'static str, message: MessageRef) {
        let mut state = self.state.lock().expect("mutex poisoned");
        state.failures.push((operation, message));
    }

    pub fn pinned(&self, message: MessageRef) -> bool {
        let state = self.state.lock().expect("mutex poisoned");
        state.messages.get(&message).is_some_and(|m| m.pinned)
    }

    pub fn reactions(&self, message: MessageRef) -> Vec<(Emoji, u64)> {
        let state = self.state.lock().expect("mutex poisoned");
        state
            .messages
            .get(&message)
            .map(|m| m.reactions.iter().map(|(e, u)| (e.clone(), u.id)).collect())
            .unwrap_or_default()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state.lock().expect("mutex poisoned").commands.clone()
    }

    pub fn mutations(&self) -> Vec<Command> {
        self.commands()
            .into_iter()
            .filter(Command::is_mutation)
            .collect()
    }

    pub fn clear_commands(&self) {
        self.state.lock().expect("mutex poisoned").commands.clear();
    }

    fn begin(
        &self,
        operation: &'static str,
        message: &MessageRef,
        command: Command,
    ) -> Result<std::sync::MutexGuard<'_, State>, ClientError> {
        let mut state = self.state.lock().expect("mutex poisoned");
        state.commands.push(command);
        if state
            .failures
            .iter()
            .any(|(op, m)| *op == operation && m == message)
        {
            return Err(ClientError::request(operation, "injected failure"));
        }
        Ok(state)
    }
}

#[async_trait]
impl ChatClient for FakeChatClient {
    async fn fetch_message(&self, message: &MessageRef) -> Result<Option<Message>, ClientError> {
        let state = self.begin("fetch_message", message, Command::Fetch(*message))?;
        Ok(state.messages.get(message).map(|m| Message {
            reference: *message,
            pinned: m.pinned,
        }))
    }

    async fn reaction_users(
        &self,
        message: &MessageRef,
        emoji: &Emoji,
        limit: Option<usize>,
    ) -> Result<Vec<User>, ClientError> {
        let state = self.begin(
            "reaction_users",
            message,
            Command::ReactionUsers(*message, emoji.clone()),
        )?;
        let users = state
            .messages
            .get(message)
            .map(|m| {
                m.reactions
                    .iter()
                    .filter(|(e, _)| e == emoji)
                    .map(|(_, u)| u.clone())
                    .take(limit.unwrap_or(usize::MAX))
                    .collect()
            })
            .unwrap_or_default();
        Ok(users)
    }

    async fn remove_reaction(
        &self,
        message: &MessageRef,
        emoji: &Emoji,
        user: &User,
    ) -> Result<(), ClientError> {
        let mut state = self.begin(
            "remove_reaction",
            message,
            Command::RemoveReaction(*message, emoji.clone(), user.id),
        )?;
        if let Some(m) = state.messages.get_mut(message) {
            m.reactions.retain(|(e, u)| !(e == emoji && u.id == user.id));
        }
        Ok(())
    }

    async fn pin(&self, message: &MessageRef) -> Result<(), ClientError> {
        let mut state = self.begin("pin", message, Command::Pin(*message))?;
        if let Some(m) = state.messages.get_mut(message) {
            m.pinned = true;
        }
        Ok(())
    }

    async fn unpin(&self, message: &MessageRef) -> Result<(), ClientError> {
        let mut state = self.begin("unpin", message, Command::Unpin(*message))?;
        if let Some(m) = state.messages.get_mut(message) {
            m.pinned = false;
        }
        Ok(())
    }

    async fn is_pinned(&self, message: &MessageRef) -> Result<bool, ClientError> {
        let state = self.begin("is_pinned", message, Command::IsPinned(*message))?;
        Ok(state.messages.get(message).is_some_and(|m| m.pinned))
    }
}

/// Policy with the default emoji over `client`.
pub fn policy(client: &Arc<FakeChatClient>) -> ReactionPolicy {
    ReactionPolicy::new(client.clone(), PolicyEmoji::new(PIN, ESCALATE))
}

pub fn added(message: MessageRef, emoji: &str, user: &User) -> ReactionEvent {
    ReactionEvent {
        kind: ReactionKind::Added,
        message,
        emoji: Emoji::new(emoji),
        user_id: Some(user.id),
    }
}

pub fn removed(message: MessageRef, emoji: &str, user: &User) -> ReactionEvent {
    ReactionEvent {
        kind: ReactionKind::Removed,
        message,
        emoji: Emoji::new(emoji),
        user_id: Some(user.id),
    }
}

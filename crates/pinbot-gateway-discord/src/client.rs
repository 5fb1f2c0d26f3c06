//! [`ChatClient`] implementation over the Discord HTTP API.

use std::sync::Arc;

use async_trait::async_trait;
use pinbot_gateway_protocol::{ChatClient, ClientError, Emoji, Message, MessageRef, User};
use serenity::all::{ChannelId, EmojiId, MessageId, ReactionType, UserId};
use serenity::http::Http;

/// Discord caps a single reaction-users page at 100 entries.
const REACTION_PAGE_SIZE: usize = 100;

/// Issues pin, unpin and reaction commands against Discord.
#[derive(Clone)]
pub struct DiscordChatClient {
    http: Arc<Http>,
}

impl DiscordChatClient {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    async fn get_message(
        &self,
        operation: &'static str,
        message: &MessageRef,
    ) -> Result<Option<serenity::model::channel::Message>, ClientError> {
        match channel(message)
            .message(&self.http, MessageId::new(message.message_id))
            .await
        {
            Ok(msg) => Ok(Some(msg)),
            Err(e) if status_code(&e) == Some(404) => Ok(None),
            Err(e) => Err(map_error(operation, e)),
        }
    }
}

#[async_trait]
impl ChatClient for DiscordChatClient {
    async fn fetch_message(&self, message: &MessageRef) -> Result<Option<Message>, ClientError> {
        let fetched = self.get_message("fetch_message", message).await?;
        Ok(fetched.map(|msg| Message {
            reference: *message,
            pinned: msg.pinned,
        }))
    }

    async fn reaction_users(
        &self,
        message: &MessageRef,
        emoji: &Emoji,
        limit: Option<usize>,
    ) -> Result<Vec<User>, ClientError> {
        let reaction_type = reaction_type_from_emoji(emoji);
        let mut users = Vec::new();
        let mut after: Option<UserId> = None;

        loop {
            let Some(page_size) = next_page_size(users.len(), limit) else {
                break;
            };

            let page = channel(message)
                .reaction_users(
                    &self.http,
                    MessageId::new(message.message_id),
                    reaction_type.clone(),
                    Some(page_size),
                    after,
                )
                .await
                .map_err(|e| map_error("reaction_users", e))?;

            let exhausted = page.len() < usize::from(page_size);
            after = page.last().map(|u| u.id);
            users.extend(page.into_iter().map(|u| User::new(u.id.get(), u.name)));

            if exhausted {
                break;
            }
        }

        Ok(users)
    }

    async fn remove_reaction(
        &self,
        message: &MessageRef,
        emoji: &Emoji,
        user: &User,
    ) -> Result<(), ClientError> {
        channel(message)
            .delete_reaction(
                &self.http,
                MessageId::new(message.message_id),
                Some(UserId::new(user.id)),
                reaction_type_from_emoji(emoji),
            )
            .await
            .map_err(|e| map_error("remove_reaction", e))
    }

    async fn pin(&self, message: &MessageRef) -> Result<(), ClientError> {
        channel(message)
            .pin(&self.http, MessageId::new(message.message_id))
            .await
            .map_err(|e| map_error("pin", e))
    }

    async fn unpin(&self, message: &MessageRef) -> Result<(), ClientError> {
        channel(message)
            .unpin(&self.http, MessageId::new(message.message_id))
            .await
            .map_err(|e| map_error("unpin", e))
    }

    async fn is_pinned(&self, message: &MessageRef) -> Result<bool, ClientError> {
        // A message deleted since the event counts as not pinned
        let fetched = self.get_message("is_pinned", message).await?;
        Ok(fetched.is_some_and(|msg| msg.pinned))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn channel(message: &MessageRef) -> ChannelId {
    ChannelId::new(message.channel_id)
}

/// Size of the next reaction-users page, or `None` once `limit` is reached.
fn next_page_size(fetched: usize, limit: Option<usize>) -> Option<u8> {
    let remaining = match limit {
        Some(limit) => limit.saturating_sub(fetched),
        None => REACTION_PAGE_SIZE,
    };
    if remaining == 0 {
        return None;
    }
    u8::try_from(remaining.min(REACTION_PAGE_SIZE)).ok()
}

/// Parse an emoji name into a serenity `ReactionType`.
///
/// Supports `name:id` and `<:name:id>` for custom emoji; anything else is unicode.
fn reaction_type_from_emoji(emoji: &Emoji) -> ReactionType {
    let name = emoji.name();
    let trimmed = name
        .strip_prefix("<a:")
        .or_else(|| name.strip_prefix("<:"))
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(name);

    if let Some((custom_name, id)) = trimmed.rsplit_once(':')
        && let Ok(id) = id.parse::<u64>()
        && id != 0
    {
        return ReactionType::Custom {
            animated: name.starts_with("<a:"),
            id: EmojiId::new(id),
            name: Some(custom_name.to_string()),
        };
    }

    ReactionType::Unicode(name.to_string())
}

fn status_code(err: &serenity::Error) -> Option<u16> {
    match err {
        serenity::Error::Http(http_err) => http_err.status_code().map(|s| s.as_u16()),
        _ => None,
    }
}

fn map_error(operation: &'static str, err: serenity::Error) -> ClientError {
    match status_code(&err) {
        Some(403) => ClientError::forbidden(operation, err.to_string()),
        Some(429) => ClientError::RateLimited { operation },
        _ => ClientError::request(operation, err.to_string()),
    }
}

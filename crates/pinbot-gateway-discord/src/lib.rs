//! Discord gateway for Pinbot using serenity.
//!
//! [`DiscordGateway`] owns the serenity client. It forwards reaction events to
//! Pinbot as [`GatewayEvent`]s over an mpsc channel, and hands out a
//! [`DiscordChatClient`] that implements the [`ChatClient`] commands over the
//! Discord HTTP API.
//!
//! [`ChatClient`]: pinbot_gateway_protocol::ChatClient

mod client;

pub use client::DiscordChatClient;

use anyhow::Context as _;
use pinbot_gateway_protocol::{Emoji, GatewayEvent, MessageRef, ReactionEvent, ReactionKind};
use serenity::all::{GatewayIntents, Reaction, ReactionType};
use serenity::async_trait;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the Discord gateway.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Discord bot token.
    pub bot_token: String,
}

impl DiscordConfig {
    /// Create a new config with the given bot token.
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
        }
    }
}

// ============================================================================
// Discord Gateway
// ============================================================================

/// Discord gateway that bridges the Discord Bot API with Pinbot.
pub struct DiscordGateway {
    client: Client,
    event_tx: mpsc::Sender<GatewayEvent>,
}

impl DiscordGateway {
    /// Build the serenity client. Does not open the gateway connection yet.
    pub async fn connect(
        config: &DiscordConfig,
        event_tx: mpsc::Sender<GatewayEvent>,
    ) -> anyhow::Result<Self> {
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGE_REACTIONS
            | GatewayIntents::DIRECT_MESSAGE_REACTIONS;

        let handler = Handler {
            event_tx: event_tx.clone(),
        };

        let client = Client::builder(&config.bot_token, intents)
            .event_handler(handler)
            .await
            .context("failed to create Discord client")?;

        Ok(Self { client, event_tx })
    }

    /// Command client sharing this gateway's HTTP connection pool.
    pub fn chat_client(&self) -> DiscordChatClient {
        DiscordChatClient::new(self.client.http.clone())
    }

    /// Run the gateway until `cancel` fires or the connection fails.
    ///
    /// Sends [`GatewayEvent::Shutdown`] before returning.
    pub async fn run(mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        let shard_manager = self.client.shard_manager.clone();
        let shutdown_watch = cancel.clone();
        let shutdown_handle = tokio::spawn(async move {
            shutdown_watch.cancelled().await;
            info!("Discord gateway received shutdown request");
            shard_manager.shutdown_all().await;
        });

        info!("Discord gateway started");

        // Blocks until every shard has stopped
        let result = self.client.start().await;

        shutdown_handle.abort();

        let reason = match &result {
            Ok(()) => "shutdown requested".to_string(),
            Err(e) => {
                error!(error = %e, "Discord client error");
                e.to_string()
            }
        };
        if self
            .event_tx
            .send(GatewayEvent::Shutdown { reason })
            .await
            .is_err()
        {
            debug!("Event channel closed before shutdown event");
        }

        info!("Discord gateway stopped");
        result.context("Discord gateway connection failed")
    }
}

// ============================================================================
// Event Handler
// ============================================================================

struct Handler {
    event_tx: mpsc::Sender<GatewayEvent>,
}

impl Handler {
    async fn forward(&self, kind: ReactionKind, reaction: &Reaction) {
        let event = GatewayEvent::Reaction(reaction_event(kind, reaction));
        if let Err(e) = self.event_tx.send(event).await {
            warn!(error = %e, "Failed to send reaction event");
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn reaction_add(&self, _ctx: Context, reaction: Reaction) {
        self.forward(ReactionKind::Added, &reaction).await;
    }

    async fn reaction_remove(&self, _ctx: Context, reaction: Reaction) {
        self.forward(ReactionKind::Removed, &reaction).await;
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        let event = GatewayEvent::Ready {
            user: ready.user.name.clone(),
            user_id: ready.user.id.get(),
        };
        if let Err(e) = self.event_tx.send(event).await {
            warn!(error = %e, "Failed to send ready event");
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn reaction_event(kind: ReactionKind, reaction: &Reaction) -> ReactionEvent {
    ReactionEvent {
        kind,
        message: MessageRef::new(reaction.channel_id.get(), reaction.message_id.get()),
        emoji: emoji_from_reaction_type(&reaction.emoji),
        user_id: reaction.user_id.map(|id| id.get()),
    }
}

/// Unicode emoji map to their glyph, custom emoji to `name:id`.
fn emoji_from_reaction_type(reaction_type: &ReactionType) -> Emoji {
    match reaction_type {
        ReactionType::Unicode(glyph) => Emoji::new(glyph.as_str()),
        ReactionType::Custom { id, name, .. } => {
            Emoji::new(format!("{}:{}", name.as_deref().unwrap_or_default(), id))
        }
        other => Emoji::new(other.as_data()),
    }
}

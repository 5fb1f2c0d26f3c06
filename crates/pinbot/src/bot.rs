//! Bot lifecycle: gateway connection, dispatch loop, and shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use pinbot_gateway_discord::{DiscordConfig, DiscordGateway};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::dispatch::{Dispatcher, StopReason};
use crate::policy::{PolicyEmoji, ReactionPolicy};

/// Connect to Discord and dispatch reaction events until `cancel` fires.
///
/// Returns once the gateway has stopped and every in-flight event has finished.
pub async fn run(token: &str, config: &Config, cancel: CancellationToken) -> Result<StopReason> {
    let (event_tx, event_rx) = mpsc::channel(config.gateway.event_buffer);

    let gateway = DiscordGateway::connect(&DiscordConfig::new(token), event_tx).await?;

    let policy = ReactionPolicy::new(
        Arc::new(gateway.chat_client()),
        PolicyEmoji::from(&config.emoji),
    );
    let emoji = policy.emoji();
    info!(pin = %emoji.pin, escalate = %emoji.escalate, "Reaction policy configured");

    let dispatcher = Dispatcher::new(policy);
    let dispatch_cancel = cancel.clone();
    let dispatch_handle =
        tokio::spawn(async move { dispatcher.run(event_rx, dispatch_cancel).await });

    let gateway_result = gateway.run(cancel.clone()).await;

    // The gateway may stop on its own (e.g. invalid token); take the dispatcher down with it
    cancel.cancel();
    let reason = dispatch_handle
        .await
        .context("dispatcher task panicked")?;

    gateway_result?;
    Ok(reason)
}

/// Cancel `cancel` on Ctrl+C or SIGTERM.
pub async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
        _ = cancel.cancelled() => return,
    }

    cancel.cancel();
}

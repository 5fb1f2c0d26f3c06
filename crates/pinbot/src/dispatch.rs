//! Event dispatch loop.
//!
//! Pulls [`GatewayEvent`]s off the gateway channel and runs each reaction event
//! through the [`ReactionPolicy`] on its own task. A failing or panicking event
//! is logged and dropped; it never stops the loop or other in-flight events.

use pinbot_gateway_protocol::{GatewayEvent, ReactionEvent};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::policy::ReactionPolicy;

/// Why the dispatcher stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The cancellation token fired.
    Cancelled,
    /// The gateway reported shutdown.
    GatewayShutdown(String),
    /// Every event sender was dropped.
    ChannelClosed,
}

pub struct Dispatcher {
    policy: ReactionPolicy,
}

impl Dispatcher {
    pub fn new(policy: ReactionPolicy) -> Self {
        Self { policy }
    }

    /// Dispatch events until cancelled, shut down, or the channel closes.
    ///
    /// In-flight events are drained before returning.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<GatewayEvent>,
        cancel: CancellationToken,
    ) -> StopReason {
        let mut in_flight = JoinSet::new();

        let reason = loop {
            tokio::select! {
                _ = cancel.cancelled() => break StopReason::Cancelled,

                Some(result) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_join_result(result);
                }

                event = events.recv() => match event {
                    Some(GatewayEvent::Reaction(event)) => {
                        let policy = self.policy.clone();
                        in_flight.spawn(async move { handle_event(&policy, event).await });
                    }
                    Some(GatewayEvent::Ready { user, user_id }) => {
                        info!(user = %user, user_id, "Connected to gateway");
                    }
                    Some(GatewayEvent::Shutdown { reason }) => {
                        break StopReason::GatewayShutdown(reason);
                    }
                    None => break StopReason::ChannelClosed,
                },
            }
        };

        if !in_flight.is_empty() {
            info!(count = in_flight.len(), "Waiting for in-flight events");
        }
        while let Some(result) = in_flight.join_next().await {
            log_join_result(result);
        }

        info!(reason = ?reason, "Dispatcher stopped");
        reason
    }
}

async fn handle_event(policy: &ReactionPolicy, event: ReactionEvent) {
    debug!(
        kind = %event.kind,
        emoji = %event.emoji,
        message_id = %event.message,
        user_id = ?event.user_id,
        "Reaction event"
    );

    if let Err(e) = policy.handle(&event).await {
        warn!(
            kind = %event.kind,
            emoji = %event.emoji,
            message_id = %event.message,
            error = %e,
            "Failed to handle reaction event"
        );
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Reaction event task panicked");
    }
}

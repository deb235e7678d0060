//! The dispatch loop: drains the event channel and routes events to handlers.

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::{
    base::{
        config::ErrorPolicy,
        error::HandlerError,
        types::{EventReceiver, InboundEvent, Void},
    },
    interaction::{notification, slash_command},
    service::chat::ChatClient,
};

/// Routes inbound events to the slash command and notification handlers.
///
/// Handler failures never terminate the process from here; they are passed
/// through the configured [`ErrorPolicy`], which decides whether the loop
/// keeps going.
#[derive(Clone)]
pub struct Dispatcher {
    chat: ChatClient,
    policy: ErrorPolicy,
}

impl Dispatcher {
    pub fn new(chat: ChatClient, policy: ErrorPolicy) -> Self {
        Self { chat, policy }
    }

    /// Runs until `cancel` fires or the event source closes the channel.
    ///
    /// Cancellation is checked before every receive, so queued events are not
    /// drained once shutdown has been requested.
    #[instrument(name = "Dispatcher::run", skip_all)]
    pub async fn run(&self, mut events: EventReceiver, cancel: CancellationToken) -> Void {
        info!("Dispatch loop is running ...");

        loop {
            let mut envelope = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Shutting down dispatch loop ...");
                    return Ok(());
                }
                envelope = events.recv() => match envelope {
                    Some(envelope) => envelope,
                    None => {
                        info!("Event source closed, stopping dispatch loop ...");
                        return Ok(());
                    }
                },
            };

            // Acknowledge first, so the platform never redelivers what we've seen.
            if !envelope.acknowledge() {
                warn!("Transport stopped waiting for the acknowledgement of a {} event.", envelope.event.kind());
            }

            if let Err(err) = self.dispatch(&envelope.event).await {
                self.supervise(err)?;
            }
        }
    }

    /// Routes a single event to its handler.
    pub async fn dispatch(&self, event: &InboundEvent) -> Result<(), HandlerError> {
        match event {
            InboundEvent::SlashCommand(command) => slash_command::handle_slash_command(command, &self.chat).await,
            InboundEvent::EventsApi(event) => notification::handle_notification(event, &self.chat).await,
            InboundEvent::Unsupported { kind } => {
                warn!("Unknown event type: {}", kind);
                Ok(())
            }
        }
    }

    /// Decides whether a handler failure stops the loop.
    fn supervise(&self, err: HandlerError) -> Void {
        // Seeing the same event again would fail the same way.
        if !err.is_retryable() {
            warn!("Skipping event: {}", err);
            return Ok(());
        }

        match self.policy {
            ErrorPolicy::Continue => {
                error!("Error while handling: {:#}", err);
                Ok(())
            }
            ErrorPolicy::Exit => {
                error!("Error while handling, stopping dispatch loop: {:#}", err);
                Err(err.into())
            }
        }
    }
}

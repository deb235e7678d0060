//! Runtime services and shared state for the calm-bot.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction::dispatch::Dispatcher,
    service::chat::ChatClient,
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the chat client and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The chat client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the slack client.
        let chat = ChatClient::slack(&config).await?;

        Ok(Self { config, chat })
    }

    /// Runs until Ctrl-C, or until either the transport or the dispatch loop stops.
    pub async fn start(&self) -> Void {
        self.start_with(CancellationToken::new()).await
    }

    /// Same as [`Runtime::start`], but stops when `cancel` fires instead of waiting for Ctrl-C.
    #[instrument(skip_all)]
    pub async fn start_with(&self, cancel: CancellationToken) -> Void {
        // A hand-built config may never have been through `Config::load`.
        self.config.validate()?;

        let (events_tx, events_rx) = mpsc::channel(self.config.event_buffer_size);

        // Start the transport.

        let chat = self.chat.clone();
        let transport_cancel = cancel.clone();
        let transport = tokio::spawn(async move { chat.start(events_tx, transport_cancel).await });

        // Cancel everything on Ctrl-C.

        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = signal_cancel.cancelled() => {}
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => {
                        info!("Received Ctrl-C ...");
                        signal_cancel.cancel();
                    }
                    Err(err) => warn!("Failed to listen for Ctrl-C: {}", err),
                },
            }
        });

        // Start the dispatch loop.

        let dispatcher = Dispatcher::new(self.chat.clone(), self.config.on_handler_error);
        let dispatch_cancel = cancel.clone();
        let dispatch = tokio::spawn(async move { dispatcher.run(events_rx, dispatch_cancel).await });

        let dispatch_result = dispatch.await;

        // Whatever stopped the loop, the transport goes down with it.
        cancel.cancel();
        let transport_result = transport.await;

        dispatch_result??;
        transport_result??;

        info!("Runtime stopped.");

        Ok(())
    }
}

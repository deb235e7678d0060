//! Library root for `calm-bot`.
//!
//! Calm-bot is a minimal Slack app that keeps a socket mode connection open and:
//! - Answers the `/calm` slash command
//! - Greets users who @-mention it
//! - Replies to messages it can see (ignoring anything posted by a bot)
//!
//! Events flow from the Slack socket mode listener through a channel into a
//! single dispatch loop, which acknowledges each one before routing it to a
//! handler. The chat service sits behind a trait so it can be mocked in tests.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use anyhow::anyhow;
use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the calm-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the chat client
/// - Starts the transport and the dispatch loop
pub async fn start(config: Config) -> Void {
    info!("Starting calm-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider().install_default().map_err(|_| anyhow!("Failed to install the default crypto provider"))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}

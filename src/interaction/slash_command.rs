//! Replies to the app's slash commands.

use anyhow::Context;
use tracing::{debug, info, instrument};

use crate::{
    base::{
        error::HandlerError,
        types::{OutboundReply, SlashCommand},
    },
    service::chat::ChatClient,
};

/// The only command the bot answers.
pub const CALM_COMMAND: &str = "/calm";

/// Handles a slash command.
///
/// Unknown commands are ignored without an error.
#[instrument(skip_all, fields(command = %command.command, channel = %command.channel))]
pub async fn handle_slash_command(command: &SlashCommand, chat: &ChatClient) -> Result<(), HandlerError> {
    if command.command != CALM_COMMAND {
        debug!("Ignoring unknown command.");
        return Ok(());
    }

    info!("Calming down ...");

    let reply = OutboundReply::markdown(&command.channel, format!("Thanks <@{}>. I feel better now!", command.user));
    chat.send_message(&reply).await.context("failed to post message")?;

    Ok(())
}

//! Replies to Events API notifications (mentions and messages).

use anyhow::Context;
use tracing::{debug, info, instrument};

use crate::{
    base::{
        error::HandlerError,
        types::{ApiEvent, CallbackEvent, MentionEvent, MessageEvent, OutboundReply},
    },
    service::chat::ChatClient,
};

/// The canned reply to any message the bot can see.
pub const MESSAGE_REPLY: &str = "Haha, yeah...";

/// Handles a top-level Events API event.
///
/// Only `event_callback` payloads are supported; anything else is reported as
/// an unsupported event type and nothing is sent.
#[instrument(skip_all, fields(kind = event.kind()))]
pub async fn handle_notification(event: &ApiEvent, chat: &ChatClient) -> Result<(), HandlerError> {
    let ApiEvent::Callback(inner) = event else {
        return Err(HandlerError::UnsupportedEventType(event.kind().to_string()));
    };

    match inner {
        CallbackEvent::Mention(mention) => handle_mention(mention, chat).await,
        CallbackEvent::Message(message) => handle_message(message, chat).await,
        CallbackEvent::Unhandled => {
            debug!("No action for this callback event.");
            Ok(())
        }
    }
}

#[instrument(skip_all, fields(channel = %mention.channel))]
async fn handle_mention(mention: &MentionEvent, chat: &ChatClient) -> Result<(), HandlerError> {
    info!("Greeting mentioning user ...");

    let reply = OutboundReply::plain(&mention.channel, format!("Hi <@{}>!", mention.user));
    chat.send_message(&reply).await.context("failed to post message")?;

    Ok(())
}

#[instrument(skip_all, fields(channel = %message.channel))]
async fn handle_message(message: &MessageEvent, chat: &ChatClient) -> Result<(), HandlerError> {
    // Our own replies come back as message events too.
    if message.is_bot_authored() {
        debug!("Skipping message posted by a bot.");
        return Ok(());
    }

    info!("Replying to message ...");

    let reply = OutboundReply::plain(&message.channel, MESSAGE_REPLY);
    chat.send_message(&reply).await.context("failed to post message")?;

    Ok(())
}

//! Slack implementation of the chat service.
//!
//! Inbound events arrive through slack-morphism's socket mode listener. Each
//! callback is converted into an [`InboundEvent`], forwarded to the dispatch
//! loop, and held until the dispatch loop acknowledges it; slack-morphism
//! acknowledges the socket envelope when the callback returns.

use crate::base::{
    config::Config,
    types::{ApiEvent, CallbackEvent, Envelope, EventSender, InboundEvent, MentionEvent, MessageEvent, OutboundReply, Res, SlashCommand, Void},
};
use anyhow::anyhow;
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use std::sync::Arc;

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config) -> Res<Self> {
        let client = SlackChatClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    events: EventSender,
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    app_token: SlackApiToken,
    bot_token: SlackApiToken,
    client: Arc<FullClient>,
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Verify the bot token before going any further.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await.map_err(|e| anyhow!("Failed to authenticate the bot token: {}", e))?;

        info!("Slack bot user ID: {}", bot_user.user_id.0);

        Ok(Self { app_token, bot_token, client })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    async fn start(&self, events: EventSender, cancel: CancellationToken) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState { events }));

        let socket_mode_listener = SlackClientSocketModeListener::new(&SlackClientSocketModeConfig::new(), listener_environment, socket_mode_callbacks);

        // Register the app token and open the WS connections.

        socket_mode_listener.listen_for(&self.app_token).await?;
        socket_mode_listener.start().await;

        info!("Socket mode listener is running ...");

        cancel.cancelled().await;

        info!("Shutting down socket mode listener ...");
        socket_mode_listener.shutdown().await;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn send_message(&self, reply: &OutboundReply) -> Void {
        let mut message = SlackMessageContent::new().with_text(reply.text.clone());

        if reply.markdown {
            let section = SlackSectionBlock::new().with_text(SlackBlockText::MarkDown(SlackBlockMarkDownText::new(reply.text.clone())));
            message = message.with_blocks(vec![SlackBlock::Section(section)]);
        }

        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(reply.channel.clone()), message);

        let session = self.client.open_session(&self.bot_token);

        let response = session.chat_post_message(&request).await.map_err(|e| anyhow!("Failed to send message: {}", e))?;

        debug!("Posted message {:?} to {}", response.ts, reply.channel);

        Ok(())
    }
}

// Conversions into the domain model.

fn slash_command(event: &SlackCommandEvent) -> SlashCommand {
    SlashCommand {
        command: event.command.0.clone(),
        user: event.user_id.0.clone(),
        channel: event.channel_id.0.clone(),
    }
}

fn callback_event(body: SlackEventCallbackBody) -> Res<CallbackEvent> {
    let event = match body {
        SlackEventCallbackBody::AppMention(mention) => CallbackEvent::Mention(MentionEvent {
            user: mention.user.0,
            channel: mention.channel.0,
        }),
        SlackEventCallbackBody::Message(message) => CallbackEvent::Message(MessageEvent {
            channel: message.origin.channel.ok_or(anyhow!("Message event has no channel"))?.0,
            user: message.sender.user.map(|u| u.0),
            bot_id: message.sender.bot_id.map(|b| b.0),
        }),
        _ => CallbackEvent::Unhandled,
    };

    Ok(event)
}

/// Hands an event to the dispatch loop and waits for its acknowledgement.
async fn forward(states: &SlackClientEventsUserState, event: InboundEvent) -> Void {
    let events = {
        let states = states.read().await;
        let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow!("Failed to get user state"))?;
        user_state.events.clone()
    };

    let (envelope, acked) = Envelope::new(event);

    events.send(envelope).await.map_err(|_| anyhow!("Dispatch loop is no longer receiving events"))?;
    acked.await.map_err(|_| anyhow!("Event was dropped before it was acknowledged"))?;

    Ok(())
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
#[instrument(skip_all)]
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    info!("Received command event ...");

    forward(&states, InboundEvent::SlashCommand(slash_command(&event))).await?;

    // The reply is posted separately, so the acknowledgement carries no content.
    Ok(SlackCommandEventResponse::new(SlackMessageContent::new()))
}

/// Handles interaction events from Slack.
#[instrument(skip_all)]
async fn handle_interaction_event(_event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Received interaction event ...");

    forward(&states, InboundEvent::Unsupported { kind: "interactive".to_string() }).await?;

    Ok(())
}

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Received push event ...");

    let event = match callback_event(event_callback.event) {
        Ok(event) => event,
        Err(err) => {
            // Returning normally still acknowledges the envelope, so it will not be redelivered.
            warn!("Could not decode push event: {}", err);
            return Ok(());
        }
    };

    forward(&states, InboundEvent::EventsApi(ApiEvent::Callback(event))).await?;

    Ok(())
}

// Tests.

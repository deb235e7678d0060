use tokio::sync::{mpsc, oneshot};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// Sending half of the event channel, owned by the transport.
pub type EventSender = mpsc::Sender<Envelope>;
/// Receiving half of the event channel, owned by the dispatch loop.
pub type EventReceiver = mpsc::Receiver<Envelope>;

// Inbound events.

/// An event delivered by the socket mode connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A user invoked one of the app's slash commands.
    SlashCommand(SlashCommand),
    /// An Events API payload.
    EventsApi(ApiEvent),
    /// Any other envelope kind (e.g., interactive payloads).
    Unsupported { kind: String },
}

impl InboundEvent {
    pub fn kind(&self) -> &str {
        match self {
            InboundEvent::SlashCommand(_) => "slash_commands",
            InboundEvent::EventsApi(_) => "events_api",
            InboundEvent::Unsupported { kind } => kind.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashCommand {
    /// The command name, including the leading `/`.
    pub command: String,
    /// The invoking user.
    pub user: String,
    /// The channel the command was invoked from.
    pub channel: String,
}

/// Top-level Events API payload kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiEvent {
    Callback(CallbackEvent),
    /// Only delivered over HTTP; socket mode never forwards it.
    AppRateLimited { minute_rate_limited: u64 },
    /// Only delivered over HTTP; socket mode never forwards it.
    UrlVerification { challenge: String },
}

impl ApiEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiEvent::Callback(_) => "event_callback",
            ApiEvent::AppRateLimited { .. } => "app_rate_limited",
            ApiEvent::UrlVerification { .. } => "url_verification",
        }
    }
}

/// The inner event of an `event_callback` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackEvent {
    Mention(MentionEvent),
    Message(MessageEvent),
    /// Subscribed, but not acted upon.
    Unhandled,
}

/// Someone `@`-mentioned the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionEvent {
    pub user: String,
    pub channel: String,
}

/// A message was posted in a channel or DM the bot is part of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub user: Option<String>,
    pub channel: String,
    pub bot_id: Option<String>,
}

impl MessageEvent {
    /// Whether the message was posted by any bot (including this one).
    pub fn is_bot_authored(&self) -> bool {
        self.bot_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

// Envelopes.

/// An inbound event paired with its acknowledgement handle.
///
/// The transport holds the socket envelope open until [`Envelope::acknowledge`]
/// is called (or the envelope is dropped), so every envelope must be
/// acknowledged exactly once to avoid redelivery.
#[derive(Debug)]
pub struct Envelope {
    pub event: InboundEvent,
    ack: Option<oneshot::Sender<()>>,
}

impl Envelope {
    /// Creates a new envelope, returning the receiver that resolves once it is acknowledged.
    pub fn new(event: InboundEvent) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();

        (Self { event, ack: Some(tx) }, rx)
    }

    /// Acknowledges receipt. Subsequent calls are no-ops.
    ///
    /// Returns `false` if the transport stopped waiting for the acknowledgement.
    pub fn acknowledge(&mut self) -> bool {
        match self.ack.take() {
            Some(ack) => ack.send(()).is_ok(),
            None => true,
        }
    }
}

// Outbound replies.

/// A message the bot posts back to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub channel: String,
    pub text: String,
    /// Render the text as mrkdwn rather than plain text.
    pub markdown: bool,
}

impl OutboundReply {
    pub fn plain(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            markdown: false,
        }
    }

    pub fn markdown(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            markdown: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_marker_must_be_non_empty() {
        let mut message = MessageEvent {
            user: Some("U1".to_string()),
            channel: "C1".to_string(),
            bot_id: None,
        };
        assert!(!message.is_bot_authored());

        message.bot_id = Some(String::new());
        assert!(!message.is_bot_authored());

        message.bot_id = Some("B1".to_string());
        assert!(message.is_bot_authored());
    }

    #[tokio::test]
    async fn acknowledge_is_idempotent() {
        let (mut envelope, acked) = Envelope::new(InboundEvent::Unsupported { kind: "interactive".to_string() });

        assert!(envelope.acknowledge());
        assert!(envelope.acknowledge());

        assert!(acked.await.is_ok());
    }

    #[test]
    fn acknowledge_reports_dropped_transport() {
        let (mut envelope, acked) = Envelope::new(InboundEvent::Unsupported { kind: "interactive".to_string() });
        drop(acked);

        assert!(!envelope.acknowledge());
    }
}

pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::base::types::{EventSender, OutboundReply, Void};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// A chat client is both the event source (it owns the long-lived connection
/// to the platform) and the transport used to post replies.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Start the chat client listener.
    ///
    /// Every inbound event is forwarded to `events` as an envelope, and the
    /// platform is only acknowledged once the envelope is. Runs until `cancel`
    /// fires or the connection cannot be established.
    async fn start(&self, events: EventSender, cancel: CancellationToken) -> Void;

    /// Post a reply to a channel.
    async fn send_message(&self, reply: &OutboundReply) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}

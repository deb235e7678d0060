#![cfg(test)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use calm_bot::{
    base::{
        config::{Config, ConfigInner, ErrorPolicy},
        types::{ApiEvent, CallbackEvent, Envelope, EventSender, InboundEvent, MentionEvent, MessageEvent, OutboundReply, SlashCommand, Void},
    },
    interaction::dispatch::Dispatcher,
    runtime::Runtime,
    service::chat::{ChatClient, GenericChatClient},
};
use mockall::{mock, predicate::eq};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

// Mocks.

// Mock chat client for testing.

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        async fn start(&self, events: EventSender, cancel: CancellationToken) -> Void;
        async fn send_message(&self, reply: &OutboundReply) -> Void;
    }
}

// Helpers.

fn test_config(policy: ErrorPolicy) -> Config {
    Config {
        inner: Arc::new(ConfigInner {
            slack_app_token: "xapp-test".to_string(),
            slack_bot_token: "xoxb-test".to_string(),
            on_handler_error: policy,
            event_buffer_size: 8,
        }),
    }
}

fn calm(user: &str, channel: &str) -> InboundEvent {
    InboundEvent::SlashCommand(SlashCommand {
        command: "/calm".to_string(),
        user: user.to_string(),
        channel: channel.to_string(),
    })
}

fn message(channel: &str, bot_id: &str) -> InboundEvent {
    InboundEvent::EventsApi(ApiEvent::Callback(CallbackEvent::Message(MessageEvent {
        user: Some("U1".to_string()),
        channel: channel.to_string(),
        bot_id: Some(bot_id.to_string()),
    })))
}

fn mention(user: &str, channel: &str) -> InboundEvent {
    InboundEvent::EventsApi(ApiEvent::Callback(CallbackEvent::Mention(MentionEvent {
        user: user.to_string(),
        channel: channel.to_string(),
    })))
}

/// Queues the events on a closed channel, returning the receiver and the acknowledgement receivers.
async fn queue(events: Vec<InboundEvent>) -> (mpsc::Receiver<Envelope>, Vec<oneshot::Receiver<()>>) {
    let (tx, rx) = mpsc::channel(events.len().max(1));
    let mut acks = Vec::new();

    for event in events {
        let (envelope, acked) = Envelope::new(event);
        tx.send(envelope).await.unwrap();
        acks.push(acked);
    }

    (rx, acks)
}

/// Records every reply the bot sends.
fn recording_chat() -> (MockChat, Arc<Mutex<Vec<OutboundReply>>>) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let mut mock = MockChat::new();

    let recorder = sent.clone();
    mock.expect_send_message().returning(move |reply| {
        recorder.lock().unwrap().push(reply.clone());
        Ok(())
    });

    (mock, sent)
}

// Tests.

#[tokio::test]
async fn test_scenarios_in_delivery_order() {
    let (mock, sent) = recording_chat();
    let dispatcher = Dispatcher::new(ChatClient::new(Arc::new(mock)), ErrorPolicy::Continue);

    let (rx, acks) = queue(vec![
        calm("alice", "C1"),
        message("C2", ""),
        message("C2", "B1"),
        mention("U7", "C3"),
        InboundEvent::SlashCommand(SlashCommand {
            command: "/other".to_string(),
            user: "bob".to_string(),
            channel: "C1".to_string(),
        }),
        InboundEvent::EventsApi(ApiEvent::UrlVerification { challenge: "xyz".to_string() }),
        InboundEvent::Unsupported { kind: "interactive".to_string() },
    ])
    .await;

    dispatcher.run(rx, CancellationToken::new()).await.unwrap();

    let sent = sent.lock().unwrap().clone();
    assert_eq!(
        sent,
        vec![
            OutboundReply::markdown("C1", "Thanks <@alice>. I feel better now!"),
            OutboundReply::plain("C2", "Haha, yeah..."),
            OutboundReply::plain("C3", "Hi <@U7>!"),
        ]
    );

    // Every envelope is acknowledged, whether or not it produced a reply.
    for acked in acks {
        assert!(acked.await.is_ok());
    }
}

#[tokio::test]
async fn test_acknowledges_before_handling() {
    let pending: Arc<Mutex<Option<oneshot::Receiver<()>>>> = Arc::new(Mutex::new(None));

    let mut mock = MockChat::new();
    let observed = pending.clone();
    mock.expect_send_message().times(1).returning(move |_| {
        let mut acked = observed.lock().unwrap().take().unwrap();

        // The envelope must already be acknowledged by the time we post.
        assert!(acked.try_recv().is_ok());
        Ok(())
    });

    let dispatcher = Dispatcher::new(ChatClient::new(Arc::new(mock)), ErrorPolicy::Continue);

    let (rx, mut acks) = queue(vec![calm("alice", "C1")]).await;
    *pending.lock().unwrap() = Some(acks.remove(0));

    dispatcher.run(rx, CancellationToken::new()).await.unwrap();
}

#[tokio::test]
async fn test_cancelled_loop_handles_nothing() {
    let mut mock = MockChat::new();
    mock.expect_send_message().never();

    let dispatcher = Dispatcher::new(ChatClient::new(Arc::new(mock)), ErrorPolicy::Continue);

    // Keep the sender alive so only cancellation can stop the loop.
    let (tx, rx) = mpsc::channel(4);
    tx.send(Envelope::new(calm("alice", "C1")).0).await.unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();

    dispatcher.run(rx, cancel).await.unwrap();
    drop(tx);
}

#[tokio::test]
async fn test_cancellation_wakes_idle_loop() {
    let mut mock = MockChat::new();
    mock.expect_send_message().never();

    let dispatcher = Dispatcher::new(ChatClient::new(Arc::new(mock)), ErrorPolicy::Continue);

    let (_tx, rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();

    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { dispatcher.run(rx, cancel).await }
    });

    cancel.cancel();

    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_continue_policy_keeps_draining_after_send_failure() {
    let mut mock = MockChat::new();
    mock.expect_send_message()
        .with(eq(OutboundReply::markdown("C1", "Thanks <@alice>. I feel better now!")))
        .times(1)
        .returning(|_| Err(anyhow::anyhow!("channel_not_found")));
    mock.expect_send_message()
        .with(eq(OutboundReply::plain("C2", "Haha, yeah...")))
        .times(1)
        .returning(|_| Ok(()));

    let dispatcher = Dispatcher::new(ChatClient::new(Arc::new(mock)), ErrorPolicy::Continue);

    let (rx, _acks) = queue(vec![calm("alice", "C1"), message("C2", "")]).await;

    dispatcher.run(rx, CancellationToken::new()).await.unwrap();
}

#[tokio::test]
async fn test_runtime_routes_transport_events() {
    let (mut mock, sent) = recording_chat();

    mock.expect_start().times(1).returning(|events: EventSender, _cancel: CancellationToken| {
        // Dropping the sender afterwards closes the event source.
        events.try_send(Envelope::new(calm("alice", "C1")).0).unwrap();
        events.try_send(Envelope::new(message("C2", "B1")).0).unwrap();
        Ok(())
    });

    let runtime = Runtime {
        config: test_config(ErrorPolicy::Continue),
        chat: ChatClient::new(Arc::new(mock)),
    };

    runtime.start_with(CancellationToken::new()).await.unwrap();

    assert_eq!(*sent.lock().unwrap(), vec![OutboundReply::markdown("C1", "Thanks <@alice>. I feel better now!")]);
}

#[tokio::test]
async fn test_runtime_surfaces_send_failure_under_exit_policy() {
    let mut mock = MockChat::new();

    mock.expect_start().times(1).returning(|events: EventSender, _cancel: CancellationToken| {
        events.try_send(Envelope::new(message("C2", "")).0).unwrap();
        Ok(())
    });
    mock.expect_send_message().times(1).returning(|_| Err(anyhow::anyhow!("invalid_auth")));

    let runtime = Runtime {
        config: test_config(ErrorPolicy::Exit),
        chat: ChatClient::new(Arc::new(mock)),
    };

    let err = runtime.start_with(CancellationToken::new()).await.unwrap_err();

    assert!(format!("{err:#}").contains("invalid_auth"));
}

#[tokio::test]
async fn test_runtime_surfaces_transport_failure() {
    let mut mock = MockChat::new();

    mock.expect_start().times(1).returning(|_, _| Err(anyhow::anyhow!("socket mode connection failed")));
    mock.expect_send_message().never();

    let runtime = Runtime {
        config: test_config(ErrorPolicy::Continue),
        chat: ChatClient::new(Arc::new(mock)),
    };

    let err = runtime.start_with(CancellationToken::new()).await.unwrap_err();

    assert!(err.to_string().contains("socket mode connection failed"));
}

#[tokio::test]
async fn test_runtime_rejects_empty_event_buffer() {
    let mut mock = MockChat::new();
    mock.expect_start().never();
    mock.expect_send_message().never();

    let runtime = Runtime {
        config: Config {
            inner: Arc::new(ConfigInner {
                event_buffer_size: 0,
                ..(*test_config(ErrorPolicy::Continue).inner).clone()
            }),
        },
        chat: ChatClient::new(Arc::new(mock)),
    };

    let err = runtime.start_with(CancellationToken::new()).await.unwrap_err();

    assert!(err.to_string().contains("buffer"));
}

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    wharf_channels::{Channel, Error},
    wharf_common::OutboundMessage,
    wharf_whatsapp::{
        ClientEvent, ConnectionState, EventHandler, Jid, PairingDisplay, PairingEvent,
        ProtocolBackend, ProtocolClient, TransportMode, WhatsAppChannel, WhatsAppConfig,
        types::{HistorySync, MediaAttachment, MessageEvent, MessageInfo, WaMessage},
    },
};

use common::{RecordingSink, Received, assert_no_message, init_tracing, next_message};

const OWN: &str = "15550000000@s.whatsapp.net";
const ALICE: &str = "15551234567@s.whatsapp.net";

#[derive(Default)]
struct FakeClient {
    own_jid: Option<Jid>,
    handler: Mutex<Option<EventHandler>>,
    pairing: Mutex<Option<mpsc::Receiver<PairingEvent>>>,
    connected: AtomicBool,
    disconnects: AtomicUsize,
    fail_connect: bool,
    reject_sends: bool,
    sent: Mutex<Vec<(Jid, String)>>,
    blobs: HashMap<String, Vec<u8>>,
}

impl FakeClient {
    fn paired() -> Self {
        Self {
            own_jid: Some(OWN.parse().unwrap()),
            ..Default::default()
        }
    }

    fn emit(&self, event: ClientEvent) {
        let handler = self.handler.lock().unwrap().clone().expect("no handler");
        handler(event);
    }
}

#[async_trait]
impl ProtocolClient for FakeClient {
    fn own_jid(&self) -> Option<Jid> {
        self.own_jid.clone()
    }

    fn add_event_handler(&self, handler: EventHandler) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    async fn pairing_channel(&self) -> anyhow::Result<mpsc::Receiver<PairingEvent>> {
        self.pairing
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow::anyhow!("already paired"))
    }

    async fn connect(&self) -> anyhow::Result<()> {
        if self.fail_connect {
            anyhow::bail!("connection refused");
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_text(&self, to: &Jid, text: &str) -> anyhow::Result<()> {
        if self.reject_sends {
            anyhow::bail!("server rejected message");
        }
        self.sent.lock().unwrap().push((to.clone(), text.to_string()));
        Ok(())
    }

    async fn download(&self, attachment: &MediaAttachment) -> anyhow::Result<Vec<u8>> {
        self.blobs
            .get(&attachment.direct_path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("404"))
    }
}

struct FakeBackend {
    client: Arc<FakeClient>,
    opened: Mutex<Vec<PathBuf>>,
}

impl FakeBackend {
    fn new(client: Arc<FakeClient>) -> Arc<Self> {
        Arc::new(Self {
            client,
            opened: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ProtocolBackend for FakeBackend {
    async fn open(&self, store_path: &Path) -> anyhow::Result<Arc<dyn ProtocolClient>> {
        self.opened.lock().unwrap().push(store_path.to_path_buf());
        Ok(self.client.clone())
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    media_dir: PathBuf,
    client: Arc<FakeClient>,
    backend: Arc<FakeBackend>,
    channel: WhatsAppChannel,
    bus: mpsc::UnboundedReceiver<Received>,
    shown_codes: Arc<Mutex<Vec<String>>>,
}

fn harness(client: FakeClient, tweak: impl FnOnce(&mut WhatsAppConfig)) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let media_dir = dir.path().join("media");
    let mut config = WhatsAppConfig {
        enabled: true,
        store_path: dir.path().join("store/whatsapp.db").display().to_string(),
        media_dir: Some(media_dir.clone()),
        ..Default::default()
    };
    tweak(&mut config);

    let client = Arc::new(client);
    let backend = FakeBackend::new(Arc::clone(&client));
    let shown_codes = Arc::new(Mutex::new(Vec::new()));
    let shown = Arc::clone(&shown_codes);
    let display: PairingDisplay = Arc::new(move |code: &str| {
        shown.lock().unwrap().push(code.to_string());
    });

    let (sink, bus) = RecordingSink::new();
    let channel = WhatsAppChannel::builder(config, sink)
        .with_protocol_backend(backend.clone())
        .with_pairing_display(display)
        .build()
        .unwrap();

    Harness {
        _dir: dir,
        media_dir,
        client,
        backend,
        channel,
        bus,
        shown_codes,
    }
}

fn text_event(id: &str, sender: &str, chat: &str, text: &str) -> ClientEvent {
    ClientEvent::Message(Box::new(MessageEvent {
        info: MessageInfo {
            id: id.into(),
            chat: chat.parse().unwrap(),
            sender: sender.parse().unwrap(),
            ..Default::default()
        },
        message: WaMessage {
            conversation: Some(text.into()),
            ..Default::default()
        },
    }))
}

#[tokio::test]
async fn existing_session_connects_and_delivers() {
    init_tracing();
    let mut h = harness(FakeClient::paired(), |_| {});
    assert_eq!(h.channel.mode(), TransportMode::Native);

    h.channel.start(CancellationToken::new()).await.unwrap();
    assert!(h.channel.is_running());
    assert_eq!(h.channel.connection_state(), ConnectionState::Connected);
    assert!(h.shown_codes.lock().unwrap().is_empty());
    assert_eq!(h.backend.opened.lock().unwrap().len(), 1);

    h.client.emit(text_event("m1", ALICE, ALICE, "hello"));
    let received = next_message(&mut h.bus).await.message;
    assert_eq!(received.sender_id, ALICE);
    assert_eq!(received.chat_id, ALICE);
    assert_eq!(received.content, "hello");
    assert_eq!(received.message_id(), Some("m1"));
    assert_eq!(received.metadata["sender_jid"], ALICE);

    h.channel.stop().await.unwrap();
    assert!(!h.channel.is_running());
    assert!(!h.client.is_connected());
}

#[tokio::test]
async fn echoes_broadcasts_and_history_never_reach_the_bus() {
    let mut h = harness(FakeClient::paired(), |_| {});
    h.channel.start(CancellationToken::new()).await.unwrap();

    let ClientEvent::Message(mut from_me) = text_event("e1", ALICE, ALICE, "echo") else {
        unreachable!()
    };
    from_me.info.is_from_me = true;
    h.client.emit(ClientEvent::Message(from_me));
    h.client
        .emit(text_event("e2", "15550000000:7@s.whatsapp.net", ALICE, "other device"));
    h.client
        .emit(text_event("e3", ALICE, "status@broadcast", "status update"));

    let ClientEvent::Message(replayed) = text_event("e4", ALICE, ALICE, "old news") else {
        unreachable!()
    };
    h.client.emit(ClientEvent::HistorySync(HistorySync {
        messages: vec![*replayed],
    }));
    h.client.emit(ClientEvent::Disconnected);
    h.client.emit(ClientEvent::Connected);

    h.client.emit(text_event("m1", ALICE, ALICE, "marker"));
    let received = next_message(&mut h.bus).await.message;
    assert_eq!(received.content, "marker");
    assert_no_message(&mut h.bus, Duration::from_millis(100)).await;
    assert_eq!(h.channel.connection_state(), ConnectionState::Connected);

    h.channel.stop().await.unwrap();
}

#[tokio::test]
async fn media_exists_during_delivery_and_is_removed_after() {
    let client = FakeClient {
        blobs: HashMap::from([
            ("/img".to_string(), b"jpeg".to_vec()),
            ("/doc".to_string(), b"quarterly numbers".to_vec()),
        ]),
        ..FakeClient::paired()
    };
    let mut h = harness(client, |_| {});
    h.channel.start(CancellationToken::new()).await.unwrap();

    h.client.emit(ClientEvent::Message(Box::new(MessageEvent {
        info: MessageInfo {
            id: "m1".into(),
            chat: ALICE.parse().unwrap(),
            sender: ALICE.parse().unwrap(),
            push_name: "Alice".into(),
            ..Default::default()
        },
        message: WaMessage {
            conversation: Some("see attached".into()),
            image: Some(MediaAttachment {
                direct_path: "/img".into(),
                caption: Some("chart".into()),
                ..Default::default()
            }),
            document: Some(MediaAttachment {
                direct_path: "/doc".into(),
                file_name: Some("report".into()),
                ..Default::default()
            }),
            ..Default::default()
        },
    })));

    let received = next_message(&mut h.bus).await;
    assert_eq!(received.message.content, "see attached\nchart");
    assert_eq!(received.media_existed, [true, true]);
    assert_eq!(received.message.metadata["user_name"], "Alice");
    let paths = received.message.media_paths.clone();
    assert!(paths.iter().all(|p| p.starts_with(&h.media_dir)));
    assert_eq!(paths[1].extension().unwrap(), "bin");

    // The dispatcher handles events one at a time, so once the next message
    // arrives the previous handling call has returned.
    h.client.emit(text_event("m2", ALICE, ALICE, "marker"));
    next_message(&mut h.bus).await;
    assert!(paths.iter().all(|p| !p.exists()));

    h.channel.stop().await.unwrap();
}

#[tokio::test]
async fn messages_without_content_are_dropped() {
    let mut h = harness(FakeClient::paired(), |_| {});
    h.channel.start(CancellationToken::new()).await.unwrap();

    h.client.emit(ClientEvent::Message(Box::new(MessageEvent {
        info: MessageInfo {
            id: "reaction".into(),
            chat: ALICE.parse().unwrap(),
            sender: ALICE.parse().unwrap(),
            ..Default::default()
        },
        message: WaMessage::default(),
    })));
    // Attachment that cannot be downloaded and has no caption.
    h.client.emit(ClientEvent::Message(Box::new(MessageEvent {
        info: MessageInfo {
            id: "expired".into(),
            chat: ALICE.parse().unwrap(),
            sender: ALICE.parse().unwrap(),
            ..Default::default()
        },
        message: WaMessage {
            video: Some(MediaAttachment {
                direct_path: "/gone".into(),
                ..Default::default()
            }),
            ..Default::default()
        },
    })));
    h.client.emit(text_event("m1", ALICE, ALICE, "marker"));

    assert_eq!(next_message(&mut h.bus).await.message.message_id(), Some("m1"));
    assert_no_message(&mut h.bus, Duration::from_millis(100)).await;
    h.channel.stop().await.unwrap();
}

#[tokio::test]
async fn allowlist_filters_native_senders() {
    let mut h = harness(FakeClient::paired(), |c| {
        c.allow_from = vec!["+15551234567".into()];
    });
    h.channel.start(CancellationToken::new()).await.unwrap();

    h.client
        .emit(text_event("x", "4420000000@s.whatsapp.net", "4420000000@s.whatsapp.net", "hi"));
    h.client.emit(text_event("y", ALICE, ALICE, "hi"));

    assert_eq!(next_message(&mut h.bus).await.message.sender_id, ALICE);
    assert_no_message(&mut h.bus, Duration::from_millis(100)).await;
    h.channel.stop().await.unwrap();
}

#[tokio::test]
async fn pairing_shows_codes_until_success() {
    let (tx, rx) = mpsc::channel(4);
    tx.send(PairingEvent::Code("2@first".into())).await.unwrap();
    tx.send(PairingEvent::Code("2@second".into())).await.unwrap();
    tx.send(PairingEvent::Success).await.unwrap();
    let client = FakeClient {
        pairing: Mutex::new(Some(rx)),
        ..Default::default()
    };
    let h = harness(client, |_| {});

    h.channel.start(CancellationToken::new()).await.unwrap();
    assert_eq!(*h.shown_codes.lock().unwrap(), ["2@first", "2@second"]);
    assert!(h.channel.is_running());
    assert_eq!(h.channel.connection_state(), ConnectionState::Connected);
    h.channel.stop().await.unwrap();
}

#[tokio::test]
async fn pairing_times_out() {
    let (tx, rx) = mpsc::channel(4);
    tx.send(PairingEvent::Code("2@unscanned".into())).await.unwrap();
    let client = FakeClient {
        pairing: Mutex::new(Some(rx)),
        ..Default::default()
    };
    let h = harness(client, |c| c.pairing_timeout_secs = 1);

    let err = h.channel.start(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "{err}");
    assert!(!h.channel.is_running());
    assert!(!h.client.is_connected());
    assert_eq!(h.shown_codes.lock().unwrap().len(), 1);
    drop(tx);
}

#[tokio::test]
async fn connect_failure_is_a_connectivity_error() {
    let client = FakeClient {
        fail_connect: true,
        ..FakeClient::paired()
    };
    let h = harness(client, |_| {});
    let err = h.channel.start(CancellationToken::new()).await.unwrap_err();
    assert!(err.is_connectivity(), "{err}");
    assert!(!h.channel.is_running());
    assert_eq!(h.channel.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn logged_out_marks_channel_not_running() {
    let mut h = harness(FakeClient::paired(), |_| {});
    h.channel.start(CancellationToken::new()).await.unwrap();

    h.client.emit(ClientEvent::LoggedOut {
        reason: "device removed".into(),
    });
    h.client.emit(ClientEvent::Connected);
    h.client.emit(text_event("m1", ALICE, ALICE, "marker"));
    next_message(&mut h.bus).await;

    assert!(!h.channel.is_running());
    assert_eq!(h.channel.connection_state(), ConnectionState::LoggedOut);

    // The client may still report a live socket; the revoked session wins.
    assert!(h.client.is_connected());
    let err = h
        .channel
        .send(&OutboundMessage::new("whatsapp", ALICE, "hello?"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::LoggedOut { .. }), "{err}");

    h.channel.stop().await.unwrap();
    assert_eq!(h.channel.connection_state(), ConnectionState::LoggedOut);

    let err = h.channel.start(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::LoggedOut { .. }), "{err}");
    assert!(!h.channel.is_running());
    assert_eq!(h.backend.opened.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn restart_disconnects_the_previous_client() {
    let mut h = harness(FakeClient::paired(), |_| {});
    h.channel.start(CancellationToken::new()).await.unwrap();
    h.channel.start(CancellationToken::new()).await.unwrap();

    assert_eq!(h.backend.opened.lock().unwrap().len(), 2);
    assert_eq!(h.client.disconnects.load(Ordering::SeqCst), 1);
    assert!(h.client.is_connected());
    assert_eq!(h.channel.connection_state(), ConnectionState::Connected);

    // Only the new dispatcher is listening.
    h.client.emit(text_event("m1", ALICE, ALICE, "once"));
    assert_eq!(next_message(&mut h.bus).await.message.content, "once");
    assert_no_message(&mut h.bus, Duration::from_millis(100)).await;

    h.channel.stop().await.unwrap();
    assert_eq!(h.client.disconnects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn send_paths() {
    let h = harness(FakeClient::paired(), |_| {});
    let reply = OutboundMessage::new("whatsapp", ALICE, "on my way");

    let err = h.channel.send(&reply).await.unwrap_err();
    assert!(err.is_connectivity());

    h.channel.start(CancellationToken::new()).await.unwrap();
    h.channel.send(&reply).await.unwrap();
    assert_eq!(
        *h.client.sent.lock().unwrap(),
        [(ALICE.parse::<Jid>().unwrap(), "on my way".to_string())]
    );

    let err = h
        .channel
        .send(&OutboundMessage::new("whatsapp", "not-an-address", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidAddress { .. }), "{err}");

    h.channel.stop().await.unwrap();
    assert!(h.channel.send(&reply).await.unwrap_err().is_connectivity());
}

#[tokio::test]
async fn rejected_send_is_a_delivery_error() {
    let client = FakeClient {
        reject_sends: true,
        ..FakeClient::paired()
    };
    let h = harness(client, |_| {});
    h.channel.start(CancellationToken::new()).await.unwrap();
    let err = h
        .channel
        .send(&OutboundMessage::new("whatsapp", ALICE, "hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Delivery { .. }), "{err}");
    h.channel.stop().await.unwrap();
}

#[test]
fn native_mode_requires_a_backend() {
    let (sink, _bus) = RecordingSink::new();
    let result = WhatsAppChannel::builder(WhatsAppConfig::default(), sink).build();
    assert!(matches!(result, Err(Error::InvalidConfig { .. })));
}

#[test]
fn bridge_url_selects_bridge_even_with_a_backend() {
    let (sink, _bus) = RecordingSink::new();
    let config = WhatsAppConfig {
        bridge_url: "ws://127.0.0.1:3001".into(),
        ..Default::default()
    };
    let channel = WhatsAppChannel::builder(config, sink)
        .with_protocol_backend(FakeBackend::new(Arc::new(FakeClient::paired())))
        .build()
        .unwrap();
    assert_eq!(channel.mode(), TransportMode::Bridge);
    assert_eq!(channel.connection_state(), ConnectionState::Disconnected);
}

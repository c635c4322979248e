use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
        Arc,
    },
    time::Duration,
};

use futures_util::{SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::{
    runtime::Handle,
    sync::{mpsc, watch},
    time::{self, Instant},
};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

use crate::{
    backend::{
        stomp::{self, Chunk, Frame, StompError},
        wire,
    },
    domain::{
        events::ConnectivityStatus,
        message::{MessageId, OutgoingMessage},
        user::UserId,
    },
    infra::config::{BackendConfig, RealtimeConfig},
    usecases::{
        contracts::{ChannelError, LinkId, RealtimeChannel},
        events::{AppEvent, SessionEvent},
    },
};

const SUBSCRIPTION_ID: &str = "sub-0";
const SEND_DESTINATION: &str = "/app/chat.send";

const REALTIME_STARTED: &str = "REALTIME_STARTED";
const REALTIME_CONNECTED: &str = "REALTIME_CONNECTED";
const REALTIME_CONNECTION_LOST: &str = "REALTIME_CONNECTION_LOST";
const REALTIME_STOPPED: &str = "REALTIME_STOPPED";
const REALTIME_EVENT_SEND_FAILED: &str = "REALTIME_EVENT_SEND_FAILED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeSettings {
    pub ws_url: String,
    pub reconnect_delay: Duration,
    pub heartbeat: Duration,
    pub handshake_timeout: Duration,
    pub disconnect_notice_after: u32,
}

impl RealtimeSettings {
    pub fn from_config(backend: &BackendConfig, realtime: &RealtimeConfig) -> Self {
        Self {
            ws_url: backend.ws_url.clone(),
            reconnect_delay: Duration::from_millis(realtime.reconnect_delay_ms),
            heartbeat: Duration::from_millis(realtime.heartbeat_ms),
            handshake_timeout: Duration::from_millis(realtime.handshake_timeout_ms),
            disconnect_notice_after: realtime.disconnect_notice_after,
        }
    }
}

#[derive(Debug, Error)]
enum TransportError {
    #[error("websocket handshake failed: {0}")]
    Handshake(String),
    #[error("timed out waiting for the broker")]
    Timeout,
    #[error("connection closed by the broker")]
    Closed,
    #[error("no heart-beat from the broker for {0:?}")]
    HeartbeatLost(Duration),
    #[error("broker sent an ERROR frame: {0}")]
    Broker(String),
    #[error("malformed STOMP frame: {0}")]
    Protocol(#[from] StompError),
    #[error("websocket failure: {0}")]
    Socket(#[from] WsError),
}

/// A SEND frame together with the optimistic entry it confirms.
#[derive(Debug)]
struct Outbound {
    pending_id: MessageId,
    frame: String,
}

#[derive(Debug)]
struct Link {
    stop_tx: watch::Sender<bool>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    connected: Arc<AtomicBool>,
}

/// STOMP-over-WebSocket push channel with automatic reconnect.
///
/// Status changes and pushes are posted to the UI loop as `AppEvent`s.
pub struct StompChannel {
    runtime: Handle,
    settings: RealtimeSettings,
    access_token: String,
    events: Sender<AppEvent>,
    link: Option<Link>,
    last_link_id: LinkId,
}

impl StompChannel {
    pub fn new(
        runtime: Handle,
        settings: RealtimeSettings,
        access_token: String,
        events: Sender<AppEvent>,
    ) -> Self {
        Self {
            runtime,
            settings,
            access_token,
            events,
            link: None,
            last_link_id: 0,
        }
    }
}

impl RealtimeChannel for StompChannel {
    fn subscribe(&mut self, user_id: UserId) -> Result<LinkId, ChannelError> {
        self.unsubscribe();

        if host_of(&self.settings.ws_url).is_none() {
            return Err(ChannelError::Start(format!(
                "unsupported websocket url: {}",
                self.settings.ws_url
            )));
        }

        self.last_link_id += 1;
        let link_id = self.last_link_id;
        let (stop_tx, stop_rx) = watch::channel(false);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));

        let task = LinkTask {
            settings: self.settings.clone(),
            access_token: self.access_token.clone(),
            user_id,
            link_id,
            events: self.events.clone(),
            connected: Arc::clone(&connected),
        };
        self.runtime.spawn(task.run(outbound_rx, stop_rx));

        tracing::info!(code = REALTIME_STARTED, user_id, link_id, "realtime channel started");
        self.link = Some(Link {
            stop_tx,
            outbound_tx,
            connected,
        });
        Ok(link_id)
    }

    fn publish(&self, pending_id: MessageId, message: &OutgoingMessage) -> Result<(), ChannelError> {
        let link = self.link.as_ref().ok_or(ChannelError::NotConnected)?;
        if !link.connected.load(Ordering::Acquire) {
            return Err(ChannelError::NotConnected);
        }

        let body = serde_json::to_string(message).map_err(|_| ChannelError::Closed)?;
        link.outbound_tx
            .send(Outbound {
                pending_id,
                frame: Frame::send_json(SEND_DESTINATION, body).encode(),
            })
            .map_err(|_| ChannelError::Closed)
    }

    fn unsubscribe(&mut self) {
        if let Some(link) = self.link.take() {
            let _ = link.stop_tx.send(true);
        }
    }
}

impl Drop for StompChannel {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Status reported after `failures` consecutive failed attempts.
fn retry_status(failures: u32, disconnect_notice_after: u32) -> ConnectivityStatus {
    if disconnect_notice_after > 0 && failures >= disconnect_notice_after {
        ConnectivityStatus::Disconnected
    } else {
        ConnectivityStatus::Connecting
    }
}

/// One subscription's background task; lives until stopped or the UI loop is gone.
struct LinkTask {
    settings: RealtimeSettings,
    access_token: String,
    user_id: UserId,
    link_id: LinkId,
    events: Sender<AppEvent>,
    connected: Arc<AtomicBool>,
}

impl LinkTask {
    async fn run(
        self,
        mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        let mut failures: u32 = 0;
        let listening = self.status(ConnectivityStatus::Connecting);

        while listening && !*stop_rx.borrow() {
            let outcome = self.session(&mut outbound_rx, &mut stop_rx).await;
            self.connected.store(false, Ordering::Release);

            let error = match outcome {
                Ok(()) => break,
                Err(error) => error,
            };
            failures = failures.saturating_add(1);
            tracing::warn!(
                code = REALTIME_CONNECTION_LOST,
                link_id = self.link_id,
                attempt = failures,
                error = %error,
                retry_in_ms = u64::try_from(self.settings.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
                "realtime connection failed; retrying"
            );

            // Frames still queued were meant for the dead connection.
            while let Ok(lost) = outbound_rx.try_recv() {
                self.post(SessionEvent::PublishFailed(lost.pending_id));
            }
            if !self.status(retry_status(failures, self.settings.disconnect_notice_after)) {
                break;
            }

            tokio::select! {
                _ = time::sleep(self.settings.reconnect_delay) => {}
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.connected.store(false, Ordering::Release);
        tracing::info!(
            code = REALTIME_STOPPED,
            user_id = self.user_id,
            link_id = self.link_id,
            "realtime channel stopped"
        );
    }

    /// Runs one connection until it fails (`Err`) or a stop is requested (`Ok`).
    async fn session(
        &self,
        outbound_rx: &mut mpsc::UnboundedReceiver<Outbound>,
        stop_rx: &mut watch::Receiver<bool>,
    ) -> Result<(), TransportError> {
        let settings = &self.settings;
        let (socket, _) = time::timeout(
            settings.handshake_timeout,
            tokio_tungstenite::connect_async(settings.ws_url.as_str()),
        )
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(|error| TransportError::Handshake(error.to_string()))?;
        let (mut sink, mut stream) = socket.split();

        let host = host_of(&settings.ws_url).unwrap_or_default();
        sink.send(WsMessage::Text(
            Frame::connect(&host, &self.access_token, settings.heartbeat).encode(),
        ))
        .await?;

        let connected_frame =
            time::timeout(settings.handshake_timeout, await_connected(&mut stream))
                .await
                .map_err(|_| TransportError::Timeout)??;

        let heartbeat =
            stomp::negotiate_heartbeat(settings.heartbeat, connected_frame.header("heart-beat"));
        let destination = format!("/topic/messages/{}", self.user_id);
        sink.send(WsMessage::Text(
            Frame::subscribe(SUBSCRIPTION_ID, &destination).encode(),
        ))
        .await?;

        self.connected.store(true, Ordering::Release);
        tracing::info!(
            code = REALTIME_CONNECTED,
            link_id = self.link_id,
            destination = destination.as_str(),
            send_every_ms = heartbeat.send_every.map(|d| d.as_millis() as u64),
            expect_every_ms = heartbeat.expect_every.map(|d| d.as_millis() as u64),
            "realtime channel subscribed"
        );
        if !self.status(ConnectivityStatus::Connected) {
            return Ok(());
        }

        let idle = Duration::from_secs(3_600);
        let mut send_tick = time::interval(heartbeat.send_every.unwrap_or(idle));
        let mut watchdog_tick = time::interval(heartbeat.expect_every.unwrap_or(idle));
        let mut last_inbound = Instant::now();

        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        let _ = sink.send(WsMessage::Text(Frame::unsubscribe(SUBSCRIPTION_ID).encode())).await;
                        let _ = sink.send(WsMessage::Text(Frame::disconnect().encode())).await;
                        let _ = sink.close().await;
                        return Ok(());
                    }
                }
                outbound = outbound_rx.recv() => {
                    let Some(outbound) = outbound else {
                        return Ok(());
                    };
                    if let Err(error) = sink.send(WsMessage::Text(outbound.frame)).await {
                        self.post(SessionEvent::PublishFailed(outbound.pending_id));
                        return Err(error.into());
                    }
                }
                _ = send_tick.tick(), if heartbeat.send_every.is_some() => {
                    sink.send(WsMessage::Text("\n".to_owned())).await?;
                }
                _ = watchdog_tick.tick(), if heartbeat.expect_every.is_some() => {
                    if let Some(expected) = heartbeat.expect_every {
                        if heartbeat_expired(last_inbound.elapsed(), expected) {
                            return Err(TransportError::HeartbeatLost(last_inbound.elapsed()));
                        }
                    }
                }
                inbound = stream.next() => {
                    let message = inbound.ok_or(TransportError::Closed)??;
                    last_inbound = Instant::now();

                    let Some(text) = message_text(message)? else {
                        continue;
                    };
                    for chunk in stomp::decode(&text)? {
                        let Chunk::Frame(frame) = chunk else {
                            continue;
                        };
                        match frame.command.as_str() {
                            "MESSAGE" => {
                                let push = wire::parse_push(&frame.body);
                                tracing::debug!(
                                    code = "REALTIME_PUSH",
                                    conversation_id = push.conversation_id,
                                    "message pushed"
                                );
                                if !self.post(SessionEvent::MessagePushed(push)) {
                                    return Ok(());
                                }
                            }
                            "ERROR" => return Err(broker_error(&frame)),
                            _ => {}
                        }
                    }
                }
            }
        }
    }

    fn status(&self, status: ConnectivityStatus) -> bool {
        self.post(SessionEvent::ConnectivityChanged {
            link: self.link_id,
            status,
        })
    }

    fn post(&self, event: SessionEvent) -> bool {
        if self.events.send(AppEvent::Session(event)).is_err() {
            tracing::warn!(
                code = REALTIME_EVENT_SEND_FAILED,
                link_id = self.link_id,
                "event loop is gone; stopping realtime channel"
            );
            return false;
        }
        true
    }
}

async fn await_connected<S>(stream: &mut S) -> Result<Frame, TransportError>
where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    while let Some(message) = stream.next().await {
        let Some(text) = message_text(message?)? else {
            continue;
        };
        for chunk in stomp::decode(&text)? {
            match chunk {
                Chunk::Frame(frame) if frame.command == "CONNECTED" => return Ok(frame),
                Chunk::Frame(frame) if frame.command == "ERROR" => return Err(broker_error(&frame)),
                _ => {}
            }
        }
    }
    Err(TransportError::Closed)
}

/// Text payload of a WebSocket message, `None` for control frames.
fn message_text(message: WsMessage) -> Result<Option<String>, TransportError> {
    match message {
        WsMessage::Text(text) => Ok(Some(text)),
        WsMessage::Binary(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        WsMessage::Close(_) => Err(TransportError::Closed),
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => Ok(None),
    }
}

fn broker_error(frame: &Frame) -> TransportError {
    let summary = frame
        .header("message")
        .map(str::to_owned)
        .unwrap_or_else(|| frame.body.chars().take(120).collect());
    TransportError::Broker(summary)
}

/// Silence longer than twice the agreed server interval counts as a dead link.
fn heartbeat_expired(silence: Duration, expected: Duration) -> bool {
    silence > expected.saturating_mul(2)
}

fn host_of(ws_url: &str) -> Option<String> {
    let rest = ws_url
        .strip_prefix("ws://")
        .or_else(|| ws_url.strip_prefix("wss://"))?;
    let authority = rest.split('/').next()?;
    let host = authority.rsplit('@').next()?.split(':').next()?;
    (!host.is_empty()).then(|| host.to_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use tokio::{net::TcpListener, runtime::Runtime};

    use super::*;

    fn settings(ws_url: &str) -> RealtimeSettings {
        RealtimeSettings::from_config(
            &BackendConfig {
                ws_url: ws_url.to_owned(),
                ..BackendConfig::default()
            },
            &RealtimeConfig::default(),
        )
    }

    fn fast_settings(ws_url: &str, heartbeat_ms: u64, reconnect_delay_ms: u64) -> RealtimeSettings {
        RealtimeSettings {
            ws_url: ws_url.to_owned(),
            reconnect_delay: Duration::from_millis(reconnect_delay_ms),
            heartbeat: Duration::from_millis(heartbeat_ms),
            handshake_timeout: Duration::from_secs(2),
            disconnect_notice_after: 2,
        }
    }

    fn runtime() -> Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("runtime should build")
    }

    /// A ws:// url on a local port nobody listens on.
    fn refused_url(runtime: &Runtime) -> String {
        runtime.block_on(async {
            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("listener should bind");
            format!("ws://{}/ws", listener.local_addr().expect("local addr"))
        })
    }

    fn outgoing(content: &str) -> OutgoingMessage {
        OutgoingMessage {
            conversation_id: 1,
            sender_id: 1,
            receiver_id: 2,
            content: content.to_owned(),
        }
    }

    fn next_session_event(events: &mpsc::Receiver<AppEvent>) -> SessionEvent {
        match events
            .recv_timeout(Duration::from_secs(5))
            .expect("event should arrive")
        {
            AppEvent::Session(event) => event,
            other => panic!("unexpected event: {other:?}"),
        }
    }

    fn next_status(events: &mpsc::Receiver<AppEvent>, link: LinkId) -> ConnectivityStatus {
        match next_session_event(events) {
            SessionEvent::ConnectivityChanged { link: from, status } => {
                assert_eq!(from, link);
                status
            }
            other => panic!("expected a status change, got {other:?}"),
        }
    }

    fn next_command(frames: &mpsc::Receiver<String>) -> String {
        frames
            .recv_timeout(Duration::from_secs(5))
            .expect("broker should receive a frame")
    }

    /// Accepts one client, answers CONNECT with `heart_beat`, then reports the
    /// command of every frame it receives. Never sends heart-beats itself.
    async fn serve_one_client(
        listener: TcpListener,
        heart_beat: &'static str,
        frames: mpsc::Sender<String>,
    ) {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(mut socket) = tokio_tungstenite::accept_async(stream).await else {
            return;
        };

        while let Some(Ok(message)) = socket.next().await {
            let WsMessage::Text(text) = message else {
                continue;
            };
            let Ok(chunks) = stomp::decode(&text) else {
                continue;
            };
            for chunk in chunks {
                let Chunk::Frame(frame) = chunk else {
                    continue;
                };
                if frame.command == "CONNECT" {
                    let reply = Frame::new("CONNECTED")
                        .with_header("version", "1.2")
                        .with_header("heart-beat", heart_beat)
                        .encode();
                    if socket.send(WsMessage::Text(reply)).await.is_err() {
                        return;
                    }
                }
                let _ = frames.send(frame.command);
            }
        }
    }

    fn local_broker(runtime: &Runtime, heart_beat: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = runtime
            .block_on(TcpListener::bind("127.0.0.1:0"))
            .expect("listener should bind");
        let url = format!("ws://{}/ws", listener.local_addr().expect("local addr"));
        let (frames_tx, frames_rx) = mpsc::channel();
        runtime.spawn(serve_one_client(listener, heart_beat, frames_tx));
        (url, frames_rx)
    }

    #[test]
    fn host_is_taken_from_ws_url() {
        assert_eq!(host_of("wss://rooms.example.com:443/ws").as_deref(), Some("rooms.example.com"));
        assert_eq!(host_of("ws://localhost:8080/ws").as_deref(), Some("localhost"));
        assert_eq!(host_of("http://localhost/ws"), None);
    }

    #[test]
    fn silence_tolerates_one_missed_heartbeat() {
        let expected = Duration::from_secs(10);

        assert!(!heartbeat_expired(Duration::from_secs(19), expected));
        assert!(heartbeat_expired(Duration::from_secs(21), expected));
    }

    #[test]
    fn retry_status_escalates_once_threshold_is_reached() {
        assert_eq!(retry_status(1, 3), ConnectivityStatus::Connecting);
        assert_eq!(retry_status(3, 3), ConnectivityStatus::Disconnected);
        assert_eq!(retry_status(50, 0), ConnectivityStatus::Connecting);
    }

    #[test]
    fn publish_before_subscribe_is_refused() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime should build");
        let (events_tx, _events_rx) = mpsc::channel();
        let channel = StompChannel::new(
            runtime.handle().clone(),
            settings("ws://localhost:8080/ws"),
            "token".to_owned(),
            events_tx,
        );

        let result = channel.publish(MessageId::Pending(1), &outgoing("hi"));

        assert_eq!(result, Err(ChannelError::NotConnected));
    }

    #[test]
    fn failed_attempts_escalate_to_disconnected_after_fixed_delays() {
        let runtime = runtime();
        let url = refused_url(&runtime);
        let (events_tx, events_rx) = mpsc::channel();
        let mut channel = StompChannel::new(
            runtime.handle().clone(),
            fast_settings(&url, 0, 50),
            "token".to_owned(),
            events_tx,
        );
        let started = std::time::Instant::now();

        let link = channel.subscribe(7).expect("subscribe should start");
        let statuses: Vec<ConnectivityStatus> =
            (0..4).map(|_| next_status(&events_rx, link)).collect();

        assert_eq!(
            statuses,
            vec![
                ConnectivityStatus::Connecting,
                ConnectivityStatus::Connecting,
                ConnectivityStatus::Disconnected,
                ConnectivityStatus::Disconnected,
            ]
        );
        assert!(
            started.elapsed() >= Duration::from_millis(100),
            "two reconnect delays separate three attempts"
        );
        channel.unsubscribe();
    }

    #[test]
    fn stop_unsubscribes_and_disconnects_from_the_broker() {
        let runtime = runtime();
        let (url, frames) = local_broker(&runtime, "0,0");
        let (events_tx, events_rx) = mpsc::channel();
        let mut channel = StompChannel::new(
            runtime.handle().clone(),
            fast_settings(&url, 0, 50),
            "token".to_owned(),
            events_tx,
        );

        let link = channel.subscribe(7).expect("subscribe should start");
        assert_eq!(next_status(&events_rx, link), ConnectivityStatus::Connecting);
        assert_eq!(next_status(&events_rx, link), ConnectivityStatus::Connected);
        channel
            .publish(MessageId::Pending(1), &outgoing("hi"))
            .expect("publish should be queued");
        for expected in ["CONNECT", "SUBSCRIBE", "SEND"] {
            assert_eq!(next_command(&frames), expected);
        }

        channel.unsubscribe();

        assert_eq!(next_command(&frames), "UNSUBSCRIBE");
        assert_eq!(next_command(&frames), "DISCONNECT");
        assert_eq!(
            channel.publish(MessageId::Pending(2), &outgoing("late")),
            Err(ChannelError::NotConnected)
        );
    }

    #[test]
    fn silent_broker_is_reported_before_the_reconnect_delay() {
        let runtime = runtime();
        let (url, frames) = local_broker(&runtime, "50,0");
        let (events_tx, events_rx) = mpsc::channel();
        let mut channel = StompChannel::new(
            runtime.handle().clone(),
            fast_settings(&url, 50, 60_000),
            "token".to_owned(),
            events_tx,
        );

        let link = channel.subscribe(7).expect("subscribe should start");
        assert_eq!(next_status(&events_rx, link), ConnectivityStatus::Connecting);
        assert_eq!(next_status(&events_rx, link), ConnectivityStatus::Connected);
        let connected_at = std::time::Instant::now();
        assert_eq!(next_command(&frames), "CONNECT");
        assert_eq!(next_command(&frames), "SUBSCRIBE");

        // The broker stays open but silent; the watchdog gives up after two intervals.
        assert_eq!(next_status(&events_rx, link), ConnectivityStatus::Connecting);
        assert!(connected_at.elapsed() >= Duration::from_millis(100));
        channel.unsubscribe();
    }

    #[test]
    fn frames_queued_for_a_dead_connection_are_reported_lost() {
        let runtime = runtime();
        let url = refused_url(&runtime);
        let (events_tx, events_rx) = mpsc::channel();
        let (outbound_tx, outbound_rx) = tokio::sync::mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        outbound_tx
            .send(Outbound {
                pending_id: MessageId::Pending(3),
                frame: Frame::send_json(SEND_DESTINATION, "{}".to_owned()).encode(),
            })
            .expect("queue should accept");
        let task = LinkTask {
            settings: fast_settings(&url, 0, 60_000),
            access_token: "token".to_owned(),
            user_id: 7,
            link_id: 1,
            events: events_tx,
            connected: Arc::new(AtomicBool::new(false)),
        };

        runtime.spawn(task.run(outbound_rx, stop_rx));

        assert_eq!(next_status(&events_rx, 1), ConnectivityStatus::Connecting);
        assert_eq!(
            next_session_event(&events_rx),
            SessionEvent::PublishFailed(MessageId::Pending(3))
        );
        assert_eq!(next_status(&events_rx, 1), ConnectivityStatus::Connecting);
        let _ = stop_tx.send(true);
    }

    #[test]
    fn non_websocket_url_fails_to_start() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime should build");
        let (events_tx, _events_rx) = mpsc::channel();
        let mut channel = StompChannel::new(
            runtime.handle().clone(),
            settings("http://localhost:8080/ws"),
            "token".to_owned(),
            events_tx,
        );

        assert!(matches!(channel.subscribe(1), Err(ChannelError::Start(_))));
    }
}

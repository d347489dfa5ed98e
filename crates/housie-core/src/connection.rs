// Round channel: one duplex WebSocket per mounted round view.
//
// The manager opens the channel with the session token as a query parameter,
// runs a background transport loop that turns socket traffic into `WsEvent`s,
// and accepts outbound commands only while the channel is up. There is no
// automatic reconnection; a dropped channel stays down until the user remounts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{round_url, ServerConfig};
use crate::credentials::CredentialProvider;
use crate::error::Surface;
use crate::protocol::{ClientCommand, GameId, RoundId};

/// Buffered events between the transport loop and the controller.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long `close()` waits for the transport loop before aborting it.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Errors and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("no auth token available")]
    Auth,

    #[error("round channel is not connected")]
    NotConnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid channel address: {0}")]
    Address(String),
}

impl ConnectionError {
    pub fn surface(&self) -> Surface {
        match self {
            ConnectionError::Auth => Surface::RedirectToLogin,
            ConnectionError::NotConnected => Surface::Toast,
            ConnectionError::Transport(_) | ConnectionError::Address(_) => {
                Surface::DisconnectedIndicator
            }
        }
    }
}

impl From<tungstenite::Error> for ConnectionError {
    fn from(e: tungstenite::Error) -> Self {
        match e {
            tungstenite::Error::Http(response)
                if matches!(response.status().as_u16(), 401 | 403) =>
            {
                ConnectionError::Auth
            }
            other => ConnectionError::Transport(other.to_string()),
        }
    }
}

/// Lifecycle and traffic of one round channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsEvent {
    Connected,
    /// Always the last event of a connection.
    Disconnected { reason: String },
    /// A raw text frame from the backend.
    Message(String),
}

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// A duplex text channel. Implemented over tungstenite in production and
/// over in-memory queues in tests.
#[async_trait]
pub trait Transport: Send + 'static {
    async fn send(&mut self, message: String) -> Result<(), ConnectionError>;

    /// Next text frame. `None` once the peer has closed the channel.
    async fn recv(&mut self) -> Option<Result<String, ConnectionError>>;

    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// Opens transports for a channel URL.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport;

    async fn connect(&self, url: &Url) -> Result<Self::Transport, ConnectionError>;
}

/// WebSocket transport over `tokio-tungstenite`.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, message: String) -> Result<(), ConnectionError> {
        self.stream.send(Message::Text(message.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, ConnectionError>> {
        next_text_frame(&mut self.stream).await
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Pull the next text payload from a WebSocket message stream.
///
/// Binary, ping and pong frames are skipped. A close frame or the end of the
/// stream yields `None`; a socket error is returned once and ends the stream
/// for the caller.
pub async fn next_text_frame<St>(stream: &mut St) -> Option<Result<String, ConnectionError>>
where
    St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
            Ok(Message::Close(frame)) => {
                info!("Server closed round channel: {:?}", frame);
                return None;
            }
            Err(e) => {
                warn!("Round channel error: {e}");
                return Some(Err(e.into()));
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
    None
}

/// Production connector: plain or TLS WebSocket with a bounded handshake.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    handshake_timeout: Duration,
}

impl TungsteniteConnector {
    pub fn new(handshake_timeout: Duration) -> Self {
        TungsteniteConnector { handshake_timeout }
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    type Transport = WsTransport;

    async fn connect(&self, url: &Url) -> Result<WsTransport, ConnectionError> {
        let handshake = tokio_tungstenite::connect_async(url.as_str());
        let (stream, response) = tokio::time::timeout(self.handshake_timeout, handshake)
            .await
            .map_err(|_| {
                ConnectionError::Transport(format!(
                    "handshake timed out after {}s",
                    self.handshake_timeout.as_secs()
                ))
            })??;
        debug!("Round channel handshake complete: HTTP {}", response.status());
        Ok(WsTransport { stream })
    }
}

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

/// Where the round channel lives.
#[derive(Debug, Clone)]
pub struct ChannelAddress {
    base: Url,
    path_template: String,
}

impl ChannelAddress {
    pub fn new(base: Url, path_template: impl Into<String>) -> Self {
        ChannelAddress {
            base,
            path_template: path_template.into(),
        }
    }

    /// Use `ws_base_url` if configured, else derive it from `api_base_url`.
    pub fn from_config(server: &ServerConfig) -> Result<Self, ConnectionError> {
        let base = match &server.ws_base_url {
            Some(ws) => Url::parse(ws).map_err(|e| ConnectionError::Address(e.to_string()))?,
            None => {
                let api = Url::parse(&server.api_base_url)
                    .map_err(|e| ConnectionError::Address(e.to_string()))?;
                ws_base_from_api(&api)?
            }
        };
        Ok(ChannelAddress::new(base, server.channel_path.clone()))
    }

    /// Channel URL for a round, with the token as the `token` query parameter.
    pub fn channel_url(
        &self,
        game_id: &GameId,
        round_id: &RoundId,
        token: &str,
    ) -> Result<Url, ConnectionError> {
        let mut url = round_url(&self.base, &self.path_template, game_id, round_id)
            .map_err(|e| ConnectionError::Address(e.to_string()))?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }
}

/// `http` becomes `ws` and `https` becomes `wss`.
pub fn ws_base_from_api(api: &Url) -> Result<Url, ConnectionError> {
    let scheme = match api.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" | "wss" => return Ok(api.clone()),
        other => {
            return Err(ConnectionError::Address(format!(
                "cannot derive a WebSocket URL from scheme `{other}`"
            )))
        }
    };
    let mut url = api.clone();
    url.set_scheme(scheme).map_err(|_| {
        ConnectionError::Address(format!("cannot switch {} to {scheme}", api.as_str()))
    })?;
    Ok(url)
}

/// The URL with its token masked, for logging.
pub fn redact_token(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "token" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

// ---------------------------------------------------------------------------
// Connection manager
// ---------------------------------------------------------------------------

/// Handle to one open channel and its transport loop.
struct Connection {
    cmd_tx: mpsc::UnboundedSender<ClientCommand>,
    connected: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Connection {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("Transport loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("Transport loop did not exit within timeout; aborting");
                    task.abort();
                }
            }
        }

        self.connected.store(false, Ordering::Release);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // No executor here, so no graceful close: just stop the loop.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Owns at most one live round channel.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    address: ChannelAddress,
    current: Option<Connection>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, address: ChannelAddress) -> Self {
        ConnectionManager {
            connector,
            address,
            current: None,
        }
    }

    /// Open the channel for a round, closing any previous one first.
    ///
    /// The token is read from `credentials` now; a missing token fails with
    /// `ConnectionError::Auth` before anything touches the network.
    pub async fn open(
        &mut self,
        game_id: &GameId,
        round_id: &RoundId,
        credentials: &dyn CredentialProvider,
    ) -> Result<mpsc::Receiver<WsEvent>, ConnectionError> {
        let token = credentials.auth_token().ok_or(ConnectionError::Auth)?;

        self.close().await;

        let url = self.address.channel_url(game_id, round_id, &token)?;
        info!("Opening round channel {}", redact_token(&url));
        let transport = self.connector.connect(&url).await?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let connected = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(transport_loop(
            transport,
            cmd_rx,
            event_tx,
            Arc::clone(&connected),
            shutdown_rx,
        ));

        self.current = Some(Connection {
            cmd_tx,
            connected,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
        });
        Ok(event_rx)
    }

    /// Queue one command. Dropped with `NotConnected` if the channel is down.
    pub fn send(&self, command: ClientCommand) -> Result<(), ConnectionError> {
        let conn = self
            .current
            .as_ref()
            .filter(|c| c.is_connected())
            .ok_or(ConnectionError::NotConnected)?;
        conn.cmd_tx
            .send(command)
            .map_err(|_| ConnectionError::NotConnected)
    }

    pub fn is_connected(&self) -> bool {
        self.current.as_ref().is_some_and(Connection::is_connected)
    }

    /// Close the channel if one is open. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(mut conn) = self.current.take() {
            debug!("Closing round channel");
            conn.shutdown().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Transport loop
// ---------------------------------------------------------------------------

/// Multiplexes outbound commands and inbound frames for one connection.
///
/// Exits on shutdown, when the command sender is dropped, when the peer
/// closes, or on the first transport error. `Disconnected` is always the
/// last event sent.
async fn transport_loop(
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientCommand>,
    event_tx: mpsc::Sender<WsEvent>,
    connected: Arc<AtomicBool>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!("Transport loop started");
    let _ = event_tx.send(WsEvent::Connected).await;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(command) => {
                        let json = match serde_json::to_string(&command) {
                            Ok(json) => json,
                            Err(e) => {
                                error!("Failed to serialize {:?}: {e}", command);
                                continue;
                            }
                        };
                        debug!("Sending {}", json);
                        if let Err(e) = transport.send(json).await {
                            error!("Round channel send failed: {e}");
                            emit_disconnected(&event_tx, &connected, e.to_string()).await;
                            break;
                        }
                    }
                    None => {
                        let _ = transport.close().await;
                        emit_disconnected(&event_tx, &connected, "client closed".into()).await;
                        break;
                    }
                }
            }

            _ = &mut shutdown_rx => {
                debug!("Transport loop shutdown requested");
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &connected, "client closed".into()).await;
                break;
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        if event_tx.send(WsEvent::Message(text)).await.is_err() {
                            debug!("Event receiver dropped, stopping transport loop");
                            let _ = transport.close().await;
                            connected.store(false, Ordering::Release);
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        emit_disconnected(&event_tx, &connected, e.to_string()).await;
                        break;
                    }
                    None => {
                        emit_disconnected(&event_tx, &connected, "closed by server".into()).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("Transport loop exited");
}

async fn emit_disconnected(
    event_tx: &mpsc::Sender<WsEvent>,
    connected: &AtomicBool,
    reason: String,
) {
    connected.store(false, Ordering::Release);
    info!("Round channel disconnected: {}", reason);
    let _ = event_tx.send(WsEvent::Disconnected { reason }).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;
    use futures_util::stream;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio_tungstenite::tungstenite::Error as WsError;

    // -- next_text_frame --

    fn mock_stream(
        messages: Vec<Result<Message, WsError>>,
    ) -> impl Stream<Item = Result<Message, WsError>> + Unpin {
        stream::iter(messages)
    }

    #[tokio::test]
    async fn text_frames_are_returned_in_order() {
        let mut s = mock_stream(vec![
            Ok(Message::Text("first".into())),
            Ok(Message::Text("second".into())),
        ]);
        assert_eq!(next_text_frame(&mut s).await, Some(Ok("first".to_string())));
        assert_eq!(next_text_frame(&mut s).await, Some(Ok("second".to_string())));
        assert_eq!(next_text_frame(&mut s).await, None);
    }

    #[tokio::test]
    async fn binary_and_ping_frames_are_skipped() {
        let mut s = mock_stream(vec![
            Ok(Message::Binary(vec![1, 2, 3].into())),
            Ok(Message::Ping(vec![].into())),
            Ok(Message::Pong(vec![].into())),
            Ok(Message::Text("after_ignored".into())),
        ]);
        assert_eq!(
            next_text_frame(&mut s).await,
            Some(Ok("after_ignored".to_string()))
        );
    }

    #[tokio::test]
    async fn close_frame_ends_stream() {
        let mut s = mock_stream(vec![
            Ok(Message::Close(None)),
            Ok(Message::Text("after_close_should_not_appear".into())),
        ]);
        assert_eq!(next_text_frame(&mut s).await, None);
    }

    #[tokio::test]
    async fn socket_error_is_reported() {
        let mut s = mock_stream(vec![Err(WsError::ConnectionClosed)]);
        assert!(matches!(
            next_text_frame(&mut s).await,
            Some(Err(ConnectionError::Transport(_)))
        ));
    }

    #[tokio::test]
    async fn json_payload_preserved_exactly() {
        let payload = r#"{"number":42,"called_numbers":[7,42]}"#;
        let mut s = mock_stream(vec![Ok(Message::Text(payload.into()))]);
        assert_eq!(next_text_frame(&mut s).await, Some(Ok(payload.to_string())));
    }

    // -- addressing --

    #[test]
    fn channel_url_carries_token_query() {
        let address = ChannelAddress::new(
            Url::parse("wss://play.example.com").unwrap(),
            "/ws/game/{game_id}/round/{round_id}/",
        );
        let url = address
            .channel_url(&GameId::new("12"), &RoundId::new("3"), "tok en")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "wss://play.example.com/ws/game/12/round/3/?token=tok+en"
        );
        assert_eq!(
            redact_token(&url),
            "wss://play.example.com/ws/game/12/round/3/?token=***"
        );
    }

    #[test]
    fn channel_url_escapes_ids_before_the_token() {
        let address = ChannelAddress::new(
            Url::parse("wss://play.example.com").unwrap(),
            "/ws/game/{game_id}/round/{round_id}/",
        );
        let url = address
            .channel_url(&GameId::new("12#x"), &RoundId::new("3?token=forged"), "tok")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "wss://play.example.com/ws/game/12%23x/round/3%3Ftoken=forged/?token=tok"
        );

        let err = address
            .channel_url(&GameId::new("."), &RoundId::new("3"), "tok")
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Address(_)));
    }

    #[test]
    fn ws_base_is_derived_from_api_scheme() {
        let https = Url::parse("https://api.example.com").unwrap();
        assert_eq!(ws_base_from_api(&https).unwrap().scheme(), "wss");
        let http = Url::parse("http://localhost:8000").unwrap();
        assert_eq!(
            ws_base_from_api(&http).unwrap().as_str(),
            "ws://localhost:8000/"
        );
        let ftp = Url::parse("ftp://example.com").unwrap();
        assert!(matches!(
            ws_base_from_api(&ftp),
            Err(ConnectionError::Address(_))
        ));
    }

    #[test]
    fn error_surfaces() {
        assert_eq!(ConnectionError::Auth.surface(), Surface::RedirectToLogin);
        assert_eq!(ConnectionError::NotConnected.surface(), Surface::Toast);
        assert_eq!(
            ConnectionError::Transport("reset".into()).surface(),
            Surface::DisconnectedIndicator
        );
    }

    // -- manager over a mock transport --

    struct MockTransport {
        incoming: VecDeque<Option<Result<String, ConnectionError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> Result<(), ConnectionError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String, ConnectionError>> {
            match self.incoming.pop_front() {
                Some(item) => item,
                // Scripted frames exhausted: stay open until shutdown.
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> Result<(), ConnectionError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    struct MockConnector {
        transports: StdMutex<VecDeque<MockTransport>>,
        urls: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Connector for MockConnector {
        type Transport = MockTransport;

        async fn connect(&self, url: &Url) -> Result<MockTransport, ConnectionError> {
            self.urls.lock().unwrap().push(url.to_string());
            self.transports
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ConnectionError::Transport("connection refused".into()))
        }
    }

    struct Harness {
        manager: ConnectionManager<MockConnector>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
        urls: Arc<StdMutex<Vec<String>>>,
    }

    fn harness(incoming: Vec<Option<Result<String, ConnectionError>>>) -> Harness {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let urls = Arc::new(StdMutex::new(Vec::new()));
        let transport = MockTransport {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        let connector = MockConnector {
            transports: StdMutex::new(VecDeque::from(vec![transport])),
            urls: Arc::clone(&urls),
        };
        let address = ChannelAddress::new(
            Url::parse("ws://localhost:8000").unwrap(),
            "/ws/game/{game_id}/round/{round_id}/",
        );
        Harness {
            manager: ConnectionManager::new(connector, address),
            sent,
            closed,
            urls,
        }
    }

    fn creds() -> StaticCredentials {
        StaticCredentials::new("secret", "5")
    }

    #[tokio::test]
    async fn open_without_token_is_auth_error() {
        let mut h = harness(vec![]);
        let err = h
            .manager
            .open(&"1".into(), &"2".into(), &StaticCredentials::anonymous())
            .await
            .unwrap_err();
        assert_eq!(err, ConnectionError::Auth);
        assert!(h.urls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_emits_connected_then_messages() {
        let mut h = harness(vec![Some(Ok(r#"{"number":1,"called_numbers":[1]}"#.into()))]);
        let mut rx = h.manager.open(&"1".into(), &"2".into(), &creds()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), WsEvent::Connected);
        assert_eq!(
            rx.recv().await.unwrap(),
            WsEvent::Message(r#"{"number":1,"called_numbers":[1]}"#.into())
        );
        assert!(h.manager.is_connected());
        assert_eq!(
            h.urls.lock().unwrap()[0],
            "ws://localhost:8000/ws/game/1/round/2/?token=secret"
        );
        h.manager.close().await;
    }

    #[tokio::test]
    async fn send_serializes_command() {
        let mut h = harness(vec![]);
        let mut rx = h.manager.open(&"1".into(), &"2".into(), &creds()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), WsEvent::Connected);

        h.manager.send(ClientCommand::GenerateNumber).unwrap();
        // Let the transport loop pick the command up.
        for _ in 0..100 {
            if !h.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        h.manager.close().await;

        assert_eq!(
            h.sent.lock().unwrap().as_slice(),
            &[r#"{"action":"generate_number"}"#.to_string()]
        );
        assert!(h.closed.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn send_without_channel_is_not_connected() {
        let h = harness(vec![]);
        assert_eq!(
            h.manager.send(ClientCommand::GenerateNumber),
            Err(ConnectionError::NotConnected)
        );
    }

    #[tokio::test]
    async fn server_close_marks_disconnected() {
        let mut h = harness(vec![None]);
        let mut rx = h.manager.open(&"1".into(), &"2".into(), &creds()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), WsEvent::Connected);
        assert_eq!(
            rx.recv().await.unwrap(),
            WsEvent::Disconnected {
                reason: "closed by server".into()
            }
        );
        assert!(!h.manager.is_connected());
        assert_eq!(
            h.manager.send(ClientCommand::GenerateNumber),
            Err(ConnectionError::NotConnected)
        );
    }

    #[tokio::test]
    async fn transport_error_ends_with_disconnected() {
        let mut h = harness(vec![Some(Err(ConnectionError::Transport("reset".into())))]);
        let mut rx = h.manager.open(&"1".into(), &"2".into(), &creds()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), WsEvent::Connected);
        match rx.recv().await.unwrap() {
            WsEvent::Disconnected { reason } => assert!(reason.contains("reset")),
            other => panic!("expected Disconnected, got {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn close_emits_disconnected_and_is_idempotent() {
        let mut h = harness(vec![]);
        let mut rx = h.manager.open(&"1".into(), &"2".into(), &creds()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), WsEvent::Connected);

        h.manager.close().await;
        h.manager.close().await;

        assert_eq!(
            rx.recv().await.unwrap(),
            WsEvent::Disconnected {
                reason: "client closed".into()
            }
        );
        assert!(h.closed.load(Ordering::Relaxed));
        assert!(!h.manager.is_connected());
    }

    #[tokio::test]
    async fn failed_connect_is_transport_error() {
        let mut h = harness(vec![]);
        // Use up the only scripted transport.
        let _rx = h.manager.open(&"1".into(), &"2".into(), &creds()).await.unwrap();
        let err = h
            .manager
            .open(&"1".into(), &"2".into(), &creds())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Transport(_)));
        // Opening closed the previous channel first.
        assert!(h.closed.load(Ordering::Relaxed));
        assert!(!h.manager.is_connected());
    }
}

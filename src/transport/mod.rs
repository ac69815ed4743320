//! Transport - reconnecting WebSocket link for control frames
//!
//! Each touch surface owns one link. The link is a tokio task driving a
//! [`socket_link::SocketLink`] state machine; the rest of the application only
//! sees the cloneable [`TransportHandle`].
//!
//! # Architecture
//!
//! ```text
//! TransportHandle::send ─[Vec<u8>]→ SocketLink task ──► WebSocket (binary frames)
//!        ▲                               │
//!        └──── watch::Receiver ◄─────────┘  LinkStatus
//! ```
//!
//! Messages are never queued across a disconnect: [`TransportHandle::send`]
//! drops anything offered while the link is not online, and frames still in
//! the channel when a new connection opens are discarded.

pub mod socket_link;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::protocol::ControlMessage;
use socket_link::{run_link_loop, SocketLink};

/// Timing and buffering of one link
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportSettings {
    /// Wait between an abnormal close and the next connection attempt
    pub retry_delay: Duration,
    /// Period of the zero-length keep-alive frame while open
    pub keepalive_interval: Duration,
    /// Frames buffered between the UI thread and the link task
    pub channel_capacity: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(1000),
            keepalive_interval: Duration::from_millis(50),
            channel_capacity: 256,
        }
    }
}

/// Connection state published by the link task
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    Connecting,
    Online { since: DateTime<Local> },
    /// Closed by the remote or by a failure; a retry is scheduled
    Offline { code: u16, since: DateTime<Local> },
    /// Finished for good
    Closed,
}

impl LinkStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, LinkStatus::Online { .. })
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Connecting => write!(f, "connecting"),
            LinkStatus::Online { since } => write!(f, "online since {}", since.format("%H:%M:%S")),
            LinkStatus::Offline { code, since } => {
                write!(f, "offline (code {}) since {}", code, since.format("%H:%M:%S"))
            }
            LinkStatus::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

/// Builds `ws://<host>/<path>` from the configured server address
pub fn endpoint_url(host: &str, path: &str) -> Result<String, TransportError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(TransportError::InvalidEndpoint("host is empty".to_string()));
    }
    if host.contains("://") || host.contains('/') || host.chars().any(char::is_whitespace) {
        return Err(TransportError::InvalidEndpoint(format!(
            "host '{}' must be a bare host[:port]",
            host
        )));
    }
    let path = path.trim().trim_start_matches('/');
    Ok(format!("ws://{}/{}", host, path))
}

/// Cloneable sending side of one link
#[derive(Clone, Debug)]
pub struct TransportHandle {
    name: String,
    sender: mpsc::Sender<Vec<u8>>,
    status: watch::Receiver<LinkStatus>,
}

impl TransportHandle {
    /// Spawns the link task and returns immediately
    ///
    /// The task keeps reconnecting until the remote closes normally, `shutdown`
    /// is cancelled, or every handle has been dropped. Must be called from
    /// within a tokio runtime.
    pub fn spawn(
        name: impl Into<String>,
        endpoint: String,
        settings: TransportSettings,
        shutdown: CancellationToken,
    ) -> Result<Self, TransportError> {
        let name = name.into();
        if settings.channel_capacity == 0 {
            return Err(TransportError::Channel(
                "channel capacity must be at least 1".to_string(),
            ));
        }
        if settings.keepalive_interval.is_zero() {
            return Err(TransportError::InvalidSettings(
                "keep-alive interval must be positive".to_string(),
            ));
        }
        if !endpoint.starts_with("ws://") && !endpoint.starts_with("wss://") {
            return Err(TransportError::InvalidEndpoint(endpoint));
        }

        let (sender, receiver) = mpsc::channel(settings.channel_capacity);
        let (status_sender, status) = watch::channel(LinkStatus::Connecting);

        let link = SocketLink::create(
            name.clone(),
            endpoint,
            settings,
            receiver,
            status_sender,
            shutdown,
        );
        tokio::spawn(run_link_loop(link));
        info!("[{}] transport spawned", name);

        Ok(Self {
            name,
            sender,
            status,
        })
    }

    /// Encodes and queues one message, returning whether it was accepted
    ///
    /// Never blocks. Messages offered while the link is not online are dropped.
    pub fn send(&self, message: ControlMessage) -> bool {
        if !self.status.borrow().is_online() {
            trace!("[{}] link not online, dropping {}", self.name, message);
            return false;
        }
        match self.sender.try_send(message.encode()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("[{}] outbound channel full, dropping {}", self.name, message);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("[{}] link task gone, dropping {}", self.name, message);
                false
            }
        }
    }

    pub fn status(&self) -> LinkStatus {
        self.status.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<LinkStatus> {
        self.status.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode_frame;
    use futures::{SinkExt, StreamExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::{timeout, Instant};
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{accept_async, WebSocketStream};

    fn fast_settings() -> TransportSettings {
        TransportSettings {
            retry_delay: Duration::from_millis(100),
            keepalive_interval: Duration::from_millis(20),
            channel_capacity: 16,
        }
    }

    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, format!("ws://{}/socket", addr))
    }

    async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
        let (tcp, _) = timeout(Duration::from_secs(5), listener.accept())
            .await
            .unwrap()
            .unwrap();
        accept_async(tcp).await.unwrap()
    }

    async fn close_with(ws: &mut WebSocketStream<TcpStream>, code: CloseCode) {
        ws.send(Message::Close(Some(CloseFrame {
            code,
            reason: "".into(),
        })))
        .await
        .unwrap();
        // Drain until the close handshake completes
        while let Ok(Some(Ok(_))) = timeout(Duration::from_secs(1), ws.next()).await {}
    }

    async fn wait_online(handle: &TransportHandle) {
        let mut status = handle.subscribe();
        timeout(Duration::from_secs(5), status.wait_for(|s| s.is_online()))
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn endpoint_url_joins_host_and_path() {
        assert_eq!(
            endpoint_url("127.0.0.1:8080", "/socket").unwrap(),
            "ws://127.0.0.1:8080/socket"
        );
        assert_eq!(
            endpoint_url(" pad.local ", "press").unwrap(),
            "ws://pad.local/press"
        );
        assert!(endpoint_url("", "/socket").is_err());
        assert!(endpoint_url("ws://host", "/socket").is_err());
    }

    #[test]
    fn offline_statuses_are_not_online() {
        assert!(!LinkStatus::Connecting.is_online());
        assert!(!LinkStatus::Closed.is_online());
        assert!(LinkStatus::Online { since: Local::now() }.is_online());
    }

    #[tokio::test]
    async fn spawn_rejects_bad_settings() {
        let shutdown = CancellationToken::new();
        let zero = TransportSettings {
            channel_capacity: 0,
            ..fast_settings()
        };
        assert!(matches!(
            TransportHandle::spawn("t", "ws://127.0.0.1:1/".into(), zero, shutdown.clone()),
            Err(TransportError::Channel(_))
        ));
        let no_keepalive = TransportSettings {
            keepalive_interval: Duration::ZERO,
            ..fast_settings()
        };
        assert!(matches!(
            TransportHandle::spawn(
                "t",
                "ws://127.0.0.1:1/".into(),
                no_keepalive,
                shutdown.clone()
            ),
            Err(TransportError::InvalidSettings(_))
        ));
        assert!(matches!(
            TransportHandle::spawn("t", "http://x/".into(), fast_settings(), shutdown),
            Err(TransportError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn failed_connect_is_abnormal_and_retried_after_delay() {
        // Reserve a free port, then leave it unbound
        let (listener, url) = listen().await;
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let settings = TransportSettings {
            retry_delay: Duration::from_millis(200),
            ..fast_settings()
        };
        let shutdown = CancellationToken::new();
        let handle = TransportHandle::spawn("late", url, settings, shutdown.clone()).unwrap();

        let mut status = handle.subscribe();
        timeout(
            Duration::from_secs(5),
            status.wait_for(|s| matches!(s, LinkStatus::Offline { code: 1006, .. })),
        )
        .await
        .unwrap()
        .unwrap();
        let offline_at = Instant::now();

        let listener = TcpListener::bind(addr).await.unwrap();
        let _server = accept(&listener).await;
        assert!(offline_at.elapsed() >= Duration::from_millis(150));
        wait_online(&handle).await;
        shutdown.cancel();
    }

    #[tokio::test]
    async fn sends_are_dropped_while_offline() {
        let shutdown = CancellationToken::new();
        // Nothing listens on port 1
        let handle = TransportHandle::spawn(
            "offline",
            "ws://127.0.0.1:1/socket".into(),
            fast_settings(),
            shutdown.clone(),
        )
        .unwrap();
        assert!(!handle.send(ControlMessage::ButtonDown));
        shutdown.cancel();
    }

    #[tokio::test]
    async fn forwards_messages_and_keepalives_while_online() {
        let (listener, url) = listen().await;
        let shutdown = CancellationToken::new();
        let handle =
            TransportHandle::spawn("pad", url, fast_settings(), shutdown.clone()).unwrap();

        let mut server = accept(&listener).await;
        wait_online(&handle).await;
        assert!(handle.send(ControlMessage::Move { dx: 18, dy: -5 }));

        let mut saw_keepalive = false;
        let mut received = None;
        while received.is_none() || !saw_keepalive {
            let frame = timeout(Duration::from_secs(2), server.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let Message::Binary(bytes) = frame {
                match decode_frame(&bytes).unwrap() {
                    None => saw_keepalive = true,
                    Some(message) => received = Some(message),
                }
            }
        }
        assert_eq!(received, Some(ControlMessage::Move { dx: 18, dy: -5 }));

        shutdown.cancel();
        let mut status = handle.subscribe();
        timeout(
            Duration::from_secs(2),
            status.wait_for(|s| *s == LinkStatus::Closed),
        )
        .await
        .unwrap()
        .unwrap();
    }

    #[tokio::test]
    async fn shutdown_sends_normal_close_frame() {
        let (listener, url) = listen().await;
        let shutdown = CancellationToken::new();
        let handle =
            TransportHandle::spawn("bye", url, fast_settings(), shutdown.clone()).unwrap();

        let mut server = accept(&listener).await;
        wait_online(&handle).await;
        shutdown.cancel();

        let frame = loop {
            let frame = timeout(Duration::from_secs(2), server.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if !matches!(frame, Message::Binary(_)) {
                break frame;
            }
        };
        match frame {
            Message::Close(Some(close)) => assert_eq!(close.code, CloseCode::Normal),
            other => panic!("expected a close frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn reconnects_after_abnormal_close_but_not_after_normal_close() {
        let (listener, url) = listen().await;
        let shutdown = CancellationToken::new();
        let handle =
            TransportHandle::spawn("pad", url, fast_settings(), shutdown.clone()).unwrap();

        let mut first = accept(&listener).await;
        wait_online(&handle).await;
        let closed_at = Instant::now();
        close_with(&mut first, CloseCode::Away).await;

        let mut second = accept(&listener).await;
        assert!(closed_at.elapsed() >= Duration::from_millis(90));
        wait_online(&handle).await;
        close_with(&mut second, CloseCode::Normal).await;

        assert!(timeout(Duration::from_millis(500), listener.accept())
            .await
            .is_err());
        let mut status = handle.subscribe();
        timeout(
            Duration::from_secs(2),
            status.wait_for(|s| *s == LinkStatus::Closed),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!handle.send(ControlMessage::ButtonUp));
    }
}

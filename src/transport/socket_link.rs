//! Socket link with statum state machine for connection lifecycle
//!
//! # State Machine
//!
//! ```text
//! Connecting ──► Open ──► Closed(code ≠ 1000) ──► (retry delay) ──► Connecting
//!     │                        ▲
//!     └── connect failed ──────┘
//!                              Closed(1000 / shutdown) ──► terminal
//! ```
//!
//! While open the link forwards outbound frames, answers nothing, and sends a
//! zero-length keep-alive frame on a fixed interval.

use chrono::Local;
use futures::{SinkExt, StreamExt};
use statum::{machine, state};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{LinkStatus, TransportSettings};
use crate::protocol::decode_frame;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const NORMAL_CLOSURE: u16 = 1000;
pub const NO_STATUS_RECEIVED: u16 = 1005;
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Why the link left the open state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    /// Local shutdown, never retried
    pub shutdown: bool,
}

impl CloseInfo {
    pub fn remote(code: u16) -> Self {
        Self {
            code,
            shutdown: false,
        }
    }

    pub fn abnormal() -> Self {
        Self::remote(ABNORMAL_CLOSURE)
    }

    pub fn shutdown() -> Self {
        Self {
            code: NORMAL_CLOSURE,
            shutdown: true,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.shutdown || self.code == NORMAL_CLOSURE
    }
}

// Link states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum LinkState {
    Connecting,
    Open,
    Closed(CloseInfo),
}

#[machine]
#[derive(Debug)]
pub struct SocketLink<S: LinkState> {
    name: String,
    endpoint: String,
    settings: TransportSettings,

    // Encoded frames from the handles
    outbound: mpsc::Receiver<Vec<u8>>,

    // Published for the UI's offline indicator
    status: watch::Sender<LinkStatus>,

    shutdown: CancellationToken,
    attempts: u64,
}

/// Result of one connection attempt
pub enum LinkAttempt {
    Opened(SocketLink<Open>, WsStream),
    Failed(SocketLink<Closed>),
}

impl<S: LinkState> SocketLink<S> {
    fn publish(&self, status: LinkStatus) {
        debug!("[{}] link status: {}", self.name, status);
        self.status.send_replace(status);
    }

    // Frames queued while the link was down are dropped, never replayed
    fn discard_stale(&mut self) {
        let mut dropped = 0usize;
        while self.outbound.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!("[{}] discarded {} stale frames", self.name, dropped);
        }
    }
}

impl SocketLink<Connecting> {
    pub fn create(
        name: String,
        endpoint: String,
        settings: TransportSettings,
        outbound: mpsc::Receiver<Vec<u8>>,
        status: watch::Sender<LinkStatus>,
        shutdown: CancellationToken,
    ) -> Self {
        info!("[{}] creating socket link to {}", name, endpoint);
        Self::new(name, endpoint, settings, outbound, status, shutdown, 0)
    }

    pub async fn connect(mut self) -> LinkAttempt {
        self.attempts += 1;
        self.publish(LinkStatus::Connecting);
        info!(
            "[{}] connecting to {} (attempt {})",
            self.name, self.endpoint, self.attempts
        );

        let endpoint = self.endpoint.clone();
        let shutdown = self.shutdown.clone();
        let result = tokio::select! {
            _ = shutdown.cancelled() => None,
            result = connect_async(endpoint.as_str()) => Some(result),
        };

        match result {
            None => {
                info!("[{}] shutdown requested while connecting", self.name);
                LinkAttempt::Failed(self.transition_with(CloseInfo::shutdown()))
            }
            Some(Ok((stream, _response))) => {
                info!("[{}] connected", self.name);
                self.discard_stale();
                self.publish(LinkStatus::Online { since: Local::now() });
                LinkAttempt::Opened(self.transition(), stream)
            }
            Some(Err(e)) => {
                warn!("[{}] connection failed: {}", self.name, e);
                let close = CloseInfo::abnormal();
                self.publish(LinkStatus::Offline {
                    code: close.code,
                    since: Local::now(),
                });
                LinkAttempt::Failed(self.transition_with(close))
            }
        }
    }
}

impl SocketLink<Open> {
    /// Pumps frames until the socket closes or shutdown is requested
    pub async fn pump(mut self, stream: WsStream) -> SocketLink<Closed> {
        let (mut writer, mut reader) = stream.split();
        let mut keepalive = tokio::time::interval(self.settings.keepalive_interval);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shutdown = self.shutdown.clone();
        let mut forwarded = 0u64;

        let close = loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("[{}] shutdown requested, closing socket", self.name);
                    if let Err(e) = writer.send(normal_close()).await {
                        debug!("[{}] close frame not delivered: {}", self.name, e);
                    }
                    break CloseInfo::shutdown();
                }
                incoming = reader.next() => match incoming {
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame
                            .map(|frame| u16::from(frame.code))
                            .unwrap_or(NO_STATUS_RECEIVED);
                        info!("[{}] remote closed the socket with code {}", self.name, code);
                        break CloseInfo::remote(code);
                    }
                    Some(Ok(other)) => trace!("[{}] ignoring inbound frame: {:?}", self.name, other),
                    Some(Err(e)) => {
                        warn!("[{}] socket read failed: {}", self.name, e);
                        break CloseInfo::abnormal();
                    }
                    None => {
                        warn!("[{}] socket stream ended without close frame", self.name);
                        break CloseInfo::abnormal();
                    }
                },
                outgoing = self.outbound.recv() => match outgoing {
                    Some(frame) => {
                        trace!("[{}] sending {:?}", self.name, decode_frame(&frame));
                        if let Err(e) = writer.send(Message::binary(frame)).await {
                            warn!("[{}] socket write failed: {}", self.name, e);
                            break CloseInfo::abnormal();
                        }
                        forwarded += 1;
                    }
                    None => {
                        info!("[{}] all handles dropped, closing socket", self.name);
                        if let Err(e) = writer.send(normal_close()).await {
                            debug!("[{}] close frame not delivered: {}", self.name, e);
                        }
                        break CloseInfo::shutdown();
                    }
                },
                _ = keepalive.tick() => {
                    if let Err(e) = writer.send(Message::binary(Vec::new())).await {
                        warn!("[{}] keep-alive write failed: {}", self.name, e);
                        break CloseInfo::abnormal();
                    }
                }
            }
        };

        debug!(
            "[{}] socket closed after forwarding {} frames",
            self.name, forwarded
        );
        let status = if close.is_terminal() {
            LinkStatus::Closed
        } else {
            LinkStatus::Offline {
                code: close.code,
                since: Local::now(),
            }
        };
        self.publish(status);
        self.transition_with(close)
    }
}

impl SocketLink<Closed> {
    pub fn close_info(&self) -> CloseInfo {
        self.get_state_data()
            .copied()
            .unwrap_or_else(CloseInfo::abnormal)
    }

    /// Waits out the retry delay, or returns `None` when the link is finished
    pub async fn retry(self) -> Option<SocketLink<Connecting>> {
        let close = self.close_info();
        if close.is_terminal() || self.outbound.is_closed() {
            info!(
                "[{}] link finished (code {}, shutdown {})",
                self.name, close.code, close.shutdown
            );
            self.publish(LinkStatus::Closed);
            return None;
        }

        let delay = self.settings.retry_delay;
        debug!(
            "[{}] reconnecting in {} ms after code {}",
            self.name,
            delay.as_millis(),
            close.code
        );
        let shutdown = self.shutdown.clone();
        let cancelled = tokio::select! {
            _ = shutdown.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        };
        if cancelled {
            info!("[{}] shutdown requested while offline", self.name);
            self.publish(LinkStatus::Closed);
            return None;
        }
        Some(self.transition())
    }
}

fn normal_close() -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "".into(),
    }))
}

/// Drives the link through its states until it reaches a terminal close
pub async fn run_link_loop(mut link: SocketLink<Connecting>) {
    loop {
        let closed = match link.connect().await {
            LinkAttempt::Opened(open, stream) => open.pump(stream).await,
            LinkAttempt::Failed(closed) => closed,
        };
        match closed.retry().await {
            Some(next) => link = next,
            None => break,
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use pricewatch_core::config::ServerSettings;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::session::{Reply, Session, SessionDispatcher};

/// Frames queued for the writer task.
#[derive(Debug)]
enum Outbound {
    Text(String),
    Close,
}

/// Why the read loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The client asked to disconnect (or sent an unknown action).
    Requested,
    /// The peer closed the socket or the stream ended.
    PeerClosed,
    /// Nothing was heard from the peer within the pong timeout.
    TimedOut,
    /// The writer side went away.
    WriterGone,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::PeerClosed => "peer_closed",
            Self::TimedOut => "timed_out",
            Self::WriterGone => "writer_gone",
        }
    }
}

/// Drive one WebSocket session until it closes.
///
/// Inbound text frames are handled one at a time, so replies go out in
/// request order. A writer task owns the sink and interleaves replies with
/// heartbeat pings.
pub async fn handle_ws_connection(
    socket: WebSocket,
    dispatcher: Arc<SessionDispatcher>,
    settings: Arc<ServerSettings>,
) -> CloseReason {
    let session = Session::new(dispatcher);
    let span = tracing::info_span!("session", session_id = %session.id());
    run_session(socket, session, settings).instrument(span).await
}

async fn run_session(
    socket: WebSocket,
    mut session: Session,
    settings: Arc<ServerSettings>,
) -> CloseReason {
    tracing::info!("Session opened");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Outbound>(settings.max_send_queue.max(1));
    let ping_every = settings.ping_interval();

    let writer = tokio::spawn(
        async move {
            let mut ping_interval = tokio::time::interval(ping_every);
            ping_interval.tick().await; // consume first immediate tick

            loop {
                tokio::select! {
                    msg = rx.recv() => match msg {
                        Some(Outbound::Text(text)) => {
                            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        Some(Outbound::Close) => {
                            let frame = CloseFrame {
                                code: close_code::NORMAL,
                                reason: "".into(),
                            };
                            let _ = ws_tx.send(WsMessage::Close(Some(frame))).await;
                            break;
                        }
                        None => break,
                    },
                    _ = ping_interval.tick() => {
                        if ws_tx.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                            break;
                        }
                        tracing::trace!("Sent ping");
                    }
                }
            }
        }
        .in_current_span(),
    );

    let reason = read_loop(&mut ws_rx, &mut session, &tx, settings.pong_timeout()).await;
    session.on_transport_close();

    drop(tx);
    let _ = writer.await;

    tracing::info!(reason = reason.as_str(), "Session closed");
    reason
}

async fn read_loop<S>(
    ws_rx: &mut S,
    session: &mut Session,
    tx: &mpsc::Sender<Outbound>,
    pong_timeout: Duration,
) -> CloseReason
where
    S: futures::Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    loop {
        let next = match tokio::time::timeout(pong_timeout, ws_rx.next()).await {
            Ok(next) => next,
            Err(_) => {
                tracing::warn!(timeout_ms = pong_timeout.as_millis() as u64, "Peer unresponsive");
                return CloseReason::TimedOut;
            }
        };

        let msg = match next {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                tracing::debug!(error = %e, "WebSocket read error");
                return CloseReason::PeerClosed;
            }
            None => return CloseReason::PeerClosed,
        };

        match msg {
            WsMessage::Text(text) => match session.on_message(text.as_str()).await {
                Reply::Send(payload) => {
                    if tx.send(Outbound::Text(payload)).await.is_err() {
                        return CloseReason::WriterGone;
                    }
                }
                Reply::Close => {
                    let _ = tx.send(Outbound::Close).await;
                    return CloseReason::Requested;
                }
                Reply::Ignore => {}
            },
            WsMessage::Binary(bytes) => {
                tracing::warn!(len = bytes.len(), "Ignoring binary frame");
            }
            WsMessage::Close(_) => return CloseReason::PeerClosed,
            // axum answers pings itself; any frame counts as liveness.
            WsMessage::Ping(_) | WsMessage::Pong(_) => {}
        }
    }
}

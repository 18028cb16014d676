//! # Transport Layer
//!
//! Newline-delimited JSON over TCP, on tokio.
//!
//! ## Design
//!
//! - One JSON object per line, in both directions
//! - A line that does not decode is logged and skipped; the connection stays
//! - Server: one read task and one writer task per connection
//! - Client: one task that owns the socket, reconnects on loss and reports
//!   everything to the tick through a crossbeam channel

use std::net::SocketAddr;

use cairn_shared::ClientMessage;
use crossbeam_channel::Sender;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::client::{ReconnectPolicy, TransportEvent};
use crate::codec;
use crate::error::NetResult;
use crate::server::GameServer;

/// Per-connection read statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Lines received.
    pub lines_received: u64,
    /// Lines that failed to decode.
    pub decode_errors: u64,
}

/// Writes one line and the newline.
async fn write_line(writer: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await
}

// =============================================================================
// SERVER
// =============================================================================

/// Accepts connections until the listener fails.
///
/// # Errors
///
/// Returns the accept error that ended the loop.
pub async fn serve(listener: TcpListener, server: GameServer) -> NetResult<()> {
    tracing::info!(addr = ?listener.local_addr().ok(), "Listening");
    loop {
        let (stream, peer) = listener.accept().await?;
        let server = server.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer, server).await;
        });
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, server: GameServer) {
    if let Err(error) = stream.set_nodelay(true) {
        tracing::debug!(%peer, %error, "Could not disable Nagle");
    }
    let (conn, mut lines_out) = server.connect();
    tracing::info!(%peer, %conn, "Connection accepted");

    let (reader, mut writer) = stream.into_split();
    let writer_task = tokio::spawn(async move {
        while let Some(line) = lines_out.recv().await {
            if let Err(error) = write_line(&mut writer, &line).await {
                tracing::debug!(%conn, %error, "Write failed");
                break;
            }
        }
    });

    let mut stats = TransportStats::default();
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                stats.lines_received += 1;
                match codec::decode_client(&line) {
                    Ok(message) => {
                        server.receive(conn, message);
                    }
                    Err(error) => {
                        stats.decode_errors += 1;
                        tracing::warn!(%conn, %error, "Discarding client line");
                    }
                }
            }
            Ok(None) => break,
            Err(error) => {
                tracing::debug!(%conn, %error, "Read failed");
                break;
            }
        }
    }

    server.disconnect(conn);
    writer_task.abort();
    tracing::info!(
        %peer,
        %conn,
        received = stats.lines_received,
        decode_errors = stats.decode_errors,
        "Connection closed"
    );
}

// =============================================================================
// CLIENT
// =============================================================================

/// How a client session ended.
enum SessionEnd {
    /// The socket dropped; try again.
    Lost,
    /// The game side hung up; stop for good.
    Closed,
}

/// Connects, forwards traffic, and reconnects per `policy`.
///
/// Returns when the game drops its end of either channel, or after
/// reporting [`TransportEvent::GaveUp`].
pub async fn run_client(
    addr: String,
    policy: ReconnectPolicy,
    events: Sender<TransportEvent>,
    mut outbound: UnboundedReceiver<ClientMessage>,
) {
    let mut attempt = 0;
    loop {
        match TcpStream::connect(&addr).await {
            Ok(stream) => {
                attempt = 0;
                // stale messages from before the drop; the client re-joins
                while outbound.try_recv().is_ok() {}
                tracing::info!(%addr, "Connected to server");
                if events.send(TransportEvent::Connected).is_err() {
                    return;
                }
                match run_session(stream, &events, &mut outbound).await {
                    SessionEnd::Closed => return,
                    SessionEnd::Lost => {
                        tracing::warn!(%addr, "Connection lost");
                        if events.send(TransportEvent::Disconnected).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(error) => {
                tracing::warn!(%addr, %error, "Connect failed");
            }
        }

        attempt += 1;
        if !policy.allows(attempt) {
            tracing::warn!(%addr, attempts = attempt - 1, "Giving up on server");
            // the game may already be gone
            let _ = events.send(TransportEvent::GaveUp);
            return;
        }
        if events.send(TransportEvent::Reconnecting { attempt }).is_err() {
            return;
        }
        tokio::time::sleep(policy.backoff).await;
    }
}

async fn run_session(
    stream: TcpStream,
    events: &Sender<TransportEvent>,
    outbound: &mut UnboundedReceiver<ClientMessage>,
) -> SessionEnd {
    if let Err(error) = stream.set_nodelay(true) {
        tracing::debug!(%error, "Could not disable Nagle");
    }
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match codec::decode_server(&line) {
                    Ok(message) => {
                        if events.send(TransportEvent::Message(message)).is_err() {
                            return SessionEnd::Closed;
                        }
                    }
                    Err(error) => tracing::warn!(%error, "Discarding server line"),
                },
                Ok(None) => return SessionEnd::Lost,
                Err(error) => {
                    tracing::debug!(%error, "Read failed");
                    return SessionEnd::Lost;
                }
            },
            message = outbound.recv() => match message {
                Some(message) => {
                    let line = match codec::encode(&message) {
                        Ok(line) => line,
                        Err(error) => {
                            tracing::warn!(kind = message.kind(), %error, "Dropping unencodable message");
                            continue;
                        }
                    };
                    if let Err(error) = write_line(&mut writer, &line).await {
                        tracing::debug!(%error, "Write failed");
                        return SessionEnd::Lost;
                    }
                }
                None => return SessionEnd::Closed,
            },
        }
    }
}

/// Spawns [`run_client`] on `runtime`. Returns the sender the game uses for
/// outgoing messages.
pub fn spawn_client(
    runtime: &tokio::runtime::Handle,
    addr: String,
    policy: ReconnectPolicy,
    events: Sender<TransportEvent>,
) -> UnboundedSender<ClientMessage> {
    let (outbound, outbound_rx) = tokio::sync::mpsc::unbounded_channel();
    runtime.spawn(run_client(addr, policy, events, outbound_rx));
    outbound
}

// TCP client for connecting to the relay.
//
// Provides a non-blocking interface for a game client's main loop.
// Architecture:
// - `connect()` performs TCP connect + Hello handshake on the calling
//   thread, then spawns a background reader thread.
// - The reader thread calls `read_message()` in a loop, deserializes
//   `ServerMessage`, and pushes into an `mpsc` channel.
// - The main thread holds a `BufWriter<TcpStream>` for sending.
// - `poll()` drains the inbox non-blocking, returning all queued messages.
//
// This separation keeps the caller's loop free of blocking network I/O —
// the one requirement the sync client has, since it must service pointer
// input and inbound moves from the same single thread without either
// starving the other.
//
// This module lives in the relay crate (not the sync crate) because it is
// purely std TCP + protocol framing + mpsc. Living here makes it available
// to any crate, including the integration tests, without extra
// dependencies.
//
// Connection loss: when the reader thread exits (EOF, read error, or an
// unparsable frame), it drops its channel sender. `poll()` keeps returning
// whatever was buffered, then reports `ClientError::ConnectionLost` —
// which the sync client treats as fatal for the session.

use std::io::{self, BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use gambit_protocol::framing::{read_message, write_message};
use gambit_protocol::message::{ClientMessage, PROTOCOL_VERSION, ServerMessage};
use gambit_protocol::types::{MoveSequence, SessionId};
use thiserror::Error;
use tracing::debug;

/// Transport-level failures surfaced by `NetClient`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("relay rejected the connection: {0}")]
    Rejected(String),
    #[error("relay connection lost")]
    ConnectionLost,
}

/// TCP client for relay communication.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
    session_id: SessionId,
}

impl NetClient {
    /// Connect to a relay, perform the Hello handshake, and spawn a reader
    /// thread. The returned client knows its relay-assigned session id.
    pub fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).map_err(ClientError::Connect)?;

        // Set a read timeout for the handshake.
        stream
            .set_read_timeout(Some(std::time::Duration::from_secs(5)))
            .ok();

        let reader_stream = stream
            .try_clone()
            .map_err(|e| ClientError::Handshake(format!("clone failed: {e}")))?;
        let mut writer = BufWriter::new(stream);

        let hello = ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
        };
        send_msg(&mut writer, &hello)
            .map_err(|e| ClientError::Handshake(format!("send Hello failed: {e}")))?;

        let mut reader = BufReader::new(reader_stream);
        let response_bytes = read_message(&mut reader)
            .map_err(|e| ClientError::Handshake(format!("read Welcome failed: {e}")))?;
        let response: ServerMessage = serde_json::from_slice(&response_bytes)
            .map_err(|e| ClientError::Handshake(format!("parse Welcome failed: {e}")))?;

        let session_id = match response {
            ServerMessage::Welcome { session_id } => session_id,
            ServerMessage::Rejected { reason } => return Err(ClientError::Rejected(reason)),
            other => {
                return Err(ClientError::Handshake(format!(
                    "unexpected response: {other:?}"
                )));
            }
        };
        debug!(session = %session_id, "handshake complete");

        // Clear read timeout for the long-lived reader loop.
        if let Ok(inner) = reader.get_ref().try_clone() {
            inner.set_read_timeout(None).ok();
        }

        // Spawn reader thread.
        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            reader_loop(reader, tx);
        });

        Ok(Self {
            writer,
            inbox: rx,
            _reader_thread: Some(reader_thread),
            session_id,
        })
    }

    /// The relay-assigned identity of this connection.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Send an encoded move payload to the relay.
    pub fn send_move(&mut self, sequence: MoveSequence, payload: &str) -> Result<(), ClientError> {
        let msg = ClientMessage::Move {
            sequence,
            payload: payload.to_string(),
        };
        send_msg(&mut self.writer, &msg).map_err(|_| ClientError::ConnectionLost)
    }

    /// Send Goodbye; the relay drops the session on receipt.
    pub fn disconnect(&mut self) {
        let _ = send_msg(&mut self.writer, &ClientMessage::Goodbye);
    }

    /// Drain all queued server messages (non-blocking). Reports
    /// `ConnectionLost` once the reader thread has exited and the buffer
    /// is empty.
    pub fn poll(&self) -> Result<Vec<ServerMessage>, ClientError> {
        let mut messages = Vec::new();
        loop {
            match self.inbox.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(TryRecvError::Empty) => return Ok(messages),
                Err(TryRecvError::Disconnected) => {
                    if messages.is_empty() {
                        return Err(ClientError::ConnectionLost);
                    }
                    return Ok(messages);
                }
            }
        }
    }
}

/// Serialize a `ClientMessage` to JSON and write with length-delimited
/// framing.
fn send_msg(writer: &mut BufWriter<TcpStream>, msg: &ClientMessage) -> io::Result<()> {
    let json = serde_json::to_vec(msg)?;
    write_message(writer, &json)
}

/// Reader thread: read framed messages in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    while let Ok(bytes) = read_message(&mut reader) {
        match serde_json::from_slice::<ServerMessage>(&bytes) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break; // Main thread dropped the receiver
                }
            }
            Err(_) => break, // Unparsable frame
        }
    }
}

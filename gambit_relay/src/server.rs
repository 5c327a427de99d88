// TCP server and main event loop for the relay.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per session): call `framing::read_message()` in
//   a loop, deserialize `ClientMessage`, and send
//   `InternalEvent::MessageFrom` to the main thread. On error/EOF, send
//   `InternalEvent::Disconnected`.
// - **Main thread**: owns the `Roster`, receives events from the channel,
//   and dispatches them. A relayed move is fanned out the moment its event
//   is handled — there is no batching cadence; delivery order to every
//   recipient is the order events reach this thread.
//
// The main thread is the only writer to client TCP streams (via
// `Roster::relay_move` and the handshake responses). Reader threads only
// read. This avoids concurrent read/write on the same `TcpStream`, which is
// safe on most platforms but fragile.
//
// Shutdown: the main thread checks a `keep_running` flag (set to false by
// `RelayHandle::stop`) and breaks out of the event loop.

use std::io::BufReader;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use gambit_protocol::framing::{read_message, write_message};
use gambit_protocol::message::{ClientMessage, PROTOCOL_VERSION, ServerMessage};
use gambit_protocol::types::SessionId;
use tracing::warn;

use crate::session::Roster;

/// How often the main loop wakes to check the shutdown flag when no events
/// are arriving.
const IDLE_WAKE: Duration = Duration::from_millis(100);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    MessageFrom {
        session_id: SessionId,
        message: ClientMessage,
    },
    Disconnected {
        session_id: SessionId,
    },
}

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for it to shut down.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Configuration for starting a relay server.
pub struct RelayConfig {
    pub port: u16,
    pub max_sessions: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 7878,
            max_sessions: 2,
        }
    }
}

/// Start the relay server on a background thread. Returns a handle for
/// stopping it and the actual bound address (useful when port 0 is used
/// to let the OS pick a free port).
pub fn start_relay(config: RelayConfig) -> std::io::Result<(RelayHandle, std::net::SocketAddr)> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", config.port))?;
    let addr = listener.local_addr()?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    let thread = thread::spawn(move || {
        run_relay(listener, config, keep_running_clone);
    });

    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main relay loop. Runs until `keep_running` is set to false.
fn run_relay(listener: TcpListener, config: RelayConfig, keep_running: Arc<AtomicBool>) {
    let mut roster = Roster::new(config.max_sessions);

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Set the listener to non-blocking so the accept thread can check
    // keep_running periodically.
    listener.set_nonblocking(true).ok();

    // Listener thread: accepts new connections.
    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(false).ok();
                    let _ = tx_listener.send(InternalEvent::NewConnection { stream });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(_) => break,
            }
        }
    });

    // Main event loop.
    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(IDLE_WAKE) {
            Ok(event) => handle_event(&mut roster, event, &tx, &keep_running),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // Nothing pending — loop around and re-check the flag.
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Dispatch a single event to the roster.
fn handle_event(
    roster: &mut Roster,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    match event {
        InternalEvent::NewConnection { stream } => {
            handle_new_connection(roster, stream, tx, keep_running);
        }
        InternalEvent::MessageFrom {
            session_id,
            message,
        } => {
            handle_message(roster, &session_id, message);
        }
        InternalEvent::Disconnected { session_id } => {
            roster.remove_session(&session_id);
        }
    }
}

/// Handle a new TCP connection: read the Hello handshake, add the session
/// to the roster, and spawn a reader thread. Connections that fail the
/// handshake are answered with `Rejected` (when possible) and dropped.
fn handle_new_connection(
    roster: &mut Roster,
    stream: TcpStream,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    // Set a read timeout so the handshake doesn't block forever.
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok();

    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(s) => s,
        Err(_) => return,
    });

    let hello_bytes = match read_message(&mut reader) {
        Ok(bytes) => bytes,
        Err(_) => return,
    };

    let hello: ClientMessage = match serde_json::from_slice(&hello_bytes) {
        Ok(msg) => msg,
        Err(_) => return,
    };

    match hello {
        ClientMessage::Hello { protocol_version } if protocol_version == PROTOCOL_VERSION => {
            let write_stream = match stream.try_clone() {
                Ok(s) => s,
                Err(_) => return,
            };

            match roster.add_session(write_stream) {
                Ok(session_id) => {
                    // Clear read timeout for the long-lived reader loop.
                    stream.set_read_timeout(None).ok();

                    let tx_reader = tx.clone();
                    let keep_running_reader = keep_running.clone();
                    thread::spawn(move || {
                        reader_loop(reader, session_id, tx_reader, keep_running_reader);
                    });
                }
                Err(reason) => reject(stream, reason),
            }
        }
        ClientMessage::Hello { protocol_version } => {
            warn!(
                theirs = protocol_version,
                ours = PROTOCOL_VERSION,
                "rejecting client with mismatched protocol version"
            );
            reject(stream, "protocol version mismatch".into());
        }
        _ => {
            // Expected Hello as first message — drop the connection.
        }
    }
}

/// Send `Rejected` and let the connection drop.
fn reject(stream: TcpStream, reason: String) {
    let rejected = ServerMessage::Rejected { reason };
    if let Ok(json) = serde_json::to_vec(&rejected) {
        let mut writer = std::io::BufWriter::new(stream);
        let _ = write_message(&mut writer, &json);
    }
}

/// Reader loop for a single session. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    session_id: SessionId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_message(&mut reader) {
            Ok(bytes) => match serde_json::from_slice::<ClientMessage>(&bytes) {
                Ok(ClientMessage::Goodbye) => {
                    let _ = tx.send(InternalEvent::Disconnected { session_id });
                    break;
                }
                Ok(message) => {
                    let _ = tx.send(InternalEvent::MessageFrom {
                        session_id: session_id.clone(),
                        message,
                    });
                }
                Err(_) => {
                    // Unparsable frame — disconnect.
                    let _ = tx.send(InternalEvent::Disconnected { session_id });
                    break;
                }
            },
            Err(_) => {
                // Read error or EOF — disconnect.
                let _ = tx.send(InternalEvent::Disconnected { session_id });
                break;
            }
        }
    }
}

/// Handle a client message that isn't Hello or Goodbye (those are handled
/// during connection setup and in the reader loop respectively).
fn handle_message(roster: &mut Roster, session_id: &SessionId, message: ClientMessage) {
    match message {
        ClientMessage::Move { sequence, payload } => {
            roster.relay_move(session_id, sequence, payload);
        }
        ClientMessage::Hello { .. } | ClientMessage::Goodbye => {
            // Hello is handled during connection setup, Goodbye in the
            // reader loop.
        }
    }
}

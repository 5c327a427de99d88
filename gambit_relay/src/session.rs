// Connected-session roster for the relay.
//
// `Roster` is the central data structure that `server.rs` drives. It tracks
// connected sessions, assigns their identifiers, and fans relayed moves out
// to every connected stream. All mutation happens through methods called
// from the server's single-threaded main loop — no internal locking, and no
// session can join or leave while a broadcast is iterating.
//
// The self-echo contract lives here: `relay_move` sends the tagged message
// to EVERY connected session, including the one it came from. Clients rely
// on receiving their own moves back and filtering them by sender identity;
// an implementation that skips the sender breaks them silently.
//
// Writing to client streams: `Roster` holds cloned `TcpStream` write halves
// wrapped in `BufWriter`. Write errors on a single session are ignored —
// the reader thread for that session will detect the broken pipe and report
// a disconnect.
//
// Disconnects are silent by design: removing a session notifies nobody.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::net::TcpStream;

use gambit_protocol::framing::write_message;
use gambit_protocol::message::ServerMessage;
use gambit_protocol::types::{MoveSequence, SessionId};
use tracing::{debug, info};

/// Roster of sessions connected to the relay.
pub struct Roster {
    sessions: BTreeMap<SessionId, SessionState>,
    next_session: u32,
    max_sessions: u32,
}

struct SessionState {
    writer: BufWriter<TcpStream>,
}

impl Roster {
    pub fn new(max_sessions: u32) -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_session: 0,
            max_sessions,
        }
    }

    /// Attempt to add a session. On success the new session is sent
    /// `Welcome` with its freshly assigned identifier, which is also
    /// returned so the caller can tag the connection's reader thread.
    /// Returns an error reason string when the relay is full.
    pub fn add_session(&mut self, stream: TcpStream) -> Result<SessionId, String> {
        if self.sessions.len() as u32 >= self.max_sessions {
            return Err("relay is full".into());
        }

        let id = SessionId(format!("s{}", self.next_session));
        self.next_session += 1;

        let writer = BufWriter::new(stream);
        self.sessions.insert(id.clone(), SessionState { writer });

        let welcome = ServerMessage::Welcome {
            session_id: id.clone(),
        };
        self.send_to(&id, &welcome);

        info!(session = %id, "session connected");
        Ok(id)
    }

    /// Remove a session. Nobody else is told — the other side simply stops
    /// receiving moves.
    pub fn remove_session(&mut self, session_id: &SessionId) {
        if self.sessions.remove(session_id).is_some() {
            info!(session = %session_id, "session disconnected");
        }
    }

    /// Fan a move out to every connected session, tagged with its sender.
    /// The sender receives its own move back (the self-echo).
    pub fn relay_move(&mut self, sender: &SessionId, sequence: MoveSequence, payload: String) {
        debug!(session = %sender, %sequence, "relaying move");
        let msg = ServerMessage::Move {
            sender: sender.clone(),
            sequence,
            payload,
        };
        self.broadcast(&msg);
    }

    /// Number of connected sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Send a message to one session. Write errors are ignored; the reader
    /// thread reports the broken pipe as a disconnect.
    fn send_to(&mut self, session_id: &SessionId, msg: &ServerMessage) {
        if let Some(state) = self.sessions.get_mut(session_id) {
            let _ = send_message(&mut state.writer, msg);
        }
    }

    /// Send a message to every connected session.
    fn broadcast(&mut self, msg: &ServerMessage) {
        let ids: Vec<SessionId> = self.sessions.keys().cloned().collect();
        for id in ids {
            self.send_to(&id, msg);
        }
    }
}

/// Serialize a `ServerMessage` to JSON and write it with length-delimited
/// framing.
fn send_message(
    writer: &mut BufWriter<TcpStream>,
    msg: &ServerMessage,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_vec(msg)?;
    write_message(writer, &json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::BufReader;
    use std::net::TcpListener;
    use std::time::Duration;

    use gambit_protocol::framing::read_message;

    use super::*;

    /// Create a TCP pair: (client_stream, server_stream) on localhost.
    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    /// Read a ServerMessage from a TCP stream.
    fn recv_server_msg(stream: &mut BufReader<TcpStream>) -> ServerMessage {
        let bytes = read_message(stream).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// True when nothing arrives on the stream within a short window.
    fn stream_is_quiet(stream: &mut BufReader<TcpStream>) -> bool {
        stream
            .get_ref()
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        read_message(stream).is_err()
    }

    #[test]
    fn add_session_sends_welcome_with_assigned_id() {
        let (client, server) = tcp_pair();
        let mut roster = Roster::new(2);

        let id = roster.add_session(server).unwrap();
        assert_eq!(roster.session_count(), 1);

        let mut reader = BufReader::new(client);
        match recv_server_msg(&mut reader) {
            ServerMessage::Welcome { session_id } => assert_eq!(session_id, id),
            other => panic!("expected Welcome, got {other:?}"),
        }
    }

    #[test]
    fn session_ids_are_unique_across_reconnects() {
        let (_c1, s1) = tcp_pair();
        let (_c2, s2) = tcp_pair();
        let mut roster = Roster::new(2);

        let first = roster.add_session(s1).unwrap();
        roster.remove_session(&first);
        let second = roster.add_session(s2).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn add_session_refused_when_full() {
        let (_c1, s1) = tcp_pair();
        let (_c2, s2) = tcp_pair();
        let mut roster = Roster::new(1);

        roster.add_session(s1).unwrap();
        let err = roster.add_session(s2).unwrap_err();
        assert_eq!(err, "relay is full");
        assert_eq!(roster.session_count(), 1);
    }

    #[test]
    fn relay_move_reaches_all_sessions_including_sender() {
        let (c1, s1) = tcp_pair();
        let (c2, s2) = tcp_pair();
        let mut roster = Roster::new(2);

        let id1 = roster.add_session(s1).unwrap();
        let _id2 = roster.add_session(s2).unwrap();

        roster.relay_move(&id1, MoveSequence(0), "e2e4170255".into());

        for client in [c1, c2] {
            let mut reader = BufReader::new(client);
            let _welcome = recv_server_msg(&mut reader);
            match recv_server_msg(&mut reader) {
                ServerMessage::Move {
                    sender,
                    sequence,
                    payload,
                } => {
                    assert_eq!(sender, id1);
                    assert_eq!(sequence, MoveSequence(0));
                    assert_eq!(payload, "e2e4170255");
                }
                other => panic!("expected Move, got {other:?}"),
            }
        }
    }

    #[test]
    fn moves_arrive_in_relay_order() {
        let (c1, s1) = tcp_pair();
        let (_c2, s2) = tcp_pair();
        let mut roster = Roster::new(2);

        let id1 = roster.add_session(s1).unwrap();
        let id2 = roster.add_session(s2).unwrap();

        roster.relay_move(&id1, MoveSequence(0), "e2e4170255".into());
        roster.relay_move(&id2, MoveSequence(1), "e7e5340425".into());

        let mut reader = BufReader::new(c1);
        let _welcome = recv_server_msg(&mut reader);
        let senders: Vec<SessionId> = (0..2)
            .map(|_| match recv_server_msg(&mut reader) {
                ServerMessage::Move { sender, .. } => sender,
                other => panic!("expected Move, got {other:?}"),
            })
            .collect();
        assert_eq!(senders, vec![id1, id2]);
    }

    #[test]
    fn remove_session_is_silent() {
        let (c1, s1) = tcp_pair();
        let (_c2, s2) = tcp_pair();
        let mut roster = Roster::new(2);

        roster.add_session(s1).unwrap();
        let id2 = roster.add_session(s2).unwrap();

        roster.remove_session(&id2);
        assert_eq!(roster.session_count(), 1);

        let mut reader = BufReader::new(c1);
        let _welcome = recv_server_msg(&mut reader);
        assert!(stream_is_quiet(&mut reader), "departure must not broadcast");
    }

    #[test]
    fn late_joiner_misses_earlier_moves() {
        let (_c1, s1) = tcp_pair();
        let (c2, s2) = tcp_pair();
        let mut roster = Roster::new(2);

        let id1 = roster.add_session(s1).unwrap();
        roster.relay_move(&id1, MoveSequence(0), "e2e4170255".into());

        roster.add_session(s2).unwrap();
        roster.relay_move(&id1, MoveSequence(1), "d2d4255340".into());

        let mut reader = BufReader::new(c2);
        let _welcome = recv_server_msg(&mut reader);
        match recv_server_msg(&mut reader) {
            ServerMessage::Move { payload, .. } => assert_eq!(payload, "d2d4255340"),
            other => panic!("expected Move, got {other:?}"),
        }
        assert!(stream_is_quiet(&mut reader), "only the later move arrives");
    }

    #[test]
    fn relay_forwards_payload_without_parsing() {
        // The roster must not care that the payload is not a valid move.
        let (c1, s1) = tcp_pair();
        let mut roster = Roster::new(2);
        let id1 = roster.add_session(s1).unwrap();

        roster.relay_move(&id1, MoveSequence(3), "not-a-move".into());

        let mut reader = BufReader::new(c1);
        let _welcome = recv_server_msg(&mut reader);
        match recv_server_msg(&mut reader) {
            ServerMessage::Move { payload, .. } => assert_eq!(payload, "not-a-move"),
            other => panic!("expected Move, got {other:?}"),
        }
    }
}

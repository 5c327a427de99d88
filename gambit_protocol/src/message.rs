// Protocol messages for client-relay communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by game clients to the relay.
// - `ServerMessage`: sent by the relay to game clients.
//
// The relay treats move payloads as opaque strings — it never runs the move
// codec. Its one transformation is tagging: a `ClientMessage::Move` from
// session `s` is rebroadcast as `ServerMessage::Move` with `sender` set to
// `s`, to every connected session including `s` itself. The self-echo is a
// contract, not an accident: clients filter their own moves by comparing
// `sender` against the id they received in `Welcome`.
//
// All types derive `Serialize`/`Deserialize` for JSON framing (see
// `framing.rs`).

use serde::{Deserialize, Serialize};

use crate::types::{MoveSequence, SessionId};

/// Protocol revision. Bumped on any wire-format change; the relay rejects
/// clients whose `Hello` carries a different value.
pub const PROTOCOL_VERSION: u32 = 1;

/// Messages sent by a client to the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join the relay (handshake). Must be the first message on a
    /// connection.
    Hello { protocol_version: u32 },
    /// A played move. `payload` is the fixed-width codec output; `sequence`
    /// is the sender's ply count before the move was applied locally.
    Move {
        sequence: MoveSequence,
        payload: String,
    },
    /// Leaving gracefully.
    Goodbye,
}

/// Messages sent by the relay to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Handshake accepted; `session_id` is this connection's identity for
    /// the rest of the session.
    Welcome { session_id: SessionId },
    /// Handshake rejected; the relay closes the connection afterwards.
    Rejected { reason: String },
    /// A move relayed from `sender` — possibly the receiver itself.
    Move {
        sender: SessionId,
        sequence: MoveSequence,
        payload: String,
    },
}

// gambit_protocol — wire protocol for the board-sync relay.
//
// This crate defines everything the relay (`gambit_relay`) and game clients
// (`gambit_sync`) share over TCP. It has no dependency on board state or
// rendering.
//
// Module overview:
// - `types.rs`:   Core types — `SessionId`, `MoveSequence`, `Square`,
//                 `Move`, `Promotion`.
// - `codec.rs`:   The fixed-width move codec: 4 characters of algebraic
//                 notation plus two 3-digit pixel coordinates, 10 characters
//                 total.
// - `message.rs`: Client-to-relay and relay-to-client message enums.
// - `framing.rs`: Length-delimited framing over any `Read`/`Write` stream:
//                 4-byte big-endian length prefix, then JSON payload.
//
// Design decisions:
// - **JSON serialization.** Control messages are rare (one per ply) and
//   tiny; readability on the wire beats compactness here.
// - **Move payloads stay strings.** The relay forwards the codec output
//   verbatim and never decodes it, so the relay builds without any board
//   types.
// - **No async runtime.** Framing uses `std::io::Read`/`Write`, compatible
//   with blocking TCP streams and buffered wrappers.

pub mod codec;
pub mod framing;
pub mod message;
pub mod types;

pub use codec::{EncodeError, MalformedPayload, decode, encode};
pub use framing::{MAX_MESSAGE_SIZE, read_message, write_message};
pub use message::{ClientMessage, PROTOCOL_VERSION, ServerMessage};
pub use types::{Move, MoveSequence, Promotion, SessionId, Square};

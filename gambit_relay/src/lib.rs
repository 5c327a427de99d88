// gambit_relay — rules-agnostic fan-out relay for the Gambit board sync.
//
// The relay is a thin message broker: it accepts TCP connections from game
// clients, assigns each one an opaque session identifier, and rebroadcasts
// every received move — tagged with its sender — to all connected sessions,
// including the sender itself. It never interprets move payloads and holds
// no game state; legality lives entirely in the clients' rules oracles.
//
// Module overview:
// - `session.rs`: Roster of connected sessions — identity assignment and
//                 tagged fan-out. The data structure `server.rs` drives.
// - `server.rs`:  TCP listener, reader threads (one per session), and the
//                 main event loop. Uses `std::net` with a thread-per-reader
//                 architecture and an `mpsc` channel to funnel events into
//                 the single-threaded `Roster`.
// - `client.rs`:  `NetClient`, the connecting side — handshake, background
//                 reader thread, non-blocking `poll()`.
//
// Dependencies: `gambit_protocol` (shared message types and framing).
// No dependency on board state or rendering.
//
// The relay can run as a standalone binary (`main.rs`) or be embedded in a
// test or game process via the library API (`start_relay`).

pub mod client;
pub mod server;
pub mod session;

pub use client::{ClientError, NetClient};
pub use server::start_relay;

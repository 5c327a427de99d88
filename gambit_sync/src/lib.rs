// gambit_sync — one participant's side of the Gambit board sync.
//
// Each participant runs an independent local copy of the game state (the
// board mirror) and keeps it consistent with the opponent's copy through
// the rules-agnostic relay in `gambit_relay`. This crate owns the mirror
// and the synchronization logic; it deliberately implements neither the
// game's rules nor its rendering — both are consumed behind traits.
//
// Module overview:
// - `mirror.rs`: `BoardMirror` (value-semantics board state), piece types,
//                and the pixel/square geometry of the 680x680 surface.
// - `oracle.rs`: `RulesOracle` — the consumed legality/application
//                contract — and `IllegalMove`.
// - `sync.rs`:   `SyncClient` — the press/release input path, the
//                commit-encode-send pipeline, and the receive path with
//                self-echo filtering and sequence checking. Also the
//                consumed `Renderer` trait.
//
// Dependencies: `gambit_protocol` (codec, message types),
// `gambit_relay::client::NetClient` (the TCP connection).

pub mod mirror;
pub mod oracle;
pub mod sync;

pub use mirror::{BoardMirror, Piece, PieceKind, Side, cell_origin, square_at_pixel};
pub use oracle::{IllegalMove, RulesOracle};
pub use sync::{Renderer, SyncClient, SyncError, SyncPhase};

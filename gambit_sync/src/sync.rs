// The sync client — bridges pointer input, the rules oracle, the board
// mirror, and the relay connection for one participant.
//
// Per-session state machine:
// - `WaitingForLocalInput`: a press records the origin square, a release
//   proposes (origin, destination). The proposal is committed only when the
//   origin holds the participant's own piece and the pair is in the
//   oracle's legal set.
// - `LocalMoveCommitted`: the mirror has already been advanced; the next
//   `pump()` encodes the move, attaches the pre-move ply count as its
//   sequence number, and sends it.
// - `WaitingForRemote`: the relay's rebroadcast of our own move comes back
//   and is discarded by sender identity; the opponent's move is decoded,
//   applied through the oracle without a legal-set re-check, and rendered.
//
// Inbound messages are serviced in every phase — the participant who moves
// second receives the opening move while still waiting for local input.
// Turn order is never enforced in-band: an out-of-turn local attempt dies
// on the legal-move check, and the sequence number on each relayed move
// gives both sides the same deterministic winner if the relay ever carries
// two moves for the same ply (first one in applies, the loser is logged
// and dropped).
//
// The embedding loop is single-threaded and cooperative: it feeds pointer
// events through `on_press`/`on_release` and calls `pump()` between them.
// Neither call blocks — `NetClient` keeps its blocking reads on a
// background thread — so input and network service each other fairly.
//
// Failure semantics: anything wrong with a received message (malformed
// payload, stale sequence, oracle refusal) is logged and discarded without
// touching the mirror. `ConnectionLost` is fatal: once `pump()` reports
// it, no further sends are attempted.

use gambit_protocol::codec;
use gambit_protocol::message::ServerMessage;
use gambit_protocol::types::{Move, MoveSequence, SessionId, Square};
use gambit_relay::client::NetClient;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::mirror::{BoardMirror, Side, cell_origin, square_at_pixel};
use crate::oracle::RulesOracle;

/// Display surface for the mirror. Side-effecting; the sync client relies
/// on no return value.
pub trait Renderer {
    fn render(&mut self, state: &BoardMirror);
}

/// Where the client is in its send/receive cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    WaitingForLocalInput,
    LocalMoveCommitted,
    WaitingForRemote,
}

/// Errors surfaced by the sync loop.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The relay connection is gone. Fatal for the session — reconnection
    /// is not supported.
    #[error("relay connection lost")]
    ConnectionLost,
}

/// A locally committed move awaiting its trip to the relay.
struct PendingSend {
    mv: Move,
    sequence: MoveSequence,
    dest_px: (u16, u16),
}

/// One participant's sync client.
pub struct SyncClient<O, R> {
    net: NetClient,
    oracle: O,
    renderer: R,
    side: Side,
    mirror: BoardMirror,
    phase: SyncPhase,
    grabbed: Option<Square>,
    pending: Option<PendingSend>,
    last_remote_px: Option<(u16, u16)>,
    lost: bool,
}

impl<O: RulesOracle, R: Renderer> SyncClient<O, R> {
    /// Wrap an established relay connection. The mirror starts from the
    /// standard opening position.
    pub fn new(net: NetClient, oracle: O, renderer: R, side: Side) -> Self {
        Self {
            net,
            oracle,
            renderer,
            side,
            mirror: BoardMirror::starting_position(),
            phase: SyncPhase::WaitingForLocalInput,
            grabbed: None,
            pending: None,
            last_remote_px: None,
            lost: false,
        }
    }

    /// The relay-assigned identity of this participant's connection.
    pub fn session_id(&self) -> &SessionId {
        self.net.session_id()
    }

    /// The current local board state.
    pub fn mirror(&self) -> &BoardMirror {
        &self.mirror
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// The display surface, for embedders that own state on it.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Destination pixel pair from the most recent remote move — rendering
    /// metadata for display layers that animate toward the wire
    /// coordinates.
    pub fn last_remote_pixels(&self) -> Option<(u16, u16)> {
        self.last_remote_px
    }

    /// Pointer pressed over the board: remember the square under the
    /// cursor as the origin of a proposed move.
    pub fn on_press(&mut self, x: u16, y: u16) {
        self.grabbed = square_at_pixel(x, y);
    }

    /// Pointer released: propose (recorded origin, square under cursor) as
    /// a move. Illegal proposals change nothing and send nothing.
    pub fn on_release(&mut self, x: u16, y: u16) {
        let Some(origin) = self.grabbed.take() else {
            return;
        };
        let Some(dest) = square_at_pixel(x, y) else {
            debug!(%origin, "release off the board");
            return;
        };
        self.try_commit(origin, dest);
    }

    /// Validate a proposed move against the oracle and, when legal, apply
    /// it locally and queue it for sending.
    fn try_commit(&mut self, origin: Square, dest: Square) {
        match self.mirror.piece_at(origin) {
            Some(piece) if piece.side == self.side => {}
            _ => {
                debug!(%origin, "origin does not hold one of our pieces");
                return;
            }
        }

        let candidate = self
            .oracle
            .legal_moves(&self.mirror)
            .into_iter()
            .find(|m| m.from == origin && m.to == dest);
        let Some(mv) = candidate else {
            info!(%origin, %dest, "rejected illegal local move");
            return;
        };
        if mv.promotion.is_some() {
            warn!(%mv, "promotion moves have no wire representation; not committed");
            return;
        }

        // Capture the pre-move ply count — the receiver applies this move
        // only when its own mirror sits at the same count.
        let sequence = self.mirror.ply();
        match self.oracle.apply(&self.mirror, mv) {
            Ok(next) => {
                self.mirror = next;
                self.pending = Some(PendingSend {
                    mv,
                    sequence,
                    dest_px: cell_origin(dest),
                });
                self.phase = SyncPhase::LocalMoveCommitted;
                self.renderer.render(&self.mirror);
                info!(%mv, %sequence, "committed local move");
            }
            Err(e) => warn!(error = %e, "oracle refused a move from its own legal set"),
        }
    }

    /// Service the network: flush a committed move, then drain and handle
    /// everything the relay delivered. Non-blocking.
    pub fn pump(&mut self) -> Result<(), SyncError> {
        if self.lost {
            return Err(SyncError::ConnectionLost);
        }
        self.flush_pending()?;

        let messages = match self.net.poll() {
            Ok(messages) => messages,
            Err(_) => {
                self.lost = true;
                return Err(SyncError::ConnectionLost);
            }
        };
        for msg in messages {
            self.handle_server_message(msg);
        }
        Ok(())
    }

    /// Send Goodbye; the relay drops this session on receipt.
    pub fn disconnect(&mut self) {
        self.net.disconnect();
    }

    fn flush_pending(&mut self) -> Result<(), SyncError> {
        if self.phase != SyncPhase::LocalMoveCommitted {
            return Ok(());
        }
        let Some(pending) = self.pending.take() else {
            self.phase = SyncPhase::WaitingForRemote;
            return Ok(());
        };

        match codec::encode(pending.mv, pending.dest_px.0, pending.dest_px.1) {
            Ok(payload) => {
                if self.net.send_move(pending.sequence, &payload).is_err() {
                    self.lost = true;
                    return Err(SyncError::ConnectionLost);
                }
                self.phase = SyncPhase::WaitingForRemote;
                debug!(%payload, "sent move to relay");
                Ok(())
            }
            Err(e) => {
                // Unreachable for committed moves: promotions are refused at
                // commit time and cell origins fit in three digits.
                error!(error = %e, "dropping unencodable committed move");
                self.phase = SyncPhase::WaitingForLocalInput;
                Ok(())
            }
        }
    }

    fn handle_server_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Move {
                sender,
                sequence,
                payload,
            } => {
                if &sender == self.net.session_id() {
                    debug!(%sequence, "discarding self-echo");
                    return;
                }
                if sequence != self.mirror.ply() {
                    warn!(
                        got = %sequence,
                        expected = %self.mirror.ply(),
                        "discarding out-of-sequence move"
                    );
                    return;
                }
                let (mv, dest_x, dest_y) = match codec::decode(&payload) {
                    Ok(decoded) => decoded,
                    Err(e) => {
                        warn!(error = %e, "discarding malformed move payload");
                        return;
                    }
                };
                // Trusted: relayed moves are applied without a legal-set
                // re-check. The oracle can still refuse; the mirror is
                // untouched in that case.
                match self.oracle.apply(&self.mirror, mv) {
                    Ok(next) => {
                        self.mirror = next;
                        self.last_remote_px = Some((dest_x, dest_y));
                        self.renderer.render(&self.mirror);
                        self.phase = SyncPhase::WaitingForLocalInput;
                        info!(%mv, from = %sender, "applied remote move");
                    }
                    Err(e) => warn!(error = %e, "remote move refused by oracle"),
                }
            }
            ServerMessage::Welcome { .. } | ServerMessage::Rejected { .. } => {
                warn!("unexpected handshake message after connect");
            }
        }
    }
}

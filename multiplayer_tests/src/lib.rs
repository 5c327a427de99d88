// Test-only participant harness for multiplayer integration tests.
//
// Wraps a real `SyncClient` (from `gambit_sync`) over a real `NetClient`
// (from `gambit_relay::client`) to provide a synchronous, test-friendly
// API for exercising the full pipeline:
// press/release → oracle → codec → relay → fan-out → echo filter → apply.
//
// The only test-specific code is the blocking poll wrappers and the
// deliberately permissive `RelocationOracle` — everything on the wire uses
// the same code paths as a real game client.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use gambit_protocol::types::{Move, Square};
use gambit_relay::client::NetClient;
use gambit_sync::mirror::{BoardMirror, Side, cell_origin};
use gambit_sync::oracle::{IllegalMove, RulesOracle};
use gambit_sync::sync::{Renderer, SyncClient, SyncError, SyncPhase};

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Permissive rules oracle for tests: any relocation of a piece belonging
/// to the side to move is legal. Turn alternation and occupancy are the
/// only rules it knows — enough to exercise synchronization without
/// dragging chess logic into the test bed.
pub struct RelocationOracle;

impl RulesOracle for RelocationOracle {
    fn legal_moves(&self, state: &BoardMirror) -> Vec<Move> {
        let mut moves = Vec::new();
        for from in all_squares() {
            let Some(piece) = state.piece_at(from) else {
                continue;
            };
            if piece.side != state.side_to_move() {
                continue;
            }
            for to in all_squares() {
                if to != from {
                    moves.push(Move::new(from, to));
                }
            }
        }
        moves
    }

    fn apply(&self, state: &BoardMirror, mv: Move) -> Result<BoardMirror, IllegalMove> {
        match state.piece_at(mv.from) {
            Some(piece) if piece.side == state.side_to_move() => {
                state.with_move_applied(mv).ok_or(IllegalMove { mv })
            }
            _ => Err(IllegalMove { mv }),
        }
    }
}

fn all_squares() -> impl Iterator<Item = Square> {
    (0..8u8).flat_map(|file| (0..8u8).map(move |rank| Square::from_indices(file, rank).unwrap()))
}

/// Renderer that records how many frames were drawn.
#[derive(Default)]
pub struct RecordingRenderer {
    pub frames: usize,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, _state: &BoardMirror) {
        self.frames += 1;
    }
}

/// A test participant wrapping a real `SyncClient`.
pub struct TestParticipant {
    pub client: SyncClient<RelocationOracle, RecordingRenderer>,
}

impl TestParticipant {
    /// Connect to a relay and perform the handshake.
    pub fn connect(addr: SocketAddr, side: Side) -> Self {
        let net =
            NetClient::connect(&addr.to_string()).expect("TestParticipant::connect failed");
        Self {
            client: SyncClient::new(net, RelocationOracle, RecordingRenderer::default(), side),
        }
    }

    /// Simulate a drag: press on the origin square's cell, release on the
    /// destination square's cell.
    pub fn drag(&mut self, from: &str, to: &str) {
        let (fx, fy) = cell_origin(from.parse().expect("bad origin square"));
        let (tx, ty) = cell_origin(to.parse().expect("bad destination square"));
        self.client.on_press(fx + 40, fy + 40);
        self.client.on_release(tx + 40, ty + 40);
    }

    /// One non-blocking service pass.
    pub fn pump(&mut self) -> Result<(), SyncError> {
        self.client.pump()
    }

    /// Blocking pump until the mirror has `ply` plies applied.
    pub fn pump_until_ply(&mut self, ply: u64) {
        let start = Instant::now();
        while self.client.mirror().ply().0 < ply {
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for ply {ply}, at {}",
                self.client.mirror().ply()
            );
            self.client.pump().expect("pump failed while waiting");
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Pump for a fixed window, asserting the connection stays up. Used to
    /// let echoes and stray messages arrive when nothing observable is
    /// expected to change.
    pub fn pump_for(&mut self, window: Duration) {
        let start = Instant::now();
        while start.elapsed() < window {
            self.client.pump().expect("pump failed");
            thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn mirror(&self) -> &BoardMirror {
        self.client.mirror()
    }

    pub fn phase(&self) -> SyncPhase {
        self.client.phase()
    }

    pub fn frames(&self) -> usize {
        self.client.renderer().frames
    }

    /// Send Goodbye.
    pub fn disconnect(&mut self) {
        self.client.disconnect();
    }
}

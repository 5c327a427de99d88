// End-to-end integration tests for the board-sync pipeline.
//
// Each test starts a real relay, connects real sync clients (via
// TestParticipant) or raw NetClients (for injecting hostile traffic), and
// verifies the full path:
// press/release → oracle check → codec → relay fan-out → echo filter →
// trusted apply → render.
//
// These tests exercise the same code paths as a live game; the only
// test-specific pieces are the permissive RelocationOracle and the
// synchronous polling wrappers in the harness crate.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use gambit_protocol::types::MoveSequence;
use gambit_relay::client::NetClient;
use gambit_relay::server::{RelayConfig, RelayHandle, start_relay};
use gambit_sync::mirror::{BoardMirror, PieceKind, Side};
use gambit_sync::sync::SyncPhase;
use multiplayer_tests::TestParticipant;

/// Window long enough for anything in flight to arrive.
const SETTLE: Duration = Duration::from_millis(250);

fn start(max_sessions: u32) -> (RelayHandle, SocketAddr) {
    let (handle, addr) = start_relay(RelayConfig {
        port: 0,
        max_sessions,
    })
    .unwrap();
    thread::sleep(Duration::from_millis(50));
    (handle, addr)
}

fn sq(s: &str) -> gambit_protocol::types::Square {
    s.parse().unwrap()
}

// ---------------------------------------------------------------------------
// Test scenarios
// ---------------------------------------------------------------------------

/// The canonical opening exchange: White plays e2–e4, Black's mirror
/// follows, White discards its own echo.
#[test]
fn end_to_end_opening_move() {
    let (handle, addr) = start(2);
    let mut white = TestParticipant::connect(addr, Side::White);
    let mut black = TestParticipant::connect(addr, Side::Black);

    white.drag("e2", "e4");
    assert_eq!(white.phase(), SyncPhase::LocalMoveCommitted);
    assert_eq!(white.frames(), 1, "local commit re-renders");

    white.pump().unwrap();
    assert_eq!(white.phase(), SyncPhase::WaitingForRemote);

    black.pump_until_ply(1);
    assert_eq!(black.mirror(), white.mirror());
    assert_eq!(
        black.mirror().piece_at(sq("e4")).map(|p| p.kind),
        Some(PieceKind::Pawn)
    );
    assert_eq!(black.mirror().piece_at(sq("e2")), None);
    assert_eq!(black.frames(), 1, "remote apply re-renders");
    assert_eq!(black.phase(), SyncPhase::WaitingForLocalInput);

    // The wire carried the destination's cell origin as rendering metadata.
    assert_eq!(black.client.last_remote_pixels(), Some((340, 340)));

    // White's echo arrives and is filtered: applied exactly once.
    white.pump_for(SETTLE);
    assert_eq!(white.mirror().ply().0, 1);
    assert_eq!(white.frames(), 1, "echo must not re-render");

    white.disconnect();
    black.disconnect();
    handle.stop();
}

/// Moves alternate across several plies and both mirrors stay identical.
#[test]
fn alternating_moves_converge() {
    let (handle, addr) = start(2);
    let mut white = TestParticipant::connect(addr, Side::White);
    let mut black = TestParticipant::connect(addr, Side::Black);

    let exchanges = [("e2", "e4"), ("e7", "e5"), ("g1", "f3"), ("b8", "c6")];
    for (i, (from, to)) in exchanges.iter().enumerate() {
        let (mover, follower) = if i % 2 == 0 {
            (&mut white, &mut black)
        } else {
            (&mut black, &mut white)
        };
        mover.drag(from, to);
        mover.pump().unwrap();
        let target = (i + 1) as u64;
        follower.pump_until_ply(target);
        mover.pump_until_ply(target);
        assert_eq!(mover.mirror(), follower.mirror(), "mismatch after ply {target}");
    }

    assert_eq!(white.mirror().ply().0, 4);
    // Two local commits + two remote applies each.
    assert_eq!(white.frames(), 4);
    assert_eq!(black.frames(), 4);

    white.disconnect();
    black.disconnect();
    handle.stop();
}

/// A participant who tries to move out of turn sends nothing and the
/// opponent sees nothing.
#[test]
fn out_of_turn_attempt_stays_local() {
    let (handle, addr) = start(2);
    let mut white = TestParticipant::connect(addr, Side::White);
    let mut black = TestParticipant::connect(addr, Side::Black);

    black.drag("e7", "e5"); // white to move at ply 0
    black.pump().unwrap();

    white.pump_for(SETTLE);
    assert_eq!(white.mirror(), &BoardMirror::starting_position());
    assert_eq!(black.mirror(), &BoardMirror::starting_position());
    assert_eq!(black.frames(), 0);

    handle.stop();
}

/// Malformed payloads are logged and dropped without corrupting the
/// mirror or killing the receive loop.
#[test]
fn malformed_payloads_are_isolated() {
    let (handle, addr) = start(2);
    let mut receiver = TestParticipant::connect(addr, Side::Black);
    let mut injector = NetClient::connect(&addr.to_string()).unwrap();

    // Wrong length, bad squares, non-digit coordinates — all at the
    // sequence the receiver expects.
    for junk in ["zzzz", "i9e4170255", "e2e4xx0255", "e2e417025"] {
        injector.send_move(MoveSequence(0), junk).unwrap();
    }
    receiver.pump_for(SETTLE);
    assert_eq!(receiver.mirror(), &BoardMirror::starting_position());
    assert_eq!(receiver.frames(), 0);

    // The loop is still alive: a well-formed move goes straight through.
    injector.send_move(MoveSequence(0), "e2e4170255").unwrap();
    receiver.pump_until_ply(1);
    assert_eq!(
        receiver.mirror().piece_at(sq("e4")).map(|p| p.kind),
        Some(PieceKind::Pawn)
    );

    handle.stop();
}

/// A move carrying a stale or future sequence number is discarded.
#[test]
fn out_of_sequence_moves_are_rejected() {
    let (handle, addr) = start(2);
    let mut receiver = TestParticipant::connect(addr, Side::Black);
    let mut injector = NetClient::connect(&addr.to_string()).unwrap();

    injector.send_move(MoveSequence(5), "e2e4170255").unwrap();
    receiver.pump_for(SETTLE);
    assert_eq!(receiver.mirror(), &BoardMirror::starting_position());

    injector.send_move(MoveSequence(0), "e2e4170255").unwrap();
    receiver.pump_until_ply(1);
    assert_eq!(receiver.mirror().ply().0, 1);

    handle.stop();
}

/// Two senders race a move for the same ply: relay receipt order decides,
/// the loser is dropped, and the mirror advances exactly one ply.
#[test]
fn same_ply_race_has_a_deterministic_winner() {
    let (handle, addr) = start(3);
    let mut receiver = TestParticipant::connect(addr, Side::Black);
    let mut first = NetClient::connect(&addr.to_string()).unwrap();
    let mut second = NetClient::connect(&addr.to_string()).unwrap();

    first.send_move(MoveSequence(0), "e2e4170255").unwrap();
    // Pin relay receipt order before the rival move goes out.
    thread::sleep(Duration::from_millis(100));
    second.send_move(MoveSequence(0), "d2d4255340").unwrap();

    receiver.pump_until_ply(1);
    receiver.pump_for(SETTLE);

    assert_eq!(receiver.mirror().ply().0, 1, "exactly one winner applies");
    assert!(receiver.mirror().piece_at(sq("e4")).is_some());
    assert!(
        receiver.mirror().piece_at(sq("d2")).is_some(),
        "losing move must not touch the mirror"
    );
    assert_eq!(receiver.mirror().piece_at(sq("d4")), None);

    handle.stop();
}

/// After a graceful Goodbye the connection winds down and the local loop
/// reports ConnectionLost; the opponent notices nothing.
#[test]
fn goodbye_surfaces_connection_lost_locally_only() {
    let (handle, addr) = start(2);
    let mut leaver = TestParticipant::connect(addr, Side::White);
    let mut stayer = TestParticipant::connect(addr, Side::Black);

    leaver.disconnect();

    // The leaver's own loop eventually reports the loss...
    let start = Instant::now();
    let lost = loop {
        if leaver.pump().is_err() {
            break true;
        }
        if start.elapsed() > Duration::from_secs(5) {
            break false;
        }
        thread::sleep(Duration::from_millis(10));
    };
    assert!(lost, "pump should report ConnectionLost after Goodbye");

    // ...and every later pump fails fast.
    assert!(leaver.pump().is_err());

    // The opponent is not told (no departure notification by design).
    stayer.pump_for(SETTLE);
    assert_eq!(stayer.mirror(), &BoardMirror::starting_position());

    handle.stop();
}

/// A session that joins after traffic has flowed starts from a clean
/// stream — no replay of earlier moves.
#[test]
fn late_joiner_sees_no_history() {
    let (handle, addr) = start(2);
    let mut injector = NetClient::connect(&addr.to_string()).unwrap();
    injector.send_move(MoveSequence(0), "e2e4170255").unwrap();
    thread::sleep(Duration::from_millis(100));

    let mut late = TestParticipant::connect(addr, Side::Black);
    late.pump_for(SETTLE);
    assert_eq!(late.mirror(), &BoardMirror::starting_position());

    handle.stop();
}

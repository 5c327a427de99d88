// CLI entry point for the Gambit relay.
//
// Starts a standalone relay that game clients connect to. The relay tags
// each move with its sender's session id and fans it out to every
// connected session — it never looks inside a move. See `server.rs` for
// the networking architecture and `session.rs` for the roster.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gambit_relay::server::{RelayConfig, start_relay};

#[derive(Parser)]
#[command(name = "relay", about = "Fan-out move relay for Gambit")]
struct Args {
    /// Listen port (0 lets the OS pick)
    #[arg(long, default_value_t = 7878)]
    port: u16,

    /// Maximum concurrent sessions
    #[arg(long, default_value_t = 2)]
    max_sessions: u32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = RelayConfig {
        port: args.port,
        max_sessions: args.max_sessions,
    };

    let (_handle, addr) = match start_relay(config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("failed to start relay: {e}");
            std::process::exit(1);
        }
    };

    info!(%addr, "relay listening");

    // The relay runs on background threads; park the main thread until the
    // process is killed (SIGINT/SIGTERM terminate it, which tears the
    // sessions down with it — sessions are not persisted across restarts).
    loop {
        std::thread::park();
    }
}

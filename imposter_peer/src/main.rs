// CLI entry point for the Imposter room directory.
//
// Runs a standalone directory server that hosts register room codes with and
// joiners resolve them through. It never sees game traffic: once a joiner has
// the host's address, host and joiner talk directly. See `server.rs` for the
// networking architecture and `registry.rs` for the room state.
//
// Usage:
//   directory [OPTIONS]
//     --port <PORT>    Listen port (default: 7878)
//     --bind <ADDR>    Bind address (default: 127.0.0.1)
//
// Log verbosity follows `RUST_LOG` (default: info).

use imposter_peer::server::{DirectoryConfig, start_directory};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = parse_args();

    let (handle, addr) = match start_directory(config) {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "failed to start directory");
            std::process::exit(1);
        }
    };

    info!(%addr, "directory ready; stop with Ctrl+C");
    handle.wait();
}

/// Parse command-line arguments into a `DirectoryConfig`.
fn parse_args() -> DirectoryConfig {
    let mut config = DirectoryConfig::default();
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                config.port = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--port requires a valid port number");
                    std::process::exit(1);
                });
            }
            "--bind" => {
                i += 1;
                config.bind_address = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--bind requires an address");
                    std::process::exit(1);
                });
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config
}

fn print_usage() {
    println!("Usage: directory [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --port <PORT>    Listen port (default: 7878)");
    println!("  --bind <ADDR>    Bind address (default: 127.0.0.1)");
    println!("  --help, -h       Show this help");
}

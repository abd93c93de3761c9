use std::env;
use std::net::TcpListener;
use std::process::ExitCode;

use presence::{serve, RealtimeHub, DEFAULT_BIND_ADDR};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();
    match run_server() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!(error = %message, "presence_server_failed");
            ExitCode::from(1)
        }
    }
}

fn run_server() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let mut bind_addr = DEFAULT_BIND_ADDR.to_string();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => {
                println!("{}", usage_text());
                return Ok(());
            }
            "--bind" => {
                bind_addr = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --bind".to_string())?
                    .clone();
                index += 2;
            }
            other => return Err(format!("unknown argument '{other}'\n{}", usage_text())),
        }
    }

    let listener = TcpListener::bind(&bind_addr)
        .map_err(|error| format!("failed to bind {bind_addr}: {error}"))?;
    info!(bind = %bind_addr, "=== Presence Server Startup ===");
    serve(listener, RealtimeHub::new()).map_err(|error| format!("server stopped: {error}"))
}

fn usage_text() -> String {
    format!("usage: presence_server [--bind ADDR]\n  default ADDR: {DEFAULT_BIND_ADDR}")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

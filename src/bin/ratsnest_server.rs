//! Stdio ratsnest server: one JSON-RPC request per line on stdin, one
//! response per line on stdout. Logs go to stderr (filter with RUST_LOG).

use anyhow::Context;
use ratsnest_engine::server::{dispatch, error_codes, Request, Response, ServerState};
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn write_response(out: &mut impl Write, response: &Response) -> anyhow::Result<()> {
    let json = serde_json::to_string(response).context("Failed to serialize response")?;
    writeln!(out, "{}", json)?;
    out.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    tracing::info!("[Server] Starting ratsnest server...");
    let mut state = ServerState::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!("[Server] Error reading stdin: {}", e);
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                let method = request.method.clone();
                let response = dispatch(&mut state, request);
                if response.is_error() {
                    tracing::debug!("[Server] {} returned an error", method);
                }
                response
            }
            Err(e) => {
                tracing::warn!("[Server] Failed to parse request: {}", e);
                Response::error(None, error_codes::PARSE_ERROR, format!("Parse error: {}", e))
            }
        };

        write_response(&mut stdout, &response)?;
    }

    tracing::info!("[Server] stdin closed, shutting down");
    Ok(())
}

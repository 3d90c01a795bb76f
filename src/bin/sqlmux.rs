//! sqlmux — line-oriented host for the bridge
//!
//! Reads one JSON call per line on stdin and answers with one JSON response
//! per line on stdout, the same way an embedded script runtime would call
//! into the bridge. Besides the bridge operations the host answers `exit`
//! and `remove`, the script runtime's process bindings.
//!
//! # Usage
//!
//! ```bash
//! printf '%s\n' \
//!   '{"op":"open","args":[":memory:"]}' \
//!   '{"op":"exec","args":[0,"CREATE TABLE t(v TEXT)"]}' \
//!   '{"op":"query","args":[0,"SELECT * FROM t"]}' | sqlmux
//! ```

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use colored::*;
use serde::Deserialize;
use sqlmux::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlmux")]
#[command(version)]
#[command(about = "Dynamic-call bridge to SQL databases", long_about = None)]
#[command(after_help = "REQUESTS (one per line):
    {\"op\": \"open\", \"args\": [\"app.db\"]}
    {\"op\": \"query\", \"args\": [0, \"SELECT * FROM users WHERE id = ?\", 7]}
    {\"op\": \"remove\", \"args\": [\"app.db\"]}
    {\"op\": \"exit\", \"args\": [0]}")]
struct Cli {
    /// Configuration file (defaults to <config dir>/sqlmux/config.toml)
    #[arg(short, long, env = "SQLMUX_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, written to stderr
    #[arg(short, long, env = "SQLMUX_LOG")]
    log: Option<String>,

    /// Don't create missing SQLite files on open
    #[arg(long)]
    no_create: bool,
}

#[derive(Deserialize)]
struct Request {
    op: String,
    #[serde(default)]
    args: Vec<Value>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        BridgeConfig::discover(cli.config.as_deref()).context("loading configuration")?;
    if let Some(log) = cli.log {
        config.log = log;
    }
    if cli.no_create {
        config.create_if_missing = false;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log))
        .with_writer(io::stderr)
        .init();

    // Panics are recovered per call; keep them off the caller's terminal.
    std::panic::set_hook(Box::new(|info| {
        tracing::debug!(%info, "panic inside bridge call");
    }));

    let mut bridge = Bridge::new(&config).context("starting bridge")?;

    if io::stdin().is_terminal() {
        eprintln!("{}", "sqlmux — one JSON request per line".cyan().bold());
        eprintln!("{}", "Send {\"op\":\"exit\",\"args\":[0]} or Ctrl+D to quit.".dimmed());
    }

    let code = serve(&mut bridge, io::stdin().lock(), io::stdout().lock())?;
    bridge.shutdown();
    std::process::exit(code);
}

/// Answer requests until EOF or `exit`; returns the exit code.
fn serve(bridge: &mut Bridge, input: impl BufRead, mut output: impl Write) -> anyhow::Result<i32> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) if request.op == "exit" => {
                let code = request
                    .args
                    .first()
                    .and_then(Value::as_integer)
                    .unwrap_or(0);
                return Ok(code.clamp(i32::MIN.into(), i32::MAX.into()) as i32);
            }
            Ok(request) if request.op == "remove" => remove(&request.args),
            Ok(request) => bridge.dispatch(&request.op, &request.args),
            Err(e) => {
                tracing::warn!(error = %e, "malformed request");
                let found = format!("malformed request ({})", e);
                Response::failure(
                    Outcome::None,
                    SqlmuxError::argument("request", 0, "JSON object", found),
                )
            }
        };

        serde_json::to_writer(&mut output, &response)?;
        output.write_all(b"\n")?;
        output.flush()?;
    }
    Ok(0)
}

/// Delete the file `args[0]`, typically a database the script is done with.
fn remove(args: &[Value]) -> Response {
    let path = match args {
        [Value::String(path)] => path,
        [Value::String(_), extra, ..] => return invalid_remove(1, extra.type_name()),
        [other, ..] => return invalid_remove(0, other.type_name()),
        [] => return invalid_remove(0, "missing"),
    };

    tracing::debug!(%path, "removing file");
    let result = std::fs::remove_file(path)
        .map(|()| Outcome::None)
        .map_err(SqlmuxError::from);
    Response::from_result(result)
}

fn invalid_remove(position: usize, found: &'static str) -> Response {
    let expected = if position == 0 { "string" } else { "no argument" };
    Response::failure(
        Outcome::None,
        SqlmuxError::argument("remove", position, expected, found),
    )
}

mod backup;
mod config;
mod db;
mod error;
mod export;
mod grouping;
mod history;
mod ipc;
mod model;
mod roster;
mod session;
mod store;

use std::io::{self, BufRead, Write};

fn main() {
    let cfg = config::Config::from_env();
    config::init_tracing(&cfg.log_filter);

    let mut state = ipc::AppState::new();
    if let Some(path) = cfg.workspace.as_ref() {
        match state.open_workspace(path) {
            Ok(()) => tracing::info!(workspace = %path.display(), "workspace opened from environment"),
            Err(e) => tracing::warn!(workspace = %path.display(), "failed to open workspace: {e}"),
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let reply = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", reply);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    // Closing the channel saves an open grouping, like any other close.
    if let Err(e) = state.close_session() {
        tracing::warn!("open grouping not saved at shutdown: {e}");
    }
}

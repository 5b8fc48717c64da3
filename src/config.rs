use std::path::PathBuf;

const LOG_ENV: &str = "ROSTERD_LOG";
const WORKSPACE_ENV: &str = "ROSTERD_WORKSPACE";
const DEFAULT_LOG_FILTER: &str = "rosterd=info";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_filter: String,
    /// Workspace opened at startup, before any `workspace.select`.
    pub workspace: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        let log_filter = std::env::var(LOG_ENV)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let workspace = std::env::var_os(WORKSPACE_ENV)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        Config {
            log_filter,
            workspace,
        }
    }
}

/// Logs go to stderr; stdout carries the protocol.
pub fn init_tracing(filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

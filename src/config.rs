//! Runtime configuration for the service.
//!
//! Populated by the CLI layer; file-based loading belongs to the outer
//! service supervisor and stays out of the core.

use serde::{Deserialize, Serialize};

/// Service configuration. Field semantics follow the user-facing
/// settings the pipeline reads at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Primary user-configured reader, as a `driver:path` string.
    pub connection_string: String,
    /// Extra reader device strings to keep connected.
    pub readers: Vec<String>,
    /// Terminate running software when its token is removed.
    pub exit_game: bool,
    /// Grace period in seconds between removal and the kill action.
    pub exit_game_delay: u64,
    /// Launcher names exempt from exit-on-removal.
    pub exit_game_blocklist: Vec<String>,
    /// Permit shell-class commands without a mapping match.
    pub allow_shell: bool,
    /// Suppress success/failure audio cues.
    pub disable_sounds: bool,
    /// Store file for mappings and history.
    pub db_path: std::path::PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            readers: Vec::new(),
            exit_game: false,
            exit_game_delay: 0,
            exit_game_blocklist: Vec::new(),
            allow_shell: false,
            disable_sounds: false,
            db_path: std::path::PathBuf::from("tapd.db"),
        }
    }
}

impl Config {
    /// Whether `launcher` is excluded from exit-on-removal. Comparison
    /// is case-insensitive, matching how launcher names are reported.
    pub fn in_exit_blocklist(&self, launcher: &str) -> bool {
        self.exit_game_blocklist
            .iter()
            .any(|b| b.eq_ignore_ascii_case(launcher))
    }
}

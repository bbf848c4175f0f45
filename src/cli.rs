use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tapd", about = "Token scan to launch-action daemon")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the scan-to-launch service
    Serve {
        /// Primary reader device, as driver:path (e.g. file:/tmp/tap)
        #[arg(long, default_value = "")]
        reader: String,

        /// Extra reader device to keep connected (repeatable)
        #[arg(long = "extra-reader")]
        extra_readers: Vec<String>,

        /// Stop running software when its token is removed
        #[arg(long)]
        exit_game: bool,

        /// Grace period in seconds before exit-on-removal fires
        #[arg(long, default_value_t = 0)]
        exit_game_delay: u64,

        /// Launcher name exempt from exit-on-removal (repeatable)
        #[arg(long = "exit-game-blocklist")]
        exit_game_blocklist: Vec<String>,

        /// Allow shell commands without a mapping match
        #[arg(long)]
        allow_shell: bool,

        /// Disable success/failure sounds
        #[arg(long)]
        disable_sounds: bool,

        /// Root folder probed for relative launch paths (repeatable)
        #[arg(long = "root-folder")]
        root_folders: Vec<PathBuf>,

        /// Store file for mappings and history
        #[arg(long, default_value = "tapd.db")]
        db: PathBuf,
    },

    /// Inspect or edit stored mapping overrides
    Mappings {
        #[arg(long, default_value = "tapd.db")]
        db: PathBuf,

        #[command(subcommand)]
        action: MappingsAction,
    },

    /// Show recent scan history, newest first
    History {
        #[arg(long, default_value = "tapd.db")]
        db: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum MappingsAction {
    /// List stored mappings
    List,

    /// Add a mapping
    Add {
        #[arg(long, default_value = "")]
        label: String,

        /// Token field to match: uid, text or data
        #[arg(long)]
        kind: String,

        /// Comparison: exact, partial or regex
        #[arg(long = "match", default_value = "exact")]
        match_kind: String,

        #[arg(long)]
        pattern: String,

        /// Replacement launch text
        #[arg(long)]
        override_text: String,

        /// Store the mapping disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Delete a mapping by id
    Delete { id: String },
}

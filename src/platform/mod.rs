//! Platform abstraction — capability traits for host integration.
//!
//! The core never talks to an OS directly. Each concern (launching,
//! input simulation, sounds, media lookup, command forwarding, reader
//! support) is its own trait; a concrete platform implements the set
//! and the system composes them behind the [`Platform`] supertrait.

pub mod desktop;
#[cfg(test)]
pub mod mock;

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::reader::Reader;
use crate::token::Token;

/// Errors surfaced by platform adapters.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("launch: {0}")]
    Launch(String),
    #[error("shell: {0}")]
    Shell(String),
    #[error("input: {0}")]
    Input(String),
    #[error("forward: {0}")]
    Forward(String),
    #[error("unsupported on this platform: {0}")]
    Unsupported(&'static str),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Environment passed to a platform-forwarded command.
#[derive(Debug, Clone)]
pub struct CmdEnv {
    pub cmd: String,
    pub args: String,
    /// Full resolved sub-command text, marker stripped.
    pub text: String,
    /// True when a stored mapping matched or the operator allows
    /// unsafe commands globally.
    pub manual: bool,
}

/// A command name the platform handles itself.
#[derive(Debug, Clone, Copy)]
pub struct ForwardedCmd {
    pub name: &'static str,
    /// Whether running it replaces the currently loaded software
    /// (e.g. a core launch).
    pub software_change: bool,
}

/// Launching and launcher lifecycle.
pub trait LaunchCapability: Send + Sync {
    /// Name of the currently active launcher, empty when on the
    /// home/menu screen.
    fn active_launcher(&self) -> String;
    fn kill_launcher(&self) -> Result<(), PlatformError>;
    fn launching_enabled(&self) -> bool;
    fn set_launching(&self, enabled: bool) -> Result<(), PlatformError>;
    fn launch_file(&self, path: &Path) -> Result<(), PlatformError>;
    fn launch_system(&self, system: &str) -> Result<(), PlatformError>;
    /// Root folders probed for relative launch paths.
    fn root_folders(&self) -> Vec<PathBuf>;
}

/// Media catalogue lookups (the games index lives outside the core).
pub trait MediaCapability: Send + Sync {
    /// Pick a random media path for a system query (`all`, a system
    /// id, or a comma list of ids).
    fn random_media(&self, query: &str) -> Result<PathBuf, PlatformError>;
    /// Folder names under the root folders belonging to a system.
    fn system_folders(&self, system: &str) -> Vec<String>;
}

/// Raw input simulation.
pub trait InputCapability: Send + Sync {
    fn keyboard_press(&self, key: &str) -> Result<(), PlatformError>;
    fn gamepad_press(&self, button: &str) -> Result<(), PlatformError>;
}

/// Audible scan feedback. Implementations decide the actual playback.
pub trait SoundCapability: Send + Sync {
    fn play_success(&self);
    fn play_fail(&self);
}

/// Operator shell execution.
pub trait ShellCapability: Send + Sync {
    fn run_shell(&self, cmd: &str) -> Result<(), PlatformError>;
}

/// Commands the platform interprets itself (`mister.core` and kin).
pub trait ForwardCapability: Send + Sync {
    fn forwarded_cmds(&self) -> &[ForwardedCmd] {
        &[]
    }
    fn forward_cmd(&self, env: &CmdEnv) -> Result<(), PlatformError>;
}

/// Platform-native mapping lookup, consulted after stored mappings.
pub trait MappingLookup: Send + Sync {
    fn lookup_mapping(&self, token: &Token) -> Option<String>;
}

/// Reader driver supply and registry hooks.
pub trait ReaderSupport: Send + Sync {
    /// Fresh driver instances for every variant this platform supports.
    fn supported_readers(&self, cfg: &Config) -> Vec<Box<dyn Reader>>;
    /// Fired after each reader-manager tick with the registry snapshot.
    fn readers_changed(&self, connected: &[String]) -> Result<(), PlatformError>;
    /// Fired for every processed token before dispatch.
    fn after_scan(&self, token: &Token) -> Result<(), PlatformError>;
}

/// The composed platform surface the core is wired against.
pub trait Platform:
    LaunchCapability
    + MediaCapability
    + InputCapability
    + SoundCapability
    + ShellCapability
    + ForwardCapability
    + MappingLookup
    + ReaderSupport
{
}

impl<T> Platform for T where
    T: LaunchCapability
        + MediaCapability
        + InputCapability
        + SoundCapability
        + ShellCapability
        + ForwardCapability
        + MappingLookup
        + ReaderSupport
{
}

//! Minimal desktop platform adapter.
//!
//! Launches files through the system opener and runs shell commands
//! via `sh -c`. Has no launcher tracking, input simulation, or
//! forwarded commands; those belong to dedicated platform builds.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{
    CmdEnv, ForwardCapability, InputCapability, LaunchCapability, MappingLookup, MediaCapability,
    PlatformError, ReaderSupport, ShellCapability, SoundCapability,
};
use crate::config::Config;
use crate::reader::{Reader, file::FileReader};
use crate::token::Token;

#[cfg(target_os = "macos")]
const OPENER: &str = "open";
#[cfg(not(target_os = "macos"))]
const OPENER: &str = "xdg-open";

pub struct DesktopPlatform {
    launching: AtomicBool,
    root_folders: Vec<PathBuf>,
}

impl DesktopPlatform {
    pub fn new(root_folders: Vec<PathBuf>) -> Self {
        Self {
            launching: AtomicBool::new(true),
            root_folders,
        }
    }
}

impl LaunchCapability for DesktopPlatform {
    fn active_launcher(&self) -> String {
        // Desktop has no launcher tracking; empty means menu/home.
        String::new()
    }

    fn kill_launcher(&self) -> Result<(), PlatformError> {
        tracing::debug!("kill launcher requested, nothing to kill on desktop");
        Ok(())
    }

    fn launching_enabled(&self) -> bool {
        self.launching.load(Ordering::Relaxed)
    }

    fn set_launching(&self, enabled: bool) -> Result<(), PlatformError> {
        self.launching.store(enabled, Ordering::Relaxed);
        Ok(())
    }

    fn launch_file(&self, path: &Path) -> Result<(), PlatformError> {
        tracing::info!(path = %path.display(), "opening file");
        let child = std::process::Command::new(OPENER)
            .arg(path)
            .spawn()
            .map_err(|e| PlatformError::Launch(format!("{}: {e}", path.display())))?;
        reap(child, OPENER.to_string());
        Ok(())
    }

    fn launch_system(&self, system: &str) -> Result<(), PlatformError> {
        let _ = system;
        Err(PlatformError::Unsupported("system launch"))
    }

    fn root_folders(&self) -> Vec<PathBuf> {
        self.root_folders.clone()
    }
}

impl MediaCapability for DesktopPlatform {
    fn random_media(&self, _query: &str) -> Result<PathBuf, PlatformError> {
        Err(PlatformError::Unsupported("media index"))
    }

    fn system_folders(&self, _system: &str) -> Vec<String> {
        Vec::new()
    }
}

impl InputCapability for DesktopPlatform {
    fn keyboard_press(&self, _key: &str) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("keyboard input"))
    }

    fn gamepad_press(&self, _button: &str) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("gamepad input"))
    }
}

impl SoundCapability for DesktopPlatform {
    fn play_success(&self) {}
    fn play_fail(&self) {}
}

impl ShellCapability for DesktopPlatform {
    /// Spawn errors surface to the caller; the command itself runs
    /// detached, with its exit status logged from the reaper thread.
    /// Waiting inline would park a runtime worker for the child's
    /// whole lifetime.
    fn run_shell(&self, cmd: &str) -> Result<(), PlatformError> {
        tracing::info!(cmd, "running shell command");
        let child = std::process::Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .spawn()
            .map_err(|e| PlatformError::Shell(e.to_string()))?;
        reap(child, format!("sh -c {cmd}"));
        Ok(())
    }
}

/// Wait out a spawned child on its own thread so it never lingers as
/// a zombie, logging abnormal exits.
fn reap(mut child: std::process::Child, what: String) {
    std::thread::spawn(move || match child.wait() {
        Ok(status) if !status.success() => {
            tracing::warn!(cmd = %what, %status, "command failed");
        }
        Err(e) => tracing::warn!(cmd = %what, error = %e, "error waiting for command"),
        Ok(_) => {}
    });
}

impl ForwardCapability for DesktopPlatform {
    fn forward_cmd(&self, env: &CmdEnv) -> Result<(), PlatformError> {
        Err(PlatformError::Forward(format!(
            "no forwarded commands on desktop: {}",
            env.cmd
        )))
    }
}

impl MappingLookup for DesktopPlatform {
    fn lookup_mapping(&self, _token: &Token) -> Option<String> {
        None
    }
}

impl ReaderSupport for DesktopPlatform {
    fn supported_readers(&self, _cfg: &Config) -> Vec<Box<dyn Reader>> {
        vec![Box::new(FileReader::new())]
    }

    fn readers_changed(&self, connected: &[String]) -> Result<(), PlatformError> {
        tracing::debug!(?connected, "reader registry updated");
        Ok(())
    }

    fn after_scan(&self, _token: &Token) -> Result<(), PlatformError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_shell_returns_without_waiting() {
        let platform = DesktopPlatform::new(Vec::new());
        let started = std::time::Instant::now();
        platform.run_shell("sleep 2").unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }
}

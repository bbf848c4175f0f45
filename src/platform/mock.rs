//! Recording platform mock for pipeline tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{
    CmdEnv, ForwardCapability, ForwardedCmd, InputCapability, LaunchCapability, MappingLookup,
    MediaCapability, PlatformError, ReaderSupport, ShellCapability, SoundCapability,
};
use crate::config::Config;
use crate::reader::Reader;
use crate::token::Token;

/// Records every capability call and lets tests script failures.
#[derive(Default)]
pub struct MockPlatform {
    calls: Mutex<Vec<String>>,
    pub active_launcher: Mutex<String>,
    pub launching: LaunchingFlag,
    pub kill_count: AtomicUsize,
    pub success_sounds: AtomicUsize,
    pub fail_sounds: AtomicUsize,
    pub fail_shell: AtomicBool,
    pub fail_launch: AtomicBool,
    pub platform_mapping: Mutex<Option<String>>,
    pub random_result: Mutex<Option<PathBuf>>,
    pub root_folders: Mutex<Vec<PathBuf>>,
    pub forwarded: Vec<ForwardedCmd>,
}

/// Defaults to enabled, unlike `AtomicBool::default()`.
pub struct LaunchingFlag(AtomicBool);

impl Default for LaunchingFlag {
    fn default() -> Self {
        Self(AtomicBool::new(true))
    }
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn kills(&self) -> usize {
        self.kill_count.load(Ordering::Relaxed)
    }
}

impl LaunchCapability for MockPlatform {
    fn active_launcher(&self) -> String {
        self.active_launcher.lock().unwrap().clone()
    }

    fn kill_launcher(&self) -> Result<(), PlatformError> {
        self.kill_count.fetch_add(1, Ordering::Relaxed);
        self.record("kill".into());
        Ok(())
    }

    fn launching_enabled(&self) -> bool {
        self.launching.0.load(Ordering::Relaxed)
    }

    fn set_launching(&self, enabled: bool) -> Result<(), PlatformError> {
        self.launching.0.store(enabled, Ordering::Relaxed);
        Ok(())
    }

    fn launch_file(&self, path: &Path) -> Result<(), PlatformError> {
        self.record(format!("launch_file:{}", path.display()));
        if self.fail_launch.load(Ordering::Relaxed) {
            return Err(PlatformError::Launch("scripted failure".into()));
        }
        Ok(())
    }

    fn launch_system(&self, system: &str) -> Result<(), PlatformError> {
        self.record(format!("launch_system:{system}"));
        Ok(())
    }

    fn root_folders(&self) -> Vec<PathBuf> {
        self.root_folders.lock().unwrap().clone()
    }
}

impl MediaCapability for MockPlatform {
    fn random_media(&self, query: &str) -> Result<PathBuf, PlatformError> {
        self.record(format!("random:{query}"));
        self.random_result
            .lock()
            .unwrap()
            .clone()
            .ok_or(PlatformError::Unsupported("media index"))
    }

    fn system_folders(&self, system: &str) -> Vec<String> {
        vec![system.to_uppercase()]
    }
}

impl InputCapability for MockPlatform {
    fn keyboard_press(&self, key: &str) -> Result<(), PlatformError> {
        self.record(format!("keyboard:{key}"));
        Ok(())
    }

    fn gamepad_press(&self, button: &str) -> Result<(), PlatformError> {
        self.record(format!("gamepad:{button}"));
        Ok(())
    }
}

impl SoundCapability for MockPlatform {
    fn play_success(&self) {
        self.success_sounds.fetch_add(1, Ordering::Relaxed);
    }

    fn play_fail(&self) {
        self.fail_sounds.fetch_add(1, Ordering::Relaxed);
    }
}

impl ShellCapability for MockPlatform {
    fn run_shell(&self, cmd: &str) -> Result<(), PlatformError> {
        self.record(format!("shell:{cmd}"));
        if self.fail_shell.load(Ordering::Relaxed) {
            return Err(PlatformError::Shell("scripted failure".into()));
        }
        Ok(())
    }
}

impl ForwardCapability for MockPlatform {
    fn forwarded_cmds(&self) -> &[ForwardedCmd] {
        &self.forwarded
    }

    fn forward_cmd(&self, env: &CmdEnv) -> Result<(), PlatformError> {
        self.record(format!("forward:{}:{}", env.cmd, env.args));
        Ok(())
    }
}

impl MappingLookup for MockPlatform {
    fn lookup_mapping(&self, _token: &Token) -> Option<String> {
        self.platform_mapping.lock().unwrap().clone()
    }
}

impl ReaderSupport for MockPlatform {
    fn supported_readers(&self, _cfg: &Config) -> Vec<Box<dyn Reader>> {
        vec![Box::new(crate::reader::file::FileReader::new())]
    }

    fn readers_changed(&self, connected: &[String]) -> Result<(), PlatformError> {
        self.record(format!("readers_changed:{}", connected.join(",")));
        Ok(())
    }

    fn after_scan(&self, token: &Token) -> Result<(), PlatformError> {
        self.record(format!("after_scan:{}", token.text));
        Ok(())
    }
}

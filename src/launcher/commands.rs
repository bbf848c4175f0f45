//! Launch-class commands: generic path resolution, system and random.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::LaunchError;
use crate::platform::Platform;

fn uri_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^.+://").expect("static pattern"))
}

/// `**launch.system:<id>` — launch a system's menu/core. The special
/// id `menu` kills the active launcher instead.
pub fn system(platform: &dyn Platform, args: &str) -> Result<(), LaunchError> {
    if args.eq_ignore_ascii_case("menu") {
        return Ok(platform.kill_launcher()?);
    }
    Ok(platform.launch_system(args)?)
}

/// `**launch.random:<query>` — pick random media for a system query
/// (`all`, one id, or a comma list) and launch it.
pub fn random(platform: &dyn Platform, args: &str) -> Result<(), LaunchError> {
    if args.is_empty() {
        return Err(LaunchError::InvalidLaunchFormat("no system specified".into()));
    }
    let path = platform.random_media(args)?;
    Ok(platform.launch_file(&path)?)
}

/// Generic launch resolution chain:
/// absolute path → URI form → root-folder-relative existence probe →
/// `<system>/<path>` structured form.
pub fn launch(platform: &dyn Platform, text: &str) -> Result<(), LaunchError> {
    if text.is_empty() {
        return Err(LaunchError::EmptyText);
    }

    let as_path = Path::new(text);
    if as_path.is_absolute() {
        tracing::debug!(path = text, "launching absolute path");
        return Ok(platform.launch_file(as_path)?);
    }

    if uri_re().is_match(text) {
        tracing::debug!(uri = text, "launching uri");
        return Ok(platform.launch_file(as_path)?);
    }

    // Relative path that exists under a root folder takes precedence
    // over the system/path form.
    if let Some(found) = find_file(platform, text) {
        tracing::debug!(path = %found.display(), "launching found relative path");
        return Ok(platform.launch_file(&found)?);
    }

    // <system>/<relative path> structured form.
    let Some((system, rest)) = text.split_once('/') else {
        return Err(LaunchError::InvalidLaunchFormat(text.to_string()));
    };
    for folder in platform.system_folders(system) {
        let candidate = Path::new(&folder).join(rest);
        if let Some(found) = find_file(platform, &candidate.to_string_lossy()) {
            tracing::debug!(path = %found.display(), system = system, "launching system path");
            return Ok(platform.launch_file(&found)?);
        }
    }

    Err(LaunchError::FileNotFound(text.to_string()))
}

/// Probe each platform root folder for a relative path.
fn find_file(platform: &dyn Platform, relative: &str) -> Option<PathBuf> {
    for root in platform.root_folders() {
        let full = root.join(relative);
        if full.exists() {
            return Some(full);
        }
    }
    None
}

//! Command interpreter — turns resolved launch text into actions.
//!
//! Launch text is an ordered batch of sub-commands separated by the
//! literal `"||"`. Sub-commands beginning with `**` name an explicit
//! command (`**name:args`); anything else is the generic launch form.
//! Batches are fail-fast: the first error stops execution.

pub mod commands;
pub mod http;
pub mod input;

use crate::platform::{CmdEnv, Platform, PlatformError};

/// Errors from a single launch attempt.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("no launch text found in token or mappings")]
    EmptyText,
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("shell commands must be manually run")]
    ShellNotAllowed,
    #[error("invalid delay amount: {0}")]
    InvalidDelay(String),
    #[error("invalid coin amount: {0}")]
    InvalidCoinAmount(String),
    #[error("invalid input sequence: {0}")]
    InvalidInput(String),
    #[error("invalid post format: {0}")]
    InvalidPostFormat(String),
    #[error("invalid launch format: {0}")]
    InvalidLaunchFormat(String),
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Run a full batch of launch text.
///
/// Sub-commands execute strictly in order and stop at the first error.
/// Returns whether any executed command is software-changing (a
/// system/random/generic launch or a platform-declared core launch);
/// that flag feeds the software-changed channel for non-remote tokens.
///
/// `manual` is true when a stored mapping matched or the operator's
/// global allow-shell setting permits unsafe commands.
pub async fn launch_text(
    platform: &dyn Platform,
    text: &str,
    manual: bool,
) -> Result<bool, LaunchError> {
    if text.is_empty() {
        return Err(LaunchError::EmptyText);
    }

    let mut software_changed = false;
    for cmd in text.split("||") {
        software_changed |= run_command(platform, cmd, manual).await?;
    }
    Ok(software_changed)
}

/// Execute one sub-command, returning its software-change flag.
async fn run_command(
    platform: &dyn Platform,
    cmd_text: &str,
    manual: bool,
) -> Result<bool, LaunchError> {
    let Some(marked) = cmd_text.strip_prefix("**") else {
        // Generic launch form.
        tracing::debug!(text = cmd_text, "generic launch");
        commands::launch(platform, cmd_text.trim())?;
        return Ok(true);
    };

    let (cmd, args) = marked
        .split_once(':')
        .ok_or_else(|| LaunchError::InvalidCommand(marked.to_string()))?;
    let cmd = cmd.trim().to_lowercase();
    let args = args.trim();

    tracing::info!(cmd = %cmd, "running command");
    match cmd.as_str() {
        "launch" => {
            commands::launch(platform, args)?;
            Ok(true)
        }
        "launch.system" => {
            commands::system(platform, args)?;
            Ok(true)
        }
        "launch.random" => {
            commands::random(platform, args)?;
            Ok(true)
        }
        "shell" => {
            if !manual {
                return Err(LaunchError::ShellNotAllowed);
            }
            platform.run_shell(args)?;
            Ok(false)
        }
        "delay" => {
            let ms: u64 = args
                .parse()
                .map_err(|_| LaunchError::InvalidDelay(args.to_string()))?;
            tracing::info!(ms, "delaying");
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
            Ok(false)
        }
        "input.keyboard" => {
            input::keyboard(platform, args).await?;
            Ok(false)
        }
        "input.gamepad" => {
            input::gamepad(platform, args).await?;
            Ok(false)
        }
        "input.coinp1" => {
            input::insert_coin(platform, args, "6").await?;
            Ok(false)
        }
        "input.coinp2" => {
            input::insert_coin(platform, args, "7").await?;
            Ok(false)
        }
        "http.get" => {
            http::get(args);
            Ok(false)
        }
        "http.post" => {
            http::post(args)?;
            Ok(false)
        }
        other => {
            // Platform-forwarded commands carry their own
            // software-change classification.
            let forwarded = platform
                .forwarded_cmds()
                .iter()
                .find(|f| f.name == other)
                .copied()
                .ok_or_else(|| LaunchError::UnknownCommand(other.to_string()))?;
            platform.forward_cmd(&CmdEnv {
                cmd: cmd.clone(),
                args: args.to_string(),
                text: marked.to_string(),
                manual,
            })?;
            Ok(forwarded.software_change)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::platform::ForwardedCmd;
    use crate::platform::mock::MockPlatform;

    #[tokio::test]
    async fn batch_is_fail_fast() {
        let platform = MockPlatform::new();
        platform.fail_shell.store(true, Ordering::Relaxed);

        let result = launch_text(
            &platform,
            "**input.keyboard:a||**shell:false_cmd||**input.keyboard:b",
            true,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(platform.calls(), vec!["keyboard:a", "shell:false_cmd"]);
    }

    #[tokio::test]
    async fn failing_shell_stops_delay_batch() {
        let platform = MockPlatform::new();
        platform.fail_shell.store(true, Ordering::Relaxed);
        let result = launch_text(&platform, "**delay:10||**shell:false_cmd||**delay:10", true).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn shell_requires_manual() {
        let platform = MockPlatform::new();
        let result = launch_text(&platform, "**shell:reboot", false).await;
        assert!(matches!(result, Err(LaunchError::ShellNotAllowed)));
        assert!(platform.calls().is_empty());

        launch_text(&platform, "**shell:reboot", true).await.unwrap();
        assert_eq!(platform.calls(), vec!["shell:reboot"]);
    }

    #[tokio::test]
    async fn software_change_classification() {
        let platform = MockPlatform::new();
        assert!(launch_text(&platform, "**launch.system:snes", false)
            .await
            .unwrap());
        assert!(!launch_text(&platform, "**delay:1", false).await.unwrap());
        assert!(!launch_text(&platform, "**input.coinp1:2", false)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn batch_reports_any_software_change() {
        let platform = MockPlatform::new();
        let changed = launch_text(&platform, "**delay:1||**launch.system:snes||**delay:1", false)
            .await
            .unwrap();
        assert!(changed);
    }

    #[tokio::test]
    async fn unknown_command_errors() {
        let platform = MockPlatform::new();
        let result = launch_text(&platform, "**frobnicate:now", false).await;
        assert!(matches!(result, Err(LaunchError::UnknownCommand(_))));
    }

    #[tokio::test]
    async fn marker_without_args_is_invalid() {
        let platform = MockPlatform::new();
        let result = launch_text(&platform, "**delay", false).await;
        assert!(matches!(result, Err(LaunchError::InvalidCommand(_))));
    }

    #[tokio::test]
    async fn forwarded_command_uses_platform_classification() {
        let mut platform = MockPlatform::new();
        platform.forwarded = vec![
            ForwardedCmd {
                name: "mister.core",
                software_change: true,
            },
            ForwardedCmd {
                name: "mister.ini",
                software_change: false,
            },
        ];

        assert!(launch_text(&platform, "**mister.core:_Arcade/x", false)
            .await
            .unwrap());
        assert!(!launch_text(&platform, "**mister.ini:2", false).await.unwrap());
        assert_eq!(
            platform.calls(),
            vec!["forward:mister.core:_Arcade/x", "forward:mister.ini:2"]
        );
    }

    #[tokio::test]
    async fn coin_insert_presses_repeatedly() {
        let platform = MockPlatform::new();
        launch_text(&platform, "**input.coinp2:3", false).await.unwrap();
        assert_eq!(
            platform.calls(),
            vec!["keyboard:7", "keyboard:7", "keyboard:7"]
        );
    }

    #[tokio::test]
    async fn empty_text_is_an_error() {
        let platform = MockPlatform::new();
        assert!(matches!(
            launch_text(&platform, "", false).await,
            Err(LaunchError::EmptyText)
        ));
    }
}

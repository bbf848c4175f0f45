//! Input simulation commands — keyboard, gamepad, coin inserts.

use std::time::Duration;

use super::LaunchError;
use crate::platform::Platform;

const KEY_INTERVAL: Duration = Duration::from_millis(100);

/// Parse an input sequence into key names. Single characters are
/// individual keys, long names sit inside curly braces, and a
/// backslash escapes the next character.
pub fn read_keys(keys: &str) -> Result<Vec<String>, LaunchError> {
    let mut names = Vec::new();
    let mut in_escape = false;
    let mut in_name = false;
    let mut name = String::new();

    for c in keys.chars() {
        if in_escape {
            if in_name {
                name.push(c);
            } else {
                names.push(c.to_string());
            }
            in_escape = false;
            continue;
        }
        match c {
            '\\' => in_escape = true,
            '{' => {
                if in_name {
                    return Err(LaunchError::InvalidInput("unexpected {".into()));
                }
                in_name = true;
            }
            '}' => {
                if !in_name {
                    return Err(LaunchError::InvalidInput("unexpected }".into()));
                }
                names.push(std::mem::take(&mut name));
                in_name = false;
            }
            _ if in_name => name.push(c),
            _ => names.push(c.to_string()),
        }
    }

    if in_name {
        return Err(LaunchError::InvalidInput("missing }".into()));
    }

    Ok(names)
}

pub async fn keyboard(platform: &dyn Platform, args: &str) -> Result<(), LaunchError> {
    tracing::info!(keys = args, "keyboard input");
    for name in read_keys(args)? {
        platform.keyboard_press(&name)?;
        tokio::time::sleep(KEY_INTERVAL).await;
    }
    Ok(())
}

pub async fn gamepad(platform: &dyn Platform, args: &str) -> Result<(), LaunchError> {
    tracing::info!(buttons = args, "gamepad input");
    for name in read_keys(args)? {
        platform.gamepad_press(&name)?;
        tokio::time::sleep(KEY_INTERVAL).await;
    }
    Ok(())
}

/// Simulate coin inserts by pressing the player's coin key repeatedly.
pub async fn insert_coin(platform: &dyn Platform, args: &str, key: &str) -> Result<(), LaunchError> {
    let amount: u32 = args
        .parse()
        .map_err(|_| LaunchError::InvalidCoinAmount(args.to_string()))?;
    tracing::info!(amount, key, "inserting coins");
    for _ in 0..amount {
        platform.keyboard_press(key)?;
        tokio::time::sleep(KEY_INTERVAL).await;
    }
    Ok(())
}

//! Launch dispatcher — consumes queued tokens and runs the pipeline.
//!
//! Each token's resolve + interpret run happens in its own short-lived
//! task so a slow or blocking launch command never stalls the
//! coordinator. History entries from overlapping launches may land out
//! of submission order; that looseness is accepted.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::db::{Database, HistoryEntry};
use crate::launcher::{LaunchError, launch_text};
use crate::platform::Platform;
use crate::token::Token;

use super::mappings::resolve;
use super::state::State;

/// Consume the launch channel until it closes.
pub async fn run_dispatcher(
    platform: Arc<dyn Platform>,
    cfg: Arc<Config>,
    state: Arc<State>,
    db: Arc<Database>,
    mut launch_rx: mpsc::UnboundedReceiver<Token>,
    software_tx: mpsc::UnboundedSender<Option<Token>>,
) {
    while let Some(token) = launch_rx.recv().await {
        // Zero-time tokens are a caller contract violation; drop them.
        if !token.is_valid() {
            continue;
        }

        let platform = Arc::clone(&platform);
        let cfg = Arc::clone(&cfg);
        let state = Arc::clone(&state);
        let db = Arc::clone(&db);
        let software_tx = software_tx.clone();
        tokio::spawn(async move {
            process_token(&*platform, &cfg, &state, &db, &software_tx, token).await;
        });
    }
    tracing::debug!("launch queue closed, dispatcher stopping");
}

/// Run the full pipeline for one token and record its history entry.
pub(crate) async fn process_token(
    platform: &dyn Platform,
    cfg: &Config,
    state: &State,
    db: &Database,
    software_tx: &mpsc::UnboundedSender<Option<Token>>,
    token: Token,
) {
    tracing::info!(uid = %token.uid, text = %token.text, "processing token");

    if let Err(e) = platform.after_scan(&token) {
        tracing::error!(error = %e, "after-scan hook failed");
    }

    let mut entry = HistoryEntry {
        time: token.scan_time.unwrap_or_else(time::OffsetDateTime::now_utc),
        kind: token.kind.clone(),
        uid: token.uid.clone(),
        text: token.text.clone(),
        data: token.data.clone(),
        success: false,
    };

    // Record intent without execution while launching is disabled.
    if state.launcher_disabled() {
        if let Err(e) = db.add_history(entry) {
            tracing::error!(error = %e, "error adding history");
        }
        return;
    }

    let result = launch_token(platform, cfg, db, software_tx, &token).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "error launching token");
    }

    entry.success = result.is_ok();
    if let Err(e) = db.add_history(entry) {
        tracing::error!(error = %e, "error adding history");
    }
}

/// Resolve mapping overrides, interpret the launch text, and report a
/// software change for non-remote tokens.
async fn launch_token(
    platform: &dyn Platform,
    cfg: &Config,
    db: &Database,
    software_tx: &mpsc::UnboundedSender<Option<Token>>,
    token: &Token,
) -> Result<(), LaunchError> {
    let mappings = db.enabled_mappings();
    let resolved = resolve(&mappings, platform, token);
    let mapped = resolved.is_some();
    let text = resolved.unwrap_or_else(|| token.text.clone());
    if text.is_empty() {
        return Err(LaunchError::EmptyText);
    }

    tracing::info!(text = %text, mapped, "launching");
    let software_changed = launch_text(platform, &text, cfg.allow_shell || mapped).await?;

    if software_changed && !token.remote {
        tracing::info!(uid = %token.uid, "software token updated");
        let _ = software_tx.send(Some(token.clone()));
    }

    Ok(())
}

//! Reader manager and the debounce/exit-timer coordinator.
//!
//! The manager keeps the reader registry in step with configuration
//! and auto-detection on a fixed tick. The coordinator is the single
//! consumer of the scan channel and the only writer of the exit-timer
//! state; everything it decides flows out over the launch channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::Config;
use crate::platform::Platform;
use crate::reader::{Scan, parse_device};
use crate::token::{Token, tokens_equal};

use super::state::State;

/// Minimum gap between audible failure cues.
const FAIL_SOUND_WINDOW: Duration = Duration::from_secs(1);

/// One reader-manager pass: prune readers that dropped their
/// connection, connect configured devices, then let the remaining
/// driver variants auto-detect. Connection failures are logged and
/// retried on the next tick; this is the sole retry path for hardware.
pub fn manage_readers(
    platform: &dyn Platform,
    cfg: &Config,
    state: &State,
    scan_tx: &mpsc::UnboundedSender<Scan>,
) {
    for device in state.list_readers() {
        if !state.reader_connected(&device).unwrap_or(false) {
            tracing::info!(%device, "pruning disconnected reader");
            state.remove_reader(&device);
        }
    }

    let mut drivers = platform.supported_readers(cfg);

    let mut configured: Vec<&str> = Vec::new();
    if !cfg.connection_string.is_empty() {
        configured.push(&cfg.connection_string);
    }
    configured.extend(cfg.readers.iter().map(String::as_str));

    for device in configured {
        if state.reader_connected(device).is_some() {
            continue;
        }
        let driver_id = match parse_device(device) {
            Ok((driver_id, _)) => driver_id,
            Err(e) => {
                tracing::warn!(%device, error = %e, "bad reader device string");
                continue;
            }
        };
        let Some(pos) = drivers.iter().position(|d| d.ids().contains(&driver_id)) else {
            tracing::warn!(%device, "no driver supports device");
            continue;
        };
        let mut reader = drivers.remove(pos);
        match reader.open(device, scan_tx.clone()) {
            Ok(()) => {
                tracing::info!(%device, info = %reader.info(), "connected reader");
                state.set_reader(device, reader);
            }
            Err(e) => {
                tracing::debug!(%device, error = %e, "reader connect failed, retrying next tick");
            }
        }
    }

    // Unclaimed driver variants get one detection attempt each. A
    // detected reader is kept only if it reports connected right away.
    let connected = state.list_readers();
    for mut driver in drivers {
        let Some(device) = driver.detect(&connected) else {
            continue;
        };
        if connected.contains(&device) {
            continue;
        }
        if let Err(e) = driver.open(&device, scan_tx.clone()) {
            tracing::debug!(%device, error = %e, "detected reader failed to open");
            continue;
        }
        if driver.connected() {
            tracing::info!(%device, "connected detected reader");
            state.set_reader(&device, driver);
        } else if let Err(e) = driver.close() {
            tracing::warn!(%device, error = %e, "error closing unresponsive reader");
        }
    }

    if let Err(e) = platform.readers_changed(&state.list_readers()) {
        tracing::warn!(error = %e, "readers-changed hook failed");
    }
}

struct Coordinator {
    platform: Arc<dyn Platform>,
    cfg: Arc<Config>,
    state: Arc<State>,
    launch_tx: mpsc::UnboundedSender<Token>,
    /// Last scan value seen, `None` for removal. Duplicate consecutive
    /// values are dropped here before they touch any state.
    prev_token: Option<Token>,
    /// Pending exit deadline; `None` means the timer is idle.
    exit_deadline: Option<Instant>,
    last_fail_sound: Option<Instant>,
}

impl Coordinator {
    fn handle_scan(&mut self, scan: Scan) {
        if let Some(error) = scan.error {
            tracing::warn!(source = %scan.source, error = %error, "reader error");
            let now = Instant::now();
            let muted = self
                .last_fail_sound
                .is_some_and(|at| now - at < FAIL_SOUND_WINDOW);
            if !self.cfg.disable_sounds && !muted {
                self.platform.play_fail();
                self.last_fail_sound = Some(now);
            }
            return;
        }

        if tokens_equal(scan.token.as_ref(), self.prev_token.as_ref()) {
            return;
        }
        self.prev_token = scan.token.clone();

        match scan.token {
            Some(token) => self.token_inserted(token),
            None => self.token_removed(),
        }
    }

    fn token_inserted(&mut self, token: Token) {
        tracing::info!(source = %token.source, uid = %token.uid, text = %token.text, "new token");
        self.state.set_active_token(token.clone());

        if self.exit_deadline.is_some() {
            if tokens_equal(Some(&token), self.state.software_token().as_ref()) {
                tracing::info!("token reinserted, cancelling pending exit");
                self.exit_deadline = None;
                return;
            }
            // The interrupting launch may never report a software
            // change, so the timer restarts rather than stopping. A
            // fresh software event cancels it.
            tracing::info!("new token interrupts pending exit, restarting timer");
            self.exit_deadline =
                Some(Instant::now() + Duration::from_secs(self.cfg.exit_game_delay));
        }

        // A token the service just wrote reads back once; consume that
        // echo instead of relaunching. Any other scan invalidates a
        // stale write record.
        if let Some(wrote) = self.state.wrote_token() {
            self.state.set_wrote_token(None);
            if wrote.same_token(&token) {
                tracing::debug!("skipping launch of just-written token");
                return;
            }
        }

        if !token.is_valid() {
            tracing::warn!(uid = %token.uid, "dropping token without a scan time");
            return;
        }
        if !self.cfg.disable_sounds {
            self.platform.play_success();
        }
        let _ = self.launch_tx.send(token);
    }

    fn token_removed(&mut self) {
        tracing::info!("token removed");
        self.state.set_active_token(Token::default());

        if self.should_exit() {
            tracing::info!(delay = self.cfg.exit_game_delay, "arming exit timer");
            self.exit_deadline =
                Some(Instant::now() + Duration::from_secs(self.cfg.exit_game_delay));
        }
    }

    fn should_exit(&self) -> bool {
        if !self.cfg.exit_game || self.state.launcher_disabled() {
            return false;
        }
        if self.state.last_scanned().remote {
            return false;
        }
        let launcher = self.platform.active_launcher();
        !launcher.is_empty() && !self.cfg.in_exit_blocklist(&launcher)
    }

    fn handle_software(&mut self, token: Option<Token>) {
        if self.exit_deadline.is_some()
            && !tokens_equal(token.as_ref(), self.state.software_token().as_ref())
        {
            tracing::info!("fresh launch cancels pending exit");
            self.exit_deadline = None;
        }
        self.state.set_software_token(token);
    }

    /// The timer ran out uncancelled. Conditions may have changed while
    /// it ran, so re-check before acting; the kill fires at most once
    /// because the deadline is cleared first.
    fn handle_exit_expiry(&mut self) {
        self.exit_deadline = None;
        if self.platform.active_launcher().is_empty() || self.state.software_token().is_none() {
            tracing::debug!("exit timer fired with nothing to stop");
            return;
        }
        tracing::info!("exit timer fired, stopping software");
        if let Err(e) = self.platform.kill_launcher() {
            tracing::error!(error = %e, "error killing launcher");
        }
        self.state.set_software_token(None);
    }
}

/// Run the coordinator until the scan or software channel closes.
pub async fn run_coordinator(
    platform: Arc<dyn Platform>,
    cfg: Arc<Config>,
    state: Arc<State>,
    mut scan_rx: mpsc::UnboundedReceiver<Scan>,
    mut software_rx: mpsc::UnboundedReceiver<Option<Token>>,
    launch_tx: mpsc::UnboundedSender<Token>,
) {
    let mut co = Coordinator {
        platform,
        cfg,
        state,
        launch_tx,
        prev_token: None,
        exit_deadline: None,
        last_fail_sound: None,
    };

    loop {
        tokio::select! {
            scan = scan_rx.recv() => match scan {
                Some(scan) => co.handle_scan(scan),
                None => break,
            },
            event = software_rx.recv() => match event {
                Some(event) => co.handle_software(event),
                None => break,
            },
            _ = tokio::time::sleep_until(co.exit_deadline.unwrap_or_else(Instant::now)),
                if co.exit_deadline.is_some() => co.handle_exit_expiry(),
        }
    }
    tracing::debug!("coordinator stopping");
}

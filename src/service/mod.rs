//! Service core — token ingestion, state, and launch dispatch.
//!
//! Architecture: channel-based pipeline. Readers push [`Scan`]
//! envelopes onto a shared channel from their own polling tasks. A
//! single coordinator loop ([`readers`]) debounces scans and runs the
//! exit-timer state machine; tokens it approves go over a launch
//! channel to the dispatcher ([`dispatch`]), which resolves mapping
//! overrides, interprets the launch text, and reports software changes
//! back to the coordinator. Shared state lives in one mutex-guarded
//! [`state::State`]; everything else is message passing.

pub mod dispatch;
pub mod mappings;
pub mod readers;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::db::{Database, DbError};
use crate::platform::{Platform, PlatformError};
use crate::reader::{ReaderError, Scan};
use crate::token::{SOURCE_API, Token};

use state::{Notification, State};

const READER_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("no readers connected")]
    NoReaders,
    #[error("unknown reader: {0}")]
    UnknownReader(String),
    #[error(transparent)]
    Reader(#[from] ReaderError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A running service instance and its background tasks.
pub struct Service {
    handle: ServiceHandle,
    tasks: Vec<JoinHandle<()>>,
}

/// Cloneable front door for the API/CLI layer.
#[derive(Clone)]
pub struct ServiceHandle {
    platform: Arc<dyn Platform>,
    state: Arc<State>,
    db: Arc<Database>,
    scan_tx: mpsc::UnboundedSender<Scan>,
}

impl Service {
    /// Open the store, wire the channels, and spawn the reader
    /// manager, coordinator, and dispatcher. The returned receiver
    /// carries state-change notifications for status broadcasting.
    pub fn start(
        platform: Arc<dyn Platform>,
        cfg: Config,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Notification>), ServiceError> {
        let db = Arc::new(Database::open(cfg.db_path.clone())?);
        let cfg = Arc::new(cfg);
        let (state, notifications) = State::new();
        let state = Arc::new(state);

        let (scan_tx, scan_rx) = mpsc::unbounded_channel::<Scan>();
        let (launch_tx, launch_rx) = mpsc::unbounded_channel::<Token>();
        let (software_tx, software_rx) = mpsc::unbounded_channel::<Option<Token>>();

        let manager = {
            let platform = Arc::clone(&platform);
            let cfg = Arc::clone(&cfg);
            let state = Arc::clone(&state);
            let scan_tx = scan_tx.clone();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(READER_TICK);
                loop {
                    tick.tick().await;
                    readers::manage_readers(&*platform, &cfg, &state, &scan_tx);
                }
            })
        };

        let coordinator = tokio::spawn(readers::run_coordinator(
            Arc::clone(&platform),
            Arc::clone(&cfg),
            Arc::clone(&state),
            scan_rx,
            software_rx,
            launch_tx,
        ));

        let dispatcher = tokio::spawn(dispatch::run_dispatcher(
            Arc::clone(&platform),
            Arc::clone(&cfg),
            Arc::clone(&state),
            Arc::clone(&db),
            launch_rx,
            software_tx,
        ));

        tracing::info!(db = %db.path().display(), "service started");

        Ok((
            Self {
                handle: ServiceHandle {
                    platform,
                    state,
                    db,
                    scan_tx,
                },
                tasks: vec![manager, coordinator, dispatcher],
            },
            notifications,
        ))
    }

    pub fn handle(&self) -> &ServiceHandle {
        &self.handle
    }

    /// Stop the pipeline tasks and close every reader.
    pub fn stop(self) {
        for task in &self.tasks {
            task.abort();
        }
        self.handle.state.close_all_readers();
        tracing::info!("service stopped");
    }
}

impl ServiceHandle {
    /// Inject a virtual scan, as if a reader had seen the token. It
    /// passes through the same dedupe and dispatch as hardware scans.
    pub fn enqueue_remote_token(&self, text: &str, uid: &str, data: &str, kind: &str) -> Token {
        let token = Token {
            kind: kind.to_string(),
            uid: uid.to_string(),
            text: text.to_string(),
            data: data.to_string(),
            scan_time: Some(OffsetDateTime::now_utc()),
            remote: true,
            source: SOURCE_API.to_string(),
        };
        let _ = self.scan_tx.send(Scan::token(SOURCE_API, Some(token.clone())));
        token
    }

    pub fn set_launcher_enabled(&self, enabled: bool) -> Result<(), ServiceError> {
        self.state.set_launcher_disabled(!enabled);
        self.platform.set_launching(enabled)?;
        Ok(())
    }

    pub fn launcher_disabled(&self) -> bool {
        self.state.launcher_disabled()
    }

    pub fn list_readers(&self) -> Vec<String> {
        self.state.list_readers()
    }

    /// Connection flag and description for one reader, if registered.
    pub fn reader_status(&self, device: &str) -> Option<(bool, String)> {
        self.state.with_reader(device, |r| (r.connected(), r.info()))
    }

    pub fn active_token(&self) -> Token {
        self.state.active_token()
    }

    pub fn last_scanned(&self) -> Token {
        self.state.last_scanned()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Write `text` to a present token. With no explicit device the
    /// lexicographically first registered reader is used, so repeated
    /// calls with the same topology pick the same device. The written
    /// token is remembered and its next scan will not relaunch.
    pub fn write(&self, device: Option<&str>, text: &str) -> Result<Token, ServiceError> {
        let device = match device {
            Some(d) => d.to_string(),
            None => self
                .state
                .list_readers()
                .into_iter()
                .next()
                .ok_or(ServiceError::NoReaders)?,
        };

        let result = self
            .state
            .with_reader(&device, |r| r.write(text))
            .ok_or_else(|| ServiceError::UnknownReader(device.clone()))?;

        let token = result?;
        self.state.set_wrote_token(Some(token.clone()));
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::platform::LaunchCapability;
    use crate::platform::mock::MockPlatform;

    async fn wait_for(mut cond: impl FnMut() -> bool) {
        for _ in 0..500 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition never became true");
    }

    fn start_service(cfg: Config) -> (Arc<MockPlatform>, Service) {
        let platform = Arc::new(MockPlatform::new());
        let (service, _notifications) =
            Service::start(Arc::clone(&platform) as Arc<dyn Platform>, cfg).unwrap();
        (platform, service)
    }

    #[tokio::test(start_paused = true)]
    async fn remote_token_flows_to_history() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            db_path: dir.path().join("store.db"),
            ..Config::default()
        };
        let (platform, service) = start_service(cfg);
        let handle = service.handle().clone();

        handle.enqueue_remote_token("**delay:1", "", "", "");
        wait_for(|| !handle.database().history().is_empty()).await;

        let history = handle.database().history();
        assert!(history[0].success);
        assert_eq!(history[0].text, "**delay:1");
        // Remote tokens never count as a software change.
        assert_eq!(platform.kills(), 0);
        service.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn write_goes_to_first_reader_and_suppresses_echo() {
        let dir = tempfile::tempdir().unwrap();
        let device = format!("file:{}", dir.path().join("token").display());
        let cfg = Config {
            connection_string: device.clone(),
            db_path: dir.path().join("store.db"),
            ..Config::default()
        };
        let (_platform, service) = start_service(cfg);
        let handle = service.handle().clone();

        wait_for(|| !handle.list_readers().is_empty()).await;
        let token = handle.write(None, "hello").unwrap();
        assert_eq!(token.text, "hello");
        assert_eq!(token.source, device);

        // The reader polls the written text back; the echo must be
        // consumed without producing a launch.
        wait_for(|| handle.active_token().text == "hello").await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(handle.database().history().is_empty());
        service.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn launcher_toggle_reaches_platform() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            db_path: dir.path().join("store.db"),
            ..Config::default()
        };
        let (platform, service) = start_service(cfg);
        let handle = service.handle().clone();

        handle.set_launcher_enabled(false).unwrap();
        assert!(handle.launcher_disabled());
        assert!(!platform.launching_enabled());

        handle.set_launcher_enabled(true).unwrap();
        assert!(!handle.launcher_disabled());
        assert!(platform.launching_enabled());
        service.stop();
    }

    #[tokio::test]
    async fn write_without_readers_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            db_path: dir.path().join("store.db"),
            ..Config::default()
        };
        let (_platform, service) = start_service(cfg);
        let err = service.handle().write(None, "hello").unwrap_err();
        assert!(matches!(err, ServiceError::NoReaders));
        service.stop();
    }
}

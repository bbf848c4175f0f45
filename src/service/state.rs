//! Shared service state.
//!
//! Getters return snapshots, setters are atomic under a single lock,
//! and every state-changing setter emits one notification to the sink
//! after the mutation is visible. Readers sit behind per-device locks
//! beneath the registry, keeping device I/O off the state lock.
//! Everything else in the pipeline communicates over channels.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::reader::Reader;
use crate::token::Token;

/// Readers carry their own lock so that blocking device I/O (a tag
/// write can take seconds) never runs under the state mutex.
type SharedReader = Arc<Mutex<Box<dyn Reader>>>;

/// Events emitted to the notification sink (consumed by the
/// out-of-scope API layer for status broadcasts).
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Active token changed; the empty token signals removal.
    TokenActive(Token),
    LauncherEnabled(bool),
    ReaderConnected(String),
    ReaderDisconnected(String),
}

#[derive(Default)]
struct Inner {
    active_token: Token,
    last_scanned: Token,
    launcher_disabled: bool,
    readers: HashMap<String, SharedReader>,
    software_token: Option<Token>,
    wrote_token: Option<Token>,
}

pub struct State {
    inner: Mutex<Inner>,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl State {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: Mutex::new(Inner::default()),
                notifications: tx,
            },
            rx,
        )
    }

    fn notify(&self, n: Notification) {
        // The sink may be gone during shutdown; that is not an error.
        let _ = self.notifications.send(n);
    }

    /// Record the current physical/logical presence. A no-op when the
    /// incoming token equals the current one (duplicate scans).
    /// `last_scanned` is only overwritten by tokens carrying a scan
    /// time, so it survives removals.
    pub fn set_active_token(&self, token: Token) {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.active_token.same_token(&token) {
                return;
            }
            inner.active_token = token.clone();
            if token.is_valid() {
                inner.last_scanned = token.clone();
            }
        }
        self.notify(Notification::TokenActive(token));
    }

    pub fn active_token(&self) -> Token {
        self.inner.lock().unwrap().active_token.clone()
    }

    pub fn last_scanned(&self) -> Token {
        self.inner.lock().unwrap().last_scanned.clone()
    }

    pub fn set_launcher_disabled(&self, disabled: bool) {
        self.inner.lock().unwrap().launcher_disabled = disabled;
        self.notify(Notification::LauncherEnabled(!disabled));
    }

    pub fn launcher_disabled(&self) -> bool {
        self.inner.lock().unwrap().launcher_disabled
    }

    /// Install a reader under a device key, closing any reader that
    /// previously occupied it. Close errors are logged, not raised.
    pub fn set_reader(&self, device: &str, reader: Box<dyn Reader>) {
        let old = {
            let mut inner = self.inner.lock().unwrap();
            inner
                .readers
                .insert(device.to_string(), Arc::new(Mutex::new(reader)))
        };
        if let Some(old) = old
            && let Err(e) = old.lock().unwrap().close()
        {
            tracing::warn!(device, error = %e, "error closing superseded reader");
        }
        self.notify(Notification::ReaderConnected(device.to_string()));
    }

    /// Close and drop the reader under a device key. A no-op for
    /// absent keys.
    pub fn remove_reader(&self, device: &str) {
        let removed = {
            let mut inner = self.inner.lock().unwrap();
            inner.readers.remove(device)
        };
        let Some(reader) = removed else {
            return;
        };
        if let Err(e) = reader.lock().unwrap().close() {
            tracing::warn!(device, error = %e, "error closing reader");
        }
        self.notify(Notification::ReaderDisconnected(device.to_string()));
    }

    /// Registered device keys, sorted for deterministic iteration.
    pub fn list_readers(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let mut keys: Vec<String> = inner.readers.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Run `f` against the reader registered under `device`, if any.
    /// Only that reader's lock is held while `f` runs, so slow device
    /// operations do not stall the registry or the rest of the state.
    pub fn with_reader<R>(
        &self,
        device: &str,
        f: impl FnOnce(&mut Box<dyn Reader>) -> R,
    ) -> Option<R> {
        let reader = {
            let inner = self.inner.lock().unwrap();
            inner.readers.get(device).map(Arc::clone)
        };
        reader.map(|r| {
            let mut guard = r.lock().unwrap();
            f(&mut guard)
        })
    }

    pub fn reader_connected(&self, device: &str) -> Option<bool> {
        self.with_reader(device, |r| r.connected())
    }

    pub fn set_software_token(&self, token: Option<Token>) {
        self.inner.lock().unwrap().software_token = token;
    }

    pub fn software_token(&self) -> Option<Token> {
        self.inner.lock().unwrap().software_token.clone()
    }

    pub fn set_wrote_token(&self, token: Option<Token>) {
        self.inner.lock().unwrap().wrote_token = token;
    }

    pub fn wrote_token(&self) -> Option<Token> {
        self.inner.lock().unwrap().wrote_token.clone()
    }

    /// Close every registered reader. Used at shutdown.
    pub fn close_all_readers(&self) {
        let readers: Vec<(String, SharedReader)> = {
            let mut inner = self.inner.lock().unwrap();
            inner.readers.drain().collect()
        };
        for (device, reader) in readers {
            if let Err(e) = reader.lock().unwrap().close() {
                tracing::warn!(device = %device, error = %e, "error closing reader");
            }
        }
    }
}

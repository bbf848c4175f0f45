//! Reader abstraction — pluggable token-scanning hardware drivers.
//!
//! Each driver implements [`Reader`] and pushes [`Scan`] envelopes onto
//! a shared channel from its own polling task. Hardware drivers
//! (serial, PC/SC, libnfc) live outside the core; the file-based
//! virtual reader ships here.

pub mod file;

use tokio::sync::mpsc;

use crate::token::Token;

/// Errors raised by reader drivers.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// Device string was not of the `driver:path` form or named an
    /// unsupported driver.
    #[error("invalid device string: {0}")]
    InvalidDevice(String),
    #[error("device I/O: {0}")]
    Io(#[from] std::io::Error),
    /// A poll against an open device failed.
    #[error("read failed: {0}")]
    Read(String),
    #[error("reader does not support writing")]
    WriteUnsupported,
    #[error("write failed: {0}")]
    Write(String),
}

/// Transport envelope from a reader to the coordinator.
///
/// `token == None` reports removal. An error scan carries no token and
/// must not mutate active/last-scanned state.
#[derive(Debug)]
pub struct Scan {
    /// Device string of the originating reader.
    pub source: String,
    pub token: Option<Token>,
    pub error: Option<ReaderError>,
}

impl Scan {
    pub fn token(source: impl Into<String>, token: Option<Token>) -> Self {
        Self {
            source: source.into(),
            token,
            error: None,
        }
    }

    pub fn error(source: impl Into<String>, error: ReaderError) -> Self {
        Self {
            source: source.into(),
            token: None,
            error: Some(error),
        }
    }
}

/// Capability interface implemented by each reader driver.
pub trait Reader: Send {
    /// Device string prefixes supported by this driver.
    fn ids(&self) -> &[&'static str];

    /// Open the device and start polling, pushing results onto `scans`.
    fn open(&mut self, device: &str, scans: mpsc::UnboundedSender<Scan>)
    -> Result<(), ReaderError>;

    /// Stop polling and release the device.
    fn close(&mut self) -> Result<(), ReaderError>;

    /// Search for a connectable device not already in `connected`,
    /// returning its device string if found.
    fn detect(&self, connected: &[String]) -> Option<String>;

    /// Whether the device is connected and actively polling.
    fn connected(&self) -> bool;

    /// The device string this reader was opened against.
    fn device(&self) -> String;

    /// Human-readable description of the connected device.
    fn info(&self) -> String;

    /// Write `text` to a present token, if the device supports it.
    /// Blocks until completion or timeout.
    fn write(&mut self, _text: &str) -> Result<Token, ReaderError> {
        Err(ReaderError::WriteUnsupported)
    }
}

/// Split a `driver:path` device string.
pub fn parse_device(device: &str) -> Result<(&str, &str), ReaderError> {
    device
        .split_once(':')
        .filter(|(driver, _)| !driver.is_empty())
        .ok_or_else(|| ReaderError::InvalidDevice(device.to_string()))
}

//! Token value types — a resolved scan event, physical or remote.
//!
//! Tokens are transient values: they flow through channels and are
//! copied into state snapshots, never shared by reference across tasks.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Tag family names reported by reader drivers.
pub mod kind {
    pub const NTAG: &str = "NTAG";
    pub const MIFARE: &str = "MIFARE";
    pub const AMIIBO: &str = "Amiibo";
    pub const FILE: &str = "file";
}

/// Source sentinel for tokens injected through the remote API rather
/// than a physical reader.
pub const SOURCE_API: &str = "api";

/// A scan event or virtual scan.
///
/// `scan_time == None` marks an invalid/empty token: the value used to
/// clear the active token on removal, and never eligible for launching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Tag family (see [`kind`]), or empty for remote tokens.
    pub kind: String,
    /// Hardware identifier. May be empty for remote/file tokens.
    pub uid: String,
    /// Decoded payload or command string.
    pub text: String,
    /// Raw payload, implementation-defined encoding.
    pub data: String,
    /// Moment the token was scanned. `None` means this is the empty
    /// token and it must not be enqueued for processing.
    pub scan_time: Option<OffsetDateTime>,
    /// True if injected via the API rather than a physical reader.
    pub remote: bool,
    /// Originating reader's device string, or [`SOURCE_API`].
    pub source: String,
}

impl Token {
    /// Identity comparison for dedupe: uid, text, data and kind only.
    /// Scan time and source are excluded.
    pub fn same_token(&self, other: &Token) -> bool {
        self.uid == other.uid
            && self.text == other.text
            && self.data == other.data
            && self.kind == other.kind
    }

    /// Whether this token carries a scan time and may be processed.
    pub fn is_valid(&self) -> bool {
        self.scan_time.is_some()
    }
}

/// Identity comparison over optional tokens. Two absent tokens are
/// equal; presence mismatch is not.
pub fn tokens_equal(a: Option<&Token>, b: Option<&Token>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_token(b),
        _ => false,
    }
}

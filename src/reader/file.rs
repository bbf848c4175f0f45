//! File-based virtual reader.
//!
//! Watches a plain text file: non-empty contents are a present token,
//! an empty file is a removal. Useful for testing the pipeline and for
//! scripting scans without hardware.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::mpsc;

use super::{Reader, ReaderError, Scan, parse_device};
use crate::token::{Token, kind};

const POLL_PERIOD: Duration = Duration::from_millis(100);

/// Virtual reader for `file:/abs/path` device strings.
pub struct FileReader {
    device: String,
    path: PathBuf,
    polling: Arc<AtomicBool>,
}

impl FileReader {
    pub fn new() -> Self {
        Self {
            device: String::new(),
            path: PathBuf::new(),
            polling: Arc::new(AtomicBool::new(false)),
        }
    }

    fn token_from_contents(device: &str, contents: &[u8]) -> Option<Token> {
        let text = String::from_utf8_lossy(contents).trim().to_string();
        if text.is_empty() {
            return None;
        }
        Some(Token {
            kind: kind::FILE.into(),
            uid: String::new(),
            text,
            data: hex_encode(contents),
            scan_time: Some(OffsetDateTime::now_utc()),
            remote: false,
            source: device.to_string(),
        })
    }
}

impl Default for FileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader for FileReader {
    fn ids(&self) -> &[&'static str] {
        &["file"]
    }

    fn open(
        &mut self,
        device: &str,
        scans: mpsc::UnboundedSender<Scan>,
    ) -> Result<(), ReaderError> {
        let (driver, path) = parse_device(device)?;
        if !self.ids().contains(&driver) {
            return Err(ReaderError::InvalidDevice(device.to_string()));
        }

        let path = Path::new(path);
        if !path.is_absolute() {
            return Err(ReaderError::InvalidDevice(format!(
                "path must be absolute: {}",
                path.display()
            )));
        }
        let parent = path
            .parent()
            .ok_or_else(|| ReaderError::InvalidDevice(device.to_string()))?;
        std::fs::metadata(parent)?;
        if std::fs::metadata(path).is_err() {
            std::fs::write(path, b"")?;
        }

        self.device = device.to_string();
        self.path = path.to_path_buf();
        self.polling.store(true, Ordering::Relaxed);

        let polling = Arc::clone(&self.polling);
        let device = self.device.clone();
        let file = self.path.clone();
        tokio::spawn(async move {
            let mut current: Option<Token> = None;
            while polling.load(Ordering::Relaxed) {
                tokio::time::sleep(POLL_PERIOD).await;

                let contents = match tokio::fs::read(&file).await {
                    Ok(c) => c,
                    Err(e) => {
                        if scans.send(Scan::error(&device, e.into())).is_err() {
                            return;
                        }
                        continue;
                    }
                };

                let next = FileReader::token_from_contents(&device, &contents);
                match (&current, &next) {
                    (Some(_), None) => {
                        tracing::debug!(device = %device, "file empty, token removed");
                        current = None;
                        if scans.send(Scan::token(&device, None)).is_err() {
                            return;
                        }
                    }
                    (cur, Some(token)) if !cur.as_ref().is_some_and(|c| c.text == token.text) => {
                        tracing::debug!(device = %device, text = %token.text, "new file token");
                        current = Some(token.clone());
                        if scans.send(Scan::token(&device, Some(token.clone()))).is_err() {
                            return;
                        }
                    }
                    _ => {}
                }
            }
        });

        Ok(())
    }

    fn close(&mut self) -> Result<(), ReaderError> {
        self.polling.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn detect(&self, _connected: &[String]) -> Option<String> {
        // File readers are always explicitly configured.
        None
    }

    fn connected(&self) -> bool {
        self.polling.load(Ordering::Relaxed)
    }

    fn device(&self) -> String {
        self.device.clone()
    }

    fn info(&self) -> String {
        format!("virtual file reader ({})", self.path.display())
    }

    fn write(&mut self, text: &str) -> Result<Token, ReaderError> {
        if !self.connected() {
            return Err(ReaderError::Write("reader not open".into()));
        }
        std::fs::write(&self.path, text)
            .map_err(|e| ReaderError::Write(e.to_string()))?;
        Ok(Token {
            kind: kind::FILE.into(),
            text: text.trim().to_string(),
            data: hex_encode(text.as_bytes()),
            scan_time: Some(OffsetDateTime::now_utc()),
            source: self.device.clone(),
            ..Token::default()
        })
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_reader(
        contents: &str,
    ) -> (
        FileReader,
        mpsc::UnboundedReceiver<Scan>,
        PathBuf,
        tempfile::TempDir,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, contents).unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let mut reader = FileReader::new();
        reader
            .open(&format!("file:{}", path.display()), tx)
            .unwrap();
        (reader, rx, path, dir)
    }

    #[tokio::test]
    async fn emits_token_then_removal() {
        let (mut reader, mut rx, path, _dir) = open_reader("snes/game.sfc").await;

        let scan = rx.recv().await.unwrap();
        let token = scan.token.expect("expected a token scan");
        assert_eq!(token.text, "snes/game.sfc");
        assert_eq!(token.kind, kind::FILE);
        assert!(token.is_valid());

        std::fs::write(&path, "").unwrap();
        let scan = rx.recv().await.unwrap();
        assert!(scan.token.is_none(), "expected removal scan");

        reader.close().unwrap();
        assert!(!reader.connected());
    }

    #[tokio::test]
    async fn unchanged_contents_do_not_repeat() {
        let (mut reader, mut rx, path, _dir) = open_reader("game-a").await;
        let first = rx.recv().await.unwrap();
        assert_eq!(first.token.unwrap().text, "game-a");

        // No change for several poll periods, then a new value.
        tokio::time::sleep(POLL_PERIOD * 3).await;
        std::fs::write(&path, "game-b").unwrap();
        let next = rx.recv().await.unwrap();
        assert_eq!(next.token.unwrap().text, "game-b");

        reader.close().unwrap();
    }

    #[tokio::test]
    async fn write_replaces_contents() {
        let (mut reader, mut rx, path, _dir) = open_reader("").await;
        let written = reader.write("**delay:50").unwrap();
        assert_eq!(written.text, "**delay:50");

        let scan = rx.recv().await.unwrap();
        assert_eq!(scan.token.unwrap().text, "**delay:50");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "**delay:50");
        reader.close().unwrap();
    }

    #[tokio::test]
    async fn open_rejects_relative_and_foreign_devices() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut reader = FileReader::new();
        assert!(reader.open("file:relative/path", tx.clone()).is_err());
        assert!(reader.open("pn532:/dev/ttyUSB0", tx).is_err());
    }
}

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tally_proto::records::AlertRecord;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("spool io: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode alert: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Delivery channel for a single alert. No retries; the caller just learns
/// whether it went out.
pub trait Transport {
    fn deliver(&mut self, subject: &str, body: &str) -> Result<(), DeliveryError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn deliver(&mut self, subject: &str, body: &str) -> Result<(), DeliveryError> {
        (**self).deliver(subject, body)
    }
}

pub fn unix_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn deliver(&mut self, subject: &str, body: &str) -> Result<(), DeliveryError> {
        warn!(subject, body = %body.replace('\n', " | "), "alert");
        Ok(())
    }
}

/// Appends one JSON `AlertRecord` per line.
#[derive(Debug, Clone)]
pub struct SpoolTransport {
    path: PathBuf,
}

impl SpoolTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Transport for SpoolTransport {
    fn deliver(&mut self, subject: &str, body: &str) -> Result<(), DeliveryError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let rec = AlertRecord {
            ts_unix_ms: unix_ms(),
            subject: subject.to_string(),
            body: body.to_string(),
        };
        let mut line = serde_json::to_vec(&rec)?;
        line.push(b'\n');

        let mut f = OpenOptions::new().create(true).append(true).open(&self.path)?;
        f.write_all(&line)?;
        Ok(())
    }
}

/// Keeps deliveries in memory. `fail_next` makes the next delivery fail.
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    pub sent: Vec<(String, String)>,
    pub fail_next: bool,
}

impl Transport for MemoryTransport {
    fn deliver(&mut self, subject: &str, body: &str) -> Result<(), DeliveryError> {
        if std::mem::take(&mut self.fail_next) {
            return Err(DeliveryError::Rejected("injected failure".into()));
        }
        self.sent.push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

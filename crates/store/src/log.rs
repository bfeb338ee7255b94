//! JSON-lines delivery log with a single writer task

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use kronos_core::{DeliveredMessage, NewMessage};

use crate::ids::IdGenerator;
use crate::{Result, StoreError};

/// Default depth of the append queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

struct AppendCommand {
    message: NewMessage,
    reply: oneshot::Sender<Result<DeliveredMessage>>,
}

/// Handle to an append-only delivery log
///
/// Cloning is cheap; every clone feeds the same writer task.
#[derive(Clone, Debug)]
pub struct DeliveryStore {
    path: PathBuf,
    tx: mpsc::Sender<AppendCommand>,
}

impl DeliveryStore {
    /// Open (or create) the log at `path` and start its writer task.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_capacity(path, DEFAULT_QUEUE_CAPACITY).await
    }

    pub async fn open_with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let raw = read_raw(&path).await?;
        let existing = parse_log(&raw);
        let last_id = existing.iter().map(|m| m.id).max().unwrap_or(0);

        let mut file = OpenOptions::new().create(true).append(true).open(&path).await?;

        // Terminate a torn final line so the next append starts on its own line
        if raw.last().is_some_and(|b| *b != b'\n') {
            warn!("Delivery store {:?} ends mid-line, terminating it", path);
            file.write_all(b"\n").await?;
            file.flush().await?;
        }

        info!(
            "Opened delivery store {:?} ({} entries, last id {})",
            path,
            existing.len(),
            last_id
        );

        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(run_writer(file, IdGenerator::starting_after(last_id), rx));

        Ok(Self { path, tx })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Assign an id and timestamp, then append the message to the log.
    ///
    /// Resolves once the line has been written.
    pub async fn append(&self, message: NewMessage) -> Result<DeliveredMessage> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AppendCommand { message, reply })
            .await
            .map_err(|_| StoreError::WriterClosed)?;
        rx.await.map_err(|_| StoreError::WriterClosed)?
    }

    /// Every entry that parses, in append order
    pub async fn list(&self) -> Result<Vec<DeliveredMessage>> {
        read_entries(&self.path).await
    }
}

async fn run_writer(
    mut file: fs::File,
    mut ids: IdGenerator,
    mut rx: mpsc::Receiver<AppendCommand>,
) {
    while let Some(cmd) = rx.recv().await {
        let result = write_entry(&mut file, &mut ids, cmd.message).await;
        if let Err(e) = &result {
            warn!("Delivery store append failed: {}", e);
        }
        // Caller may have gone away; the entry is written regardless
        let _ = cmd.reply.send(result);
    }
    debug!("Delivery store writer stopped");
}

async fn write_entry(
    file: &mut fs::File,
    ids: &mut IdGenerator,
    message: NewMessage,
) -> Result<DeliveredMessage> {
    let now = Utc::now();
    let delivered = message.into_delivered(ids.next(now), now);

    let mut line = delivered.to_json()?;
    line.push('\n');
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;

    debug!("Appended message {}", delivered.id);
    Ok(delivered)
}

async fn read_raw(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path).await {
        Ok(raw) => Ok(raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

async fn read_entries(path: &Path) -> Result<Vec<DeliveredMessage>> {
    Ok(parse_log(&read_raw(path).await?))
}

/// Parse a JSON-lines log, skipping blank, non-UTF-8 and unparseable lines
pub fn parse_log(contents: &[u8]) -> Vec<DeliveredMessage> {
    contents
        .split(|b| *b == b'\n')
        .enumerate()
        .filter_map(|(idx, line)| {
            let line = match std::str::from_utf8(line) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Skipping corrupt store entry at line {}: {}", idx + 1, e);
                    return None;
                }
            };
            if line.trim().is_empty() {
                return None;
            }
            match DeliveredMessage::from_json(line) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("Skipping corrupt store entry at line {}: {}", idx + 1, e);
                    None
                }
            }
        })
        .collect()
}

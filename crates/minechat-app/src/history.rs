//! Chat history persistence: append received lines, replay them on startup.
//!
//! Best-effort by design. A failed append is logged and skipped; replay of
//! a missing file is simply an empty history.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Load previously saved chat lines, oldest first.
pub async fn replay(path: &Path) -> io::Result<Vec<String>> {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut lines = BufReader::new(file).lines();
    let mut history = Vec::new();
    while let Some(line) = lines.next_line().await? {
        history.push(line);
    }
    Ok(history)
}

/// Append one chat line to the history file, creating it if needed.
pub async fn append(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(())
}

/// Drain the persistence channel into the history file until the core
/// hangs up.
pub async fn writer_task(path: PathBuf, mut persist_rx: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = persist_rx.recv().await {
        if let Err(err) = append(&path, &line).await {
            tracing::warn!(error = %err, path = %path.display(), "failed to append history");
        }
    }
}

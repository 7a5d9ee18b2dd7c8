use std::path::Path;
use std::time::Duration;

use log::warn;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use walkdir::WalkDir;

use crate::core_channel::{ChannelReader, ChannelWriter};
use crate::core_transfer::ProgressReporter;
use crate::error::FtpError;

/// Sends one file payload frame: the byte length as a line, then exactly
/// that many raw bytes in bounded chunks. Markers around the frame
/// (`SENDING_FILE`, `END_OF_FILE`, a relative path line) belong to the
/// caller; this function owns only the length/byte pair.
pub async fn send_file(
    writer: &mut ChannelWriter,
    path: &Path,
    chunk_size: usize,
    progress: Option<&ProgressReporter>,
) -> Result<u64, FtpError> {
    let mut file = File::open(path).await.map_err(FtpError::Filesystem)?;
    let declared = file.metadata().await.map_err(FtpError::Filesystem)?.len();
    writer.send_line(&declared.to_string()).await?;

    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut sent: u64 = 0;
    while sent < declared {
        let want = buffer.len().min((declared - sent) as usize);
        let read = file
            .read(&mut buffer[..want])
            .await
            .map_err(FtpError::Filesystem)?;
        if read == 0 {
            // The file shrank after its length went on the wire; the
            // stream cannot be repaired from here.
            return Err(FtpError::ProtocolViolation(format!(
                "file truncated while sending after {} of {} bytes",
                sent, declared
            )));
        }
        writer.write_bytes(&buffer[..read]).await?;
        sent += read as u64;
        if let Some(reporter) = progress {
            reporter.tick(sent);
        }
    }
    if let Some(reporter) = progress {
        reporter.finish(sent);
    }
    Ok(sent)
}

/// Receives one file payload of `declared` bytes into `dest`, creating
/// parent directories as needed.
///
/// A short read is a severed connection: the partial file is removed and
/// `ConnectionClosed` surfaces, so nothing on disk claims to be complete.
/// A local filesystem failure drains the remaining declared bytes first,
/// keeping the channel aligned for the next frame, then reports the error.
pub async fn recv_file(
    reader: &mut ChannelReader,
    dest: &Path,
    declared: u64,
    chunk_size: usize,
    data_timeout: Duration,
    progress: Option<&ProgressReporter>,
) -> Result<u64, FtpError> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent).await {
                drain_bytes(reader, declared, chunk_size, data_timeout).await?;
                return Err(FtpError::Filesystem(e));
            }
        }
    }
    let mut file = match File::create(dest).await {
        Ok(f) => f,
        Err(e) => {
            drain_bytes(reader, declared, chunk_size, data_timeout).await?;
            return Err(FtpError::Filesystem(e));
        }
    };

    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut received: u64 = 0;
    while received < declared {
        let want = buffer.len().min((declared - received) as usize);
        if let Err(e) = reader.read_bytes(&mut buffer[..want], data_timeout).await {
            drop(file);
            remove_partial(dest).await;
            return Err(e);
        }
        if let Err(e) = file.write_all(&buffer[..want]).await {
            drop(file);
            remove_partial(dest).await;
            drain_bytes(reader, declared - received - want as u64, chunk_size, data_timeout)
                .await?;
            return Err(FtpError::Filesystem(e));
        }
        received += want as u64;
        if let Some(reporter) = progress {
            reporter.tick(received);
        }
    }
    file.flush().await.map_err(FtpError::Filesystem)?;
    if let Some(reporter) = progress {
        reporter.finish(received);
    }
    Ok(received)
}

/// Consumes and discards `remaining` payload bytes, keeping the channel
/// aligned after a skipped file.
pub async fn drain_bytes(
    reader: &mut ChannelReader,
    mut remaining: u64,
    chunk_size: usize,
    data_timeout: Duration,
) -> Result<(), FtpError> {
    let mut buffer = vec![0u8; chunk_size.max(1)];
    while remaining > 0 {
        let want = buffer.len().min(remaining as usize);
        reader.read_bytes(&mut buffer[..want], data_timeout).await?;
        remaining -= want as u64;
    }
    Ok(())
}

async fn remove_partial(dest: &Path) {
    if let Err(e) = fs::remove_file(dest).await {
        warn!("could not remove partial file {:?}: {}", dest, e);
    }
}

/// Enumerates every file beneath `dir`, depth first, as
/// `(forward-slash relative path, byte length)` pairs in a stable order.
pub fn collect_files(dir: &Path) -> Result<Vec<(String, u64)>, FtpError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            FtpError::Filesystem(
                e.into_io_error()
                    .unwrap_or_else(|| {
                        std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed")
                    }),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(|_| {
                FtpError::Filesystem(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "walked outside the tree",
                ))
            })?;
        let rel_str = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let length = entry
            .metadata()
            .map_err(|e| {
                FtpError::Filesystem(
                    e.into_io_error()
                        .unwrap_or_else(|| {
                            std::io::Error::new(std::io::ErrorKind::Other, "metadata failed")
                        }),
                )
            })?
            .len();
        files.push((rel_str, length));
    }
    Ok(files)
}

/// Average throughput in KB/s for a completed transfer.
pub fn transfer_rate(bytes: u64, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64().max(0.001);
    bytes as f64 / 1024.0 / seconds
}

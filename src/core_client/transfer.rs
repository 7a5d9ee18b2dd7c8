use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::constants::{
    DOWNLOAD_CHUNK_SIZE, END_OF_DIR, END_OF_FILE, FILE_RECEIVED, MAX_GET_ATTEMPTS, READY_FOR_DIR,
    SENDING_DIR, SENDING_FILE, UPLOAD_CHUNK_SIZE,
};
use crate::core_client::{OpOutcome, Session};
use crate::core_sandbox;
use crate::core_transfer::{
    collect_files, drain_bytes, recv_file, transfer_rate, ProgressFn, ProgressReporter,
};
use crate::error::FtpError;

/// Result of a single download attempt: the server either refused with an
/// error line, or the payload arrived.
enum FileAttempt {
    Refused(String),
    Transferred { bytes: u64, elapsed: Duration },
}

impl Session {
    /// Downloads one remote file to `dest`.
    ///
    /// Timeouts retry the whole transfer up to a fixed bound, with a
    /// reconnect and navigation replay between attempts; a failed file
    /// always restarts from zero, the protocol has no resume offset. Any
    /// other error gets one lighter recovery probe before it surfaces.
    pub async fn download_file(
        &self,
        name: &str,
        dest: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<OpOutcome, FtpError> {
        for attempt in 1..=MAX_GET_ATTEMPTS {
            info!(
                "Downloading file {:?} (attempt {}/{})",
                name, attempt, MAX_GET_ATTEMPTS
            );
            match self.download_file_once(name, dest, progress.clone()).await {
                Ok(FileAttempt::Refused(message)) => {
                    warn!("Server refused GET: {}", message);
                    return Ok(OpOutcome::failure(message));
                }
                Ok(FileAttempt::Transferred { bytes, elapsed }) => {
                    if let Err(e) = self.keepalive().await {
                        return Err(self.handle_fatal(e).await);
                    }
                    let message = format!(
                        "Downloaded {} ({} bytes, {:.1} KB/s)",
                        name,
                        bytes,
                        transfer_rate(bytes, elapsed)
                    );
                    info!("{}", message);
                    return Ok(OpOutcome::success(message));
                }
                Err(FtpError::Timeout(limit)) => {
                    warn!(
                        "Timeout after {:?} while downloading (attempt {}/{})",
                        limit, attempt, MAX_GET_ATTEMPTS
                    );
                    if attempt < MAX_GET_ATTEMPTS {
                        info!("Reconnecting and retrying...");
                        if let Err(e) = self.reconnect_and_replay().await {
                            warn!("Reconnect failed: {}", e);
                        }
                    } else {
                        error!("Download of {:?} failed, retry budget exhausted.", name);
                        self.teardown().await;
                        return Err(FtpError::RetryExhausted(MAX_GET_ATTEMPTS));
                    }
                }
                Err(e) => {
                    error!("Download error: {}", e);
                    if !self.try_recover().await {
                        self.teardown().await;
                    }
                    return Err(e);
                }
            }
        }
        Err(FtpError::RetryExhausted(MAX_GET_ATTEMPTS))
    }

    async fn download_file_once(
        &self,
        name: &str,
        dest: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<FileAttempt, FtpError> {
        let started = Instant::now();
        let mut guard = self.reader.lock().await;
        self.send_command(&format!("GET {}", name)).await?;
        let reader = guard.as_mut().ok_or(FtpError::ConnectionClosed)?;

        let response = reader.read_line(self.response_timeout).await?;
        if response != SENDING_FILE {
            return Ok(FileAttempt::Refused(response));
        }
        let size_line = reader.read_line(self.response_timeout).await?;
        let declared: u64 = size_line.trim().parse().map_err(|_| {
            FtpError::ProtocolViolation(format!("invalid length line: {:?}", size_line))
        })?;
        debug!("File size: {} bytes, downloading...", declared);

        let reporter = ProgressReporter::new(declared, progress);
        let bytes = recv_file(
            reader,
            dest,
            declared,
            DOWNLOAD_CHUNK_SIZE,
            self.data_timeout,
            Some(&reporter),
        )
        .await?;

        let trailer = reader.read_line(self.response_timeout).await?;
        if trailer != END_OF_FILE {
            warn!("Expected {} but received: {:?}", END_OF_FILE, trailer);
        }
        Ok(FileAttempt::Transferred {
            bytes,
            elapsed: started.elapsed(),
        })
    }

    /// Uploads one local file into the current remote directory.
    pub async fn upload_file(
        &self,
        path: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<OpOutcome, FtpError> {
        match self.upload_file_inner(path, progress).await {
            Err(e) if e.is_fatal() => Err(self.handle_fatal(e).await),
            Err(e) => {
                error!("Upload error: {}", e);
                if !self.try_recover().await {
                    self.teardown().await;
                }
                Err(e)
            }
            Ok(outcome) => Ok(outcome),
        }
    }

    async fn upload_file_inner(
        &self,
        path: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<OpOutcome, FtpError> {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Ok(OpOutcome::failure(format!("Not a file path: {:?}", path)));
        };
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) if m.is_file() => m,
            _ => return Ok(OpOutcome::failure(format!("Local file not found: {:?}", path))),
        };
        let declared = metadata.len();
        info!(
            "Uploading file {} ({} bytes) to {}",
            name,
            declared,
            self.current_directory()
        );
        let started = Instant::now();

        let mut guard = self.reader.lock().await;
        self.send_command(&format!("PUT {}", name)).await?;
        let reader = guard.as_mut().ok_or(FtpError::ConnectionClosed)?;

        let response = reader.read_line(self.response_timeout).await?;
        if response != SENDING_FILE {
            warn!("Server refused PUT: {}", response);
            return Ok(OpOutcome::failure(response));
        }

        // The confirmation and its length line go out under one lock
        // acquisition; a concurrent probe cannot split the pair.
        self.send_lines(&[SENDING_FILE, &declared.to_string()])
            .await?;

        let reporter = ProgressReporter::new(declared, progress);
        let mut file = File::open(path).await.map_err(FtpError::Filesystem)?;
        let mut buffer = vec![0u8; UPLOAD_CHUNK_SIZE];
        let mut sent: u64 = 0;
        while sent < declared {
            let want = buffer.len().min((declared - sent) as usize);
            let read = file
                .read(&mut buffer[..want])
                .await
                .map_err(FtpError::Filesystem)?;
            if read == 0 {
                return Err(FtpError::ProtocolViolation(format!(
                    "file truncated while uploading after {} of {} bytes",
                    sent, declared
                )));
            }
            self.write_chunk(&buffer[..read]).await?;
            sent += read as u64;
            reporter.tick(sent);
        }
        reporter.finish(sent);
        debug!("File data sent completely.");

        let confirmation = reader.read_line(self.response_timeout).await?;
        drop(guard);
        self.keepalive().await?;

        if confirmation != FILE_RECEIVED {
            warn!("Server did not confirm upload: {}", confirmation);
            return Ok(OpOutcome::failure(confirmation));
        }
        let message = format!(
            "Uploaded {} ({} bytes, {:.1} KB/s)",
            name,
            sent,
            transfer_rate(sent, started.elapsed())
        );
        info!("{}", message);
        Ok(OpOutcome::success(message))
    }

    /// Downloads a remote directory tree beneath `dest`.
    ///
    /// Per-file failures are skipped and tallied, never fatal to the rest
    /// of the transfer. Progress is reported per file, since lengths are
    /// only declared file by file on the wire.
    pub async fn download_directory(
        &self,
        name: &str,
        dest: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<OpOutcome, FtpError> {
        match self.download_directory_inner(name, dest, progress).await {
            Err(e) if e.is_fatal() => Err(self.handle_fatal(e).await),
            Err(e) => {
                error!("Directory download error: {}", e);
                if !self.try_recover().await {
                    self.teardown().await;
                }
                Err(e)
            }
            Ok(outcome) => Ok(outcome),
        }
    }

    async fn download_directory_inner(
        &self,
        name: &str,
        dest: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<OpOutcome, FtpError> {
        tokio::fs::create_dir_all(dest)
            .await
            .map_err(FtpError::Filesystem)?;
        info!("Downloading directory {:?} to {:?}", name, dest);
        let started = Instant::now();

        let mut guard = self.reader.lock().await;
        self.send_command(&format!("GETDIR {}", name)).await?;
        let reader = guard.as_mut().ok_or(FtpError::ConnectionClosed)?;

        let response = reader.read_line(self.response_timeout).await?;
        if response != SENDING_DIR {
            warn!("Server refused GETDIR: {}", response);
            return Ok(OpOutcome::failure(response));
        }
        let count_line = reader.read_line(self.response_timeout).await?;
        let file_count: usize = count_line.trim().parse().map_err(|_| {
            FtpError::ProtocolViolation(format!("invalid file count: {:?}", count_line))
        })?;
        debug!("Server will send {} files", file_count);

        let mut successes: usize = 0;
        let mut received_total: u64 = 0;
        for index in 0..file_count {
            let relative = reader.read_line(self.response_timeout).await?;
            let size_line = reader.read_line(self.response_timeout).await?;
            let declared: u64 = size_line.trim().parse().map_err(|_| {
                FtpError::ProtocolViolation(format!(
                    "invalid length line {:?} for entry {:?}",
                    size_line, relative
                ))
            })?;

            let target = match core_sandbox::safe_join(dest, &relative) {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping entry escaping destination {:?}: {}", relative, e);
                    drain_bytes(reader, declared, DOWNLOAD_CHUNK_SIZE, self.data_timeout).await?;
                    continue;
                }
            };
            let reporter = ProgressReporter::new(declared, progress.clone());
            match recv_file(
                reader,
                &target,
                declared,
                DOWNLOAD_CHUNK_SIZE,
                self.data_timeout,
                Some(&reporter),
            )
            .await
            {
                Ok(received) => {
                    debug!(
                        "Received file {}/{}: {} ({} bytes)",
                        index + 1,
                        file_count,
                        relative,
                        received
                    );
                    successes += 1;
                    received_total += received;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => error!("Failed to store {:?}: {}", relative, e),
            }
        }

        let end = reader.read_line(self.response_timeout).await?;
        if end != END_OF_DIR {
            warn!("Expected {} but received: {:?}", END_OF_DIR, end);
        }
        drop(guard);
        self.keepalive().await?;

        let message = format!(
            "Downloaded directory {}: {}/{} files ({} bytes, {:.1} KB/s)",
            name,
            successes,
            file_count,
            received_total,
            transfer_rate(received_total, started.elapsed())
        );
        info!("{}", message);
        Ok(OpOutcome::success(message))
    }

    /// Uploads a local directory tree into the current remote directory.
    /// Progress is cumulative against the locally computed total size.
    pub async fn upload_directory(
        &self,
        path: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<OpOutcome, FtpError> {
        match self.upload_directory_inner(path, progress).await {
            Err(e) if e.is_fatal() => Err(self.handle_fatal(e).await),
            Err(e) => {
                error!("Directory upload error: {}", e);
                if !self.try_recover().await {
                    self.teardown().await;
                }
                Err(e)
            }
            Ok(outcome) => Ok(outcome),
        }
    }

    async fn upload_directory_inner(
        &self,
        path: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<OpOutcome, FtpError> {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Ok(OpOutcome::failure(format!("Not a folder path: {:?}", path)));
        };
        if !path.is_dir() {
            return Ok(OpOutcome::failure(format!(
                "Local folder not found: {:?}",
                path
            )));
        }
        let files = collect_files(path)?;
        let total: u64 = files.iter().map(|(_, len)| len).sum();
        info!(
            "Uploading folder {} to {}: {} files, {} bytes",
            name,
            self.current_directory(),
            files.len(),
            total
        );
        let started = Instant::now();

        let mut guard = self.reader.lock().await;
        self.send_command(&format!("PUTDIR {}", name)).await?;
        let reader = guard.as_mut().ok_or(FtpError::ConnectionClosed)?;

        let response = reader.read_line(self.response_timeout).await?;
        if response != READY_FOR_DIR {
            warn!("Server not ready for folder: {}", response);
            return Ok(OpOutcome::failure(response));
        }
        self.send_lines(&[SENDING_DIR, &files.len().to_string()])
            .await?;

        let reporter = ProgressReporter::new(total, progress);
        let mut uploaded: u64 = 0;
        let mut buffer = vec![0u8; UPLOAD_CHUNK_SIZE];
        for (index, (relative, _)) in files.iter().enumerate() {
            let file_path = path.join(relative);
            let mut file = File::open(&file_path).await.map_err(FtpError::Filesystem)?;
            let declared = file
                .metadata()
                .await
                .map_err(FtpError::Filesystem)?
                .len();
            self.send_lines(&[relative, &declared.to_string()]).await?;
            debug!(
                "Sending file ({}/{}): {} ({} bytes)",
                index + 1,
                files.len(),
                relative,
                declared
            );

            let mut sent: u64 = 0;
            while sent < declared {
                let want = buffer.len().min((declared - sent) as usize);
                let read = file
                    .read(&mut buffer[..want])
                    .await
                    .map_err(FtpError::Filesystem)?;
                if read == 0 {
                    return Err(FtpError::ProtocolViolation(format!(
                        "file truncated while uploading: {:?}",
                        relative
                    )));
                }
                self.write_chunk(&buffer[..read]).await?;
                sent += read as u64;
                uploaded += read as u64;
                reporter.tick(uploaded);
            }
        }
        reporter.finish(uploaded);

        let confirmation = reader.read_line(self.data_timeout).await?;
        info!("Server: {}", confirmation);
        drop(guard);
        self.keepalive().await?;

        let message = format!(
            "Uploaded folder {}: {} files, {} bytes ({:.1} KB/s): {}",
            name,
            files.len(),
            uploaded,
            transfer_rate(uploaded, started.elapsed()),
            confirmation
        );
        info!("{}", message);
        Ok(OpOutcome::success(message))
    }
}

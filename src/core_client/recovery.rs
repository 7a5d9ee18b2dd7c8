use std::sync::atomic::Ordering;

use log::{debug, info, warn};
use tokio::time::sleep;

use crate::constants::{END_OF_LIST, KEEPALIVE_TIMEOUT, RECONNECT_DELAY};
use crate::core_client::Session;
use crate::error::FtpError;

impl Session {
    /// Drops both channel halves and marks the session dead. Safe to call
    /// twice; dropping the halves closes the socket.
    pub(crate) async fn teardown(&self) {
        self.connected.store(false, Ordering::SeqCst);
        {
            let mut writer = self.writer.lock().await;
            if let Some(writer) = writer.as_mut() {
                writer.shutdown().await;
            }
            *writer = None;
        }
        {
            let mut reader = self.reader.lock().await;
            *reader = None;
        }
        debug!("Session torn down.");
    }

    /// Rebuilds the connection and replays the navigation to the last
    /// known virtual directory, one CD per path segment.
    pub(crate) async fn reconnect_and_replay(&self) -> Result<(), FtpError> {
        self.teardown().await;
        sleep(RECONNECT_DELAY).await;
        info!("Attempting to reconnect to {}:{}...", self.host, self.port);

        let (reader, writer, banner) = Self::dial(
            &self.host,
            self.port,
            self.connect_timeout,
            self.response_timeout,
        )
        .await?;
        {
            *self.reader.lock().await = Some(reader);
            *self.writer.lock().await = Some(writer);
        }
        self.connected.store(true, Ordering::SeqCst);
        info!("Reconnected. Server: {}", banner);

        let remembered = self.current_directory();
        if remembered != "/" {
            // A fresh connection starts at the root; walk back down.
            self.set_current_directory("/");
            for segment in remembered.split('/').filter(|s| !s.is_empty()) {
                let outcome = self.navigate(&format!("CD {}", segment)).await?;
                if !outcome.success {
                    warn!(
                        "Failed to replay navigation at {:?}: {}",
                        segment, outcome.message
                    );
                    return Ok(());
                }
            }
            info!("Successfully navigated back to {}", remembered);
        }
        Ok(())
    }

    /// Lighter-weight recovery probe: send a LIST and drain the response.
    /// Falls back to a full reconnect when the probe fails. Returns
    /// whether the session is usable again.
    pub(crate) async fn try_recover(&self) -> bool {
        info!("Attempting to recover the connection...");
        if !self.is_connected() {
            return self.reconnect_and_replay().await.is_ok();
        }

        let probe: Result<(), FtpError> = async {
            let mut guard = self.reader.lock().await;
            self.send_command("LIST").await?;
            let reader = guard.as_mut().ok_or(FtpError::ConnectionClosed)?;
            loop {
                let line = reader.read_line(KEEPALIVE_TIMEOUT).await?;
                if line == END_OF_LIST {
                    return Ok(());
                }
            }
        }
        .await;

        match probe {
            Ok(()) => {
                info!("Connection recovery successful.");
                true
            }
            Err(e) => {
                warn!("Recovery probe failed: {}", e);
                self.reconnect_and_replay().await.is_ok()
            }
        }
    }

    /// Keep-alive probe issued after every completed transfer, so a
    /// half-closed connection is noticed before the collaborator is told
    /// the operation succeeded.
    pub(crate) async fn keepalive(&self) -> Result<(), FtpError> {
        debug!("Performing keep-alive check...");
        let mut guard = self.reader.lock().await;
        self.send_command("NOOP").await?;
        let reader = guard.as_mut().ok_or(FtpError::ConnectionClosed)?;
        let response = reader.read_line(KEEPALIVE_TIMEOUT).await?;
        debug!("Keep-alive response: {}", response);
        Ok(())
    }

    /// Terminal-error policy for timeouts and severed connections: the
    /// session is invalidated, one reconnect-and-replay is attempted to
    /// leave it usable, and the original error still surfaces.
    pub(crate) async fn handle_fatal(&self, error: FtpError) -> FtpError {
        warn!("{}; tearing the session down", error);
        self.teardown().await;
        if let Err(e) = self.reconnect_and_replay().await {
            warn!("Reconnect failed: {}", e);
        }
        error
    }
}

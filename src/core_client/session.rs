use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio::sync::Mutex as TokioMutex;
use tokio::time::timeout;

use crate::constants::{
    DEFAULT_DATA_TIMEOUT, DIRECTORY_CREATED, DIRECTORY_DELETED, END_OF_FILE, END_OF_LIST,
    FILE_DELETED, FILE_PREFIX, FOLDER_PREFIX, OK_PREFIX,
};
use crate::core_channel::{self, ChannelReader, ChannelWriter};
use crate::core_client::{ListEntry, OpOutcome};
use crate::error::FtpError;

/// The client side of one logical connection.
///
/// Operations may be invoked concurrently by the collaborator. All socket
/// writes funnel through the one `writer` mutex, held for a single line
/// (or line pair) or a single payload chunk, never across an entire
/// transfer. The `reader` mutex is held by the one in-flight command for
/// its whole exchange, which is what keeps the protocol half duplex: the
/// caller that sent a command is the only one reading its response.
pub struct Session {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) connect_timeout: Duration,
    pub(crate) response_timeout: Duration,
    pub(crate) data_timeout: Duration,
    pub(crate) reader: TokioMutex<Option<ChannelReader>>,
    pub(crate) writer: TokioMutex<Option<ChannelWriter>>,
    pub(crate) current_dir: StdMutex<String>,
    pub(crate) connected: AtomicBool,
}

impl Session {
    /// Dials the server and consumes the welcome banner. The given
    /// timeout bounds the TCP connect and every later response line.
    pub async fn connect(host: &str, port: u16, limit: Duration) -> Result<Session, FtpError> {
        let (reader, writer, banner) = Self::dial(host, port, limit, limit).await?;
        info!("Connected to {}:{}. Server: {}", host, port, banner);
        Ok(Session {
            host: host.to_string(),
            port,
            connect_timeout: limit,
            response_timeout: limit,
            data_timeout: DEFAULT_DATA_TIMEOUT,
            reader: TokioMutex::new(Some(reader)),
            writer: TokioMutex::new(Some(writer)),
            current_dir: StdMutex::new(String::from("/")),
            connected: AtomicBool::new(true),
        })
    }

    pub(crate) async fn dial(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        response_timeout: Duration,
    ) -> Result<(ChannelReader, ChannelWriter, String), FtpError> {
        let stream = timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| FtpError::Timeout(connect_timeout))?
            .map_err(FtpError::from_socket)?;
        let (mut reader, writer) = core_channel::split(stream);
        let banner = reader.read_line(response_timeout).await?;
        Ok((reader, writer, banner))
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// The last virtual directory the server confirmed with an `OK:` line.
    pub fn current_directory(&self) -> String {
        self.current_dir
            .lock()
            .map(|dir| dir.clone())
            .unwrap_or_else(|_| String::from("/"))
    }

    pub(crate) fn set_current_directory(&self, path: &str) {
        if let Ok(mut dir) = self.current_dir.lock() {
            *dir = path.to_string();
        }
    }

    /// Closes the channel and resets the session state.
    pub async fn disconnect(&self) {
        self.teardown().await;
        info!("Disconnected from {}:{}.", self.host, self.port);
    }

    /// Sends one command line under the write-serialization lock.
    pub(crate) async fn send_command(&self, line: &str) -> Result<(), FtpError> {
        let mut writer = self.writer.lock().await;
        match writer.as_mut() {
            Some(writer) => writer.send_line(line).await,
            None => Err(FtpError::ConnectionClosed),
        }
    }

    /// Sends a pair of protocol lines under a single lock acquisition, so
    /// a confirmation and its length line can never be split by a
    /// concurrent writer.
    pub(crate) async fn send_lines(&self, lines: &[&str]) -> Result<(), FtpError> {
        let mut writer = self.writer.lock().await;
        let writer = writer.as_mut().ok_or(FtpError::ConnectionClosed)?;
        for line in lines {
            writer.send_line(line).await?;
        }
        Ok(())
    }

    /// Sends one payload chunk under the write-serialization lock. The
    /// lock is re-acquired per chunk, never held across a whole transfer.
    pub(crate) async fn write_chunk(&self, chunk: &[u8]) -> Result<(), FtpError> {
        let mut writer = self.writer.lock().await;
        match writer.as_mut() {
            Some(writer) => writer.write_bytes(chunk).await,
            None => Err(FtpError::ConnectionClosed),
        }
    }

    /// Lists the current remote directory.
    pub async fn list_current_directory(&self) -> Result<Vec<ListEntry>, FtpError> {
        match self.list_inner().await {
            Err(e) if e.is_fatal() => Err(self.handle_fatal(e).await),
            other => other,
        }
    }

    pub(crate) async fn list_inner(&self) -> Result<Vec<ListEntry>, FtpError> {
        let mut guard = self.reader.lock().await;
        self.send_command("LIST").await?;
        debug!("Sent LIST command to server.");
        let reader = guard.as_mut().ok_or(FtpError::ConnectionClosed)?;

        let mut entries = Vec::new();
        loop {
            let line = reader.read_line(self.response_timeout).await?;
            if line == END_OF_LIST {
                break;
            }
            if let Some(name) = line.strip_prefix(FOLDER_PREFIX) {
                entries.push(ListEntry {
                    name: name.trim().to_string(),
                    is_folder: true,
                });
            } else if let Some(name) = line.strip_prefix(FILE_PREFIX) {
                entries.push(ListEntry {
                    name: name.trim().to_string(),
                    is_folder: false,
                });
            } else {
                // Header or error line; informational either way.
                debug!("Server: {}", line);
            }
        }
        info!("Loaded {} items from server.", entries.len());
        Ok(entries)
    }

    /// Descends into a remote directory.
    pub async fn change_directory(&self, name: &str) -> Result<OpOutcome, FtpError> {
        match self.navigate(&format!("CD {}", name)).await {
            Err(e) if e.is_fatal() => Err(self.handle_fatal(e).await),
            other => other,
        }
    }

    /// Moves to the parent of the current remote directory; idempotent at
    /// the root.
    pub async fn change_directory_up(&self) -> Result<OpOutcome, FtpError> {
        match self.navigate("CDUP").await {
            Err(e) if e.is_fatal() => Err(self.handle_fatal(e).await),
            other => other,
        }
    }

    pub(crate) async fn navigate(&self, command: &str) -> Result<OpOutcome, FtpError> {
        let mut guard = self.reader.lock().await;
        self.send_command(command).await?;
        let reader = guard.as_mut().ok_or(FtpError::ConnectionClosed)?;
        let response = reader.read_line(self.response_timeout).await?;

        if let Some(path) = response.strip_prefix(OK_PREFIX) {
            let path = path.trim().to_string();
            self.set_current_directory(&path);
            let message = format!("Changed directory to {}", path);
            info!("{}", message);
            Ok(OpOutcome::success(message))
        } else {
            warn!("Cannot change directory: {}", response);
            Ok(OpOutcome::failure(response))
        }
    }

    /// Creates a remote directory in the current location.
    pub async fn make_directory(&self, name: &str) -> Result<OpOutcome, FtpError> {
        let result: Result<OpOutcome, FtpError> = async {
            let mut guard = self.reader.lock().await;
            self.send_command(&format!("MKDIR {}", name)).await?;
            let reader = guard.as_mut().ok_or(FtpError::ConnectionClosed)?;
            let response = reader.read_line(self.response_timeout).await?;
            info!("Server: {}", response);
            if response == DIRECTORY_CREATED {
                Ok(OpOutcome::success(response))
            } else {
                Ok(OpOutcome::failure(response))
            }
        }
        .await;
        match result {
            Err(e) if e.is_fatal() => Err(self.handle_fatal(e).await),
            other => other,
        }
    }

    /// Removes a remote file or directory tree. The confirmation dialog
    /// that usually precedes this is the collaborator's business.
    pub async fn delete_remote(&self, name: &str, is_directory: bool) -> Result<OpOutcome, FtpError> {
        match self.delete_inner(name, is_directory).await {
            Err(e) if e.is_fatal() => Err(self.handle_fatal(e).await),
            other => other,
        }
    }

    async fn delete_inner(&self, name: &str, is_directory: bool) -> Result<OpOutcome, FtpError> {
        let command = if is_directory { "RMDIR" } else { "DELETE" };
        info!("Deleting remote item: {} {}", command, name);

        let mut guard = self.reader.lock().await;
        self.send_command(&format!("{} {}", command, name)).await?;
        let reader = guard.as_mut().ok_or(FtpError::ConnectionClosed)?;
        let response = reader.read_line(self.response_timeout).await?;
        info!("Server: {}", response);

        if !is_directory && response == FILE_DELETED {
            // The protocol trails file deletion with a stray END_OF_FILE.
            let trailer = reader.read_line(self.response_timeout).await?;
            if trailer != END_OF_FILE {
                warn!("Expected {} after delete, received: {:?}", END_OF_FILE, trailer);
            }
            return Ok(OpOutcome::success(response));
        }
        if is_directory && response == DIRECTORY_DELETED {
            return Ok(OpOutcome::success(response));
        }
        Ok(OpOutcome::failure(response))
    }
}

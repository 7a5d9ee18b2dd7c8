use log::{error, info, warn};

use crate::constants::{SENDING_FILE, SERVER_DATA_TIMEOUT};
use crate::core_channel::{ChannelReader, ChannelWriter};
use crate::core_sandbox;
use crate::core_transfer;
use crate::error::FtpError;
use crate::session::Session;
use crate::Config;

/// Handles the PUT (single file upload) command.
///
/// The server replies `SENDING_FILE`, expects the client to echo
/// `SENDING_FILE` plus a length line, then receives exactly that many raw
/// bytes into a newly created file and confirms with one line. Parent
/// directories are created as needed.
pub async fn handle_put_command(
    reader: &mut ChannelReader,
    writer: &mut ChannelWriter,
    config: &Config,
    session: &mut Session,
    arg: &str,
) -> Result<(), FtpError> {
    if arg.trim().is_empty() {
        writer.send_line("Missing file name.").await?;
        return Ok(());
    }
    let file_path = match core_sandbox::resolve(&session.base_path, &session.current_dir, arg) {
        Ok(path) => path,
        Err(e) => {
            warn!("PUT rejected for {:?}: {}", arg, e);
            writer.send_line(&e.to_response()).await?;
            return Ok(());
        }
    };

    writer.send_line(SENDING_FILE).await?;

    let confirm = reader.read_line(SERVER_DATA_TIMEOUT).await?;
    if confirm != SENDING_FILE {
        warn!("PUT confirmation mismatch: {:?}", confirm);
        writer
            .send_line("Protocol error: client did not confirm.")
            .await?;
        return Ok(());
    }
    let size_line = reader.read_line(SERVER_DATA_TIMEOUT).await?;
    let declared: u64 = match size_line.trim().parse() {
        Ok(n) => n,
        Err(_) => {
            warn!("PUT with invalid size line: {:?}", size_line);
            writer.send_line("Invalid file size.").await?;
            return Ok(());
        }
    };

    match core_transfer::recv_file(
        reader,
        &file_path,
        declared,
        config.upload_chunk(),
        SERVER_DATA_TIMEOUT,
        None,
    )
    .await
    {
        Ok(received) => {
            info!("Received file {:?} ({} bytes)", file_path, received);
            writer.send_line(crate::constants::FILE_RECEIVED).await?;
        }
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            // recv_file drained the declared bytes, the channel is still
            // aligned on a line boundary.
            error!("Error while storing {:?}: {}", file_path, e);
            writer.send_line("Server error while saving file.").await?;
        }
    }
    Ok(())
}

use log::{error, info, warn};

use crate::constants::{END_OF_FILE, SENDING_FILE};
use crate::core_channel::ChannelWriter;
use crate::core_sandbox;
use crate::core_transfer;
use crate::error::FtpError;
use crate::session::Session;
use crate::Config;

/// Handles the GET (single file download) command.
///
/// On success the frame is: `SENDING_FILE` line, length line, exactly
/// that many raw bytes, then `END_OF_FILE`. A missing file is a single
/// error line with no framing sequence after it.
pub async fn handle_get_command(
    writer: &mut ChannelWriter,
    config: &Config,
    session: &mut Session,
    arg: &str,
) -> Result<(), FtpError> {
    let file_path = match core_sandbox::resolve(&session.base_path, &session.current_dir, arg) {
        Ok(path) => path,
        Err(e) => {
            warn!("GET rejected for {:?}: {}", arg, e);
            writer.send_line(&e.to_response()).await?;
            return Ok(());
        }
    };
    if !file_path.is_file() {
        warn!("GET for missing file: {:?}", file_path);
        writer.send_line("File does not exist.").await?;
        return Ok(());
    }

    writer.send_line(SENDING_FILE).await?;
    match core_transfer::send_file(writer, &file_path, config.download_chunk(), None).await {
        Ok(sent) => {
            writer.send_line(END_OF_FILE).await?;
            info!("Sent file {:?} ({} bytes)", file_path, sent);
            Ok(())
        }
        Err(e) => {
            // The length already went out; the stream cannot be trusted
            // past this point, so the connection goes down with it.
            error!("Error while sending {:?}: {}", file_path, e);
            Err(e)
        }
    }
}

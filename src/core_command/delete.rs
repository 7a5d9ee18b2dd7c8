use log::{error, info, warn};
use tokio::fs;

use crate::constants::{END_OF_FILE, FILE_DELETED};
use crate::core_channel::ChannelWriter;
use crate::core_sandbox;
use crate::error::FtpError;
use crate::session::Session;
use crate::Config;

/// Handles the DELETE (single file removal) command.
///
/// Success answers the confirmation line followed by the protocol's
/// historical `END_OF_FILE` trailer; any failure is a single error line.
pub async fn handle_delete_command(
    writer: &mut ChannelWriter,
    _config: &Config,
    session: &mut Session,
    arg: &str,
) -> Result<(), FtpError> {
    let file_path = match core_sandbox::resolve(&session.base_path, &session.current_dir, arg) {
        Ok(path) => path,
        Err(e) => {
            warn!("DELETE rejected for {:?}: {}", arg, e);
            writer.send_line(&e.to_response()).await?;
            return Ok(());
        }
    };
    if !file_path.is_file() {
        warn!("DELETE for missing file: {:?}", file_path);
        writer.send_line("File does not exist.").await?;
        return Ok(());
    }
    match fs::remove_file(&file_path).await {
        Ok(_) => {
            info!("Deleted file {:?}", file_path);
            writer.send_line(FILE_DELETED).await?;
            writer.send_line(END_OF_FILE).await?;
        }
        Err(e) => {
            error!("Failed to delete {:?}: {}", file_path, e);
            writer.send_line("Error deleting file.").await?;
        }
    }
    Ok(())
}

use log::{error, info, warn};
use tokio::fs;

use crate::core_channel::ChannelWriter;
use crate::core_sandbox;
use crate::error::FtpError;
use crate::session::Session;
use crate::Config;

/// Handles the MKDIR command.
///
/// Creates a directory beneath the session's current virtual directory.
/// The target is resolved through the sandbox first, so an escaping name
/// is answered with a protocol error line and never touches the disk.
pub async fn handle_mkdir_command(
    writer: &mut ChannelWriter,
    _config: &Config,
    session: &mut Session,
    arg: &str,
) -> Result<(), FtpError> {
    if arg.trim().is_empty() {
        writer.send_line("Missing directory name.").await?;
        return Ok(());
    }
    let dir_path = match core_sandbox::resolve(&session.base_path, &session.current_dir, arg) {
        Ok(path) => path,
        Err(e) => {
            warn!("MKDIR rejected for {:?}: {}", arg, e);
            writer.send_line(&e.to_response()).await?;
            return Ok(());
        }
    };

    if dir_path.exists() {
        warn!("Directory already exists: {:?}", dir_path);
        writer.send_line("Directory already exists.").await?;
        return Ok(());
    }

    match fs::create_dir_all(&dir_path).await {
        Ok(_) => {
            info!("Directory created: {:?}", dir_path);
            writer
                .send_line(crate::constants::DIRECTORY_CREATED)
                .await?;
        }
        Err(e) => {
            error!("Failed to create directory {:?}: {}", dir_path, e);
            writer.send_line("Failed to create directory.").await?;
        }
    }
    Ok(())
}

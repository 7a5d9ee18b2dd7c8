use log::{error, info, warn};
use tokio::fs;
use tokio::time::sleep;

use crate::constants::{RMDIR_ATTEMPTS, RMDIR_RETRY_DELAY};
use crate::core_channel::ChannelWriter;
use crate::core_sandbox;
use crate::error::FtpError;
use crate::session::Session;
use crate::Config;

/// Handles the RMDIR (recursive directory removal) command.
///
/// Deleting the shared root itself is always refused, whatever form the
/// argument takes. Removal is retried a bounded number of times before
/// failure is reported, since trees can be briefly held open elsewhere.
pub async fn handle_rmdir_command(
    writer: &mut ChannelWriter,
    _config: &Config,
    session: &mut Session,
    arg: &str,
) -> Result<(), FtpError> {
    let dir_path = match core_sandbox::resolve(&session.base_path, &session.current_dir, arg) {
        Ok(path) => path,
        Err(e) => {
            warn!("RMDIR rejected for {:?}: {}", arg, e);
            writer.send_line(&e.to_response()).await?;
            return Ok(());
        }
    };
    if dir_path == session.base_path {
        warn!("RMDIR aimed at the shared root, refusing");
        writer
            .send_line("Cannot delete the shared root of the server.")
            .await?;
        return Ok(());
    }
    if !dir_path.is_dir() {
        warn!("RMDIR for missing directory: {:?}", dir_path);
        writer.send_line("Directory does not exist.").await?;
        return Ok(());
    }

    let mut deleted = false;
    for attempt in 1..=RMDIR_ATTEMPTS {
        match fs::remove_dir_all(&dir_path).await {
            Ok(_) => {
                deleted = true;
                break;
            }
            Err(e) => {
                warn!(
                    "RMDIR attempt {}/{} failed for {:?}: {}",
                    attempt, RMDIR_ATTEMPTS, dir_path, e
                );
                if attempt < RMDIR_ATTEMPTS {
                    sleep(RMDIR_RETRY_DELAY).await;
                }
            }
        }
    }

    if deleted || !dir_path.exists() {
        info!("Deleted directory {:?}", dir_path);
        writer
            .send_line(crate::constants::DIRECTORY_DELETED)
            .await?;
    } else {
        error!(
            "Could not delete {:?} after {} attempts",
            dir_path, RMDIR_ATTEMPTS
        );
        writer
            .send_line(&format!(
                "Could not delete directory after {} attempts.",
                RMDIR_ATTEMPTS
            ))
            .await?;
    }
    Ok(())
}

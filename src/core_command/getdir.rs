use log::{error, info, warn};

use crate::constants::{END_OF_DIR, SENDING_DIR};
use crate::core_channel::ChannelWriter;
use crate::core_sandbox;
use crate::core_transfer;
use crate::error::FtpError;
use crate::session::Session;
use crate::Config;

/// Handles the GETDIR (directory tree download) command.
///
/// Frame: `SENDING_DIR`, file count line, then per file a relative path
/// line, a length line and the raw bytes, closed by `END_OF_DIR`. File
/// boundaries are implied purely by the declared lengths.
pub async fn handle_getdir_command(
    writer: &mut ChannelWriter,
    config: &Config,
    session: &mut Session,
    arg: &str,
) -> Result<(), FtpError> {
    let dir_path = match core_sandbox::resolve(&session.base_path, &session.current_dir, arg) {
        Ok(path) => path,
        Err(e) => {
            warn!("GETDIR rejected for {:?}: {}", arg, e);
            writer.send_line(&e.to_response()).await?;
            return Ok(());
        }
    };
    if !dir_path.is_dir() {
        warn!("GETDIR for missing directory: {:?}", dir_path);
        writer.send_line("Directory does not exist.").await?;
        return Ok(());
    }

    let files = match core_transfer::collect_files(&dir_path) {
        Ok(files) => files,
        Err(e) => {
            error!("GETDIR enumeration failed for {:?}: {}", dir_path, e);
            writer.send_line("Cannot read directory.").await?;
            return Ok(());
        }
    };

    writer.send_line(SENDING_DIR).await?;
    writer.send_line(&files.len().to_string()).await?;

    let mut sent_total: u64 = 0;
    for (relative, _) in &files {
        writer.send_line(relative).await?;
        match core_transfer::send_file(
            writer,
            &dir_path.join(relative),
            config.download_chunk(),
            None,
        )
        .await
        {
            Ok(sent) => sent_total += sent,
            Err(e) => {
                // Once a count is declared the protocol has no way to
                // retract it; log, stop, and still close the frame.
                error!("Error while sending {:?}: {}", relative, e);
                break;
            }
        }
    }
    writer.send_line(END_OF_DIR).await?;
    info!(
        "Sent directory {:?}: {} files, {} bytes",
        dir_path,
        files.len(),
        sent_total
    );
    Ok(())
}

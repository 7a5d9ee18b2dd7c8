use log::{info, warn};

use crate::constants::OK_PREFIX;
use crate::core_channel::ChannelWriter;
use crate::core_sandbox;
use crate::error::FtpError;
use crate::session::Session;
use crate::Config;

pub async fn handle_cd_command(
    writer: &mut ChannelWriter,
    _config: &Config,
    session: &mut Session,
    arg: &str,
) -> Result<(), FtpError> {
    if arg.trim().is_empty() {
        writer.send_line("Missing directory name.").await?;
        return Ok(());
    }
    match core_sandbox::resolve_dir(&session.base_path, &session.current_dir, arg) {
        Ok((_, new_virtual)) => {
            session.current_dir = new_virtual;
            info!("Directory changed to: {}", session.current_dir);
            writer
                .send_line(&format!("{}{}", OK_PREFIX, session.current_dir))
                .await?;
        }
        Err(e) => {
            warn!("CD rejected for {:?}: {}", arg, e);
            writer.send_line("Cannot access directory.").await?;
        }
    }
    Ok(())
}

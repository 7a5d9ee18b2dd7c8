use log::info;

use crate::constants::OK_PREFIX;
use crate::core_channel::ChannelWriter;
use crate::core_sandbox;
use crate::error::FtpError;
use crate::session::Session;
use crate::Config;

/// Moves to the string-level parent of the current virtual directory.
/// No filesystem re-validation happens; at the root the command is
/// idempotent and answers `OK:/` again.
pub async fn handle_cdup_command(
    writer: &mut ChannelWriter,
    _config: &Config,
    session: &mut Session,
    _arg: &str,
) -> Result<(), FtpError> {
    let parent = core_sandbox::parent_virtual(&session.current_dir);
    info!(
        "Change directory up from {:?} to {:?}",
        session.current_dir, parent
    );
    session.current_dir = parent;
    writer
        .send_line(&format!("{}{}", OK_PREFIX, session.current_dir))
        .await?;
    Ok(())
}

use log::info;

use crate::constants::QUIT_BYE;
use crate::core_channel::ChannelWriter;
use crate::error::FtpError;

pub async fn handle_quit_command(writer: &mut ChannelWriter) -> Result<(), FtpError> {
    info!("Received QUIT command. Closing connection.");
    writer.send_line(QUIT_BYE).await?;
    Ok(())
}

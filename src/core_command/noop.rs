use crate::constants::NOOP_OK;
use crate::core_channel::ChannelWriter;
use crate::error::FtpError;

pub async fn handle_noop_command(writer: &mut ChannelWriter) -> Result<(), FtpError> {
    writer.send_line(NOOP_OK).await?;
    Ok(())
}

use log::warn;

use crate::constants::{END_OF_LIST, FILE_PREFIX, FOLDER_PREFIX, LIST_HEADER};
use crate::core_channel::ChannelWriter;
use crate::error::FtpError;
use crate::session::Session;
use crate::Config;

pub async fn handle_list_command(
    writer: &mut ChannelWriter,
    _config: &Config,
    session: &mut Session,
    _arg: &str,
) -> Result<(), FtpError> {
    let path = session.real_current_dir();
    let mut read_dir = match tokio::fs::read_dir(&path).await {
        Ok(rd) => rd,
        Err(e) => {
            warn!("LIST failed for {:?}: {}", path, e);
            writer.send_line("Cannot read directory.").await?;
            writer.send_line(END_OF_LIST).await?;
            return Ok(());
        }
    };

    let mut folders = Vec::new();
    let mut files = Vec::new();
    loop {
        match read_dir.next_entry().await {
            Ok(Some(entry)) => {
                let name = entry.file_name().to_string_lossy().into_owned();
                match entry.file_type().await {
                    Ok(kind) if kind.is_dir() => folders.push(name),
                    Ok(_) => files.push(name),
                    Err(e) => warn!("skipping unreadable entry {:?}: {}", name, e),
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("LIST aborted for {:?}: {}", path, e);
                writer.send_line("Error while reading directory.").await?;
                writer.send_line(END_OF_LIST).await?;
                return Ok(());
            }
        }
    }
    folders.sort();
    files.sort();

    writer.send_line(LIST_HEADER).await?;
    for folder in folders {
        writer
            .send_line(&format!("{}{}", FOLDER_PREFIX, folder))
            .await?;
    }
    for file in files {
        writer.send_line(&format!("{}{}", FILE_PREFIX, file)).await?;
    }
    writer.send_line(END_OF_LIST).await?;
    Ok(())
}

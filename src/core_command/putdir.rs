use std::time::Instant;

use log::{debug, error, info, warn};
use tokio::fs;

use crate::constants::{READY_FOR_DIR, SENDING_DIR, SERVER_DATA_TIMEOUT};
use crate::core_channel::{ChannelReader, ChannelWriter};
use crate::core_sandbox;
use crate::core_transfer;
use crate::error::FtpError;
use crate::session::Session;
use crate::Config;

/// Handles the PUTDIR (directory tree upload) command.
///
/// The server replies `READY_FOR_DIR`, expects `SENDING_DIR` plus a file
/// count, then receives count triples of relative path line, length line
/// and raw bytes. Individual file failures are skipped, not fatal: the
/// offending payload is drained so the stream stays aligned, and the
/// final confirmation line reports how many files actually landed.
pub async fn handle_putdir_command(
    reader: &mut ChannelReader,
    writer: &mut ChannelWriter,
    config: &Config,
    session: &mut Session,
    arg: &str,
) -> Result<(), FtpError> {
    if arg.trim().is_empty() {
        writer.send_line("Missing directory name.").await?;
        return Ok(());
    }
    let dest = match core_sandbox::resolve(&session.base_path, &session.current_dir, arg) {
        Ok(path) => path,
        Err(e) => {
            warn!("PUTDIR rejected for {:?}: {}", arg, e);
            writer.send_line(&e.to_response()).await?;
            return Ok(());
        }
    };
    if let Err(e) = fs::create_dir_all(&dest).await {
        error!("PUTDIR could not create {:?}: {}", dest, e);
        writer
            .send_line("Server error while creating directory.")
            .await?;
        return Ok(());
    }

    writer.send_line(READY_FOR_DIR).await?;

    let confirm = reader.read_line(SERVER_DATA_TIMEOUT).await?;
    if confirm != SENDING_DIR {
        warn!("PUTDIR confirmation mismatch: {:?}", confirm);
        writer
            .send_line("Protocol error: client did not confirm directory send.")
            .await?;
        return Ok(());
    }
    let count_line = reader.read_line(SERVER_DATA_TIMEOUT).await?;
    let file_count: usize = match count_line.trim().parse() {
        Ok(n) => n,
        Err(_) => {
            warn!("PUTDIR with invalid file count: {:?}", count_line);
            writer.send_line("Invalid file count.").await?;
            return Ok(());
        }
    };

    let started = Instant::now();
    let mut successes: usize = 0;
    let mut received_total: u64 = 0;
    for index in 0..file_count {
        let relative = reader.read_line(SERVER_DATA_TIMEOUT).await?;
        let size_line = reader.read_line(SERVER_DATA_TIMEOUT).await?;
        let declared: u64 = match size_line.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                // Without a length the frame boundary is lost; nothing
                // after this point can be parsed.
                return Err(FtpError::ProtocolViolation(format!(
                    "invalid length line {:?} for entry {:?}",
                    size_line, relative
                )));
            }
        };

        let target = match core_sandbox::safe_join(&dest, &relative) {
            Ok(path) => path,
            Err(e) => {
                warn!("skipping entry escaping destination {:?}: {}", relative, e);
                core_transfer::drain_bytes(
                    reader,
                    declared,
                    config.upload_chunk(),
                    SERVER_DATA_TIMEOUT,
                )
                .await?;
                continue;
            }
        };
        match core_transfer::recv_file(
            reader,
            &target,
            declared,
            config.upload_chunk(),
            SERVER_DATA_TIMEOUT,
            None,
        )
        .await
        {
            Ok(received) => {
                debug!(
                    "Received file {}/{}: {:?} ({} bytes)",
                    index + 1,
                    file_count,
                    relative,
                    received
                );
                successes += 1;
                received_total += received;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("Error while storing {:?}: {}", relative, e);
            }
        }
    }

    let rate = core_transfer::transfer_rate(received_total, started.elapsed());
    writer
        .send_line(&format!(
            "Directory received: {}/{} files ({:.1} KB/s)",
            successes, file_count, rate
        ))
        .await?;
    info!(
        "Received directory {:?}: {}/{} files, {} bytes",
        dest, successes, file_count, received_total
    );
    Ok(())
}

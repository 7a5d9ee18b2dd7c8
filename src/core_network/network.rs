use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info};
use tokio::net::{TcpListener, TcpStream};

use crate::core_channel;
use crate::core_command::{self, Command};
use crate::error::FtpError;
use crate::helpers;
use crate::session::Session;
use crate::Config;

/// A bound listener plus the canonical shared root. Splitting bind from
/// serve lets callers (and tests) learn the ephemeral port before the
/// accept loop starts.
pub struct Server {
    listener: TcpListener,
    config: Arc<Config>,
    shared_root: PathBuf,
}

impl Server {
    pub async fn bind(config: Arc<Config>) -> Result<Server> {
        let shared_root = PathBuf::from(&config.server.shared_root);
        tokio::fs::create_dir_all(&shared_root)
            .await
            .with_context(|| format!("Failed to create shared root: {:?}", shared_root))?;
        let shared_root = shared_root
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize shared root: {:?}", shared_root))?;

        let listener = TcpListener::bind(format!(
            "{}:{}",
            config.server.listen_addr, config.server.listen_port
        ))
        .await
        .with_context(|| {
            format!(
                "Failed to bind {}:{}",
                config.server.listen_addr, config.server.listen_port
            )
        })?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            config,
            shared_root,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop: one task per connection, never blocked by any
    /// individual session's lifetime. Workers share nothing mutable.
    pub async fn serve(self) -> Result<()> {
        loop {
            let (socket, addr) = self.listener.accept().await?;
            info!("New connection from {:?}", addr);

            let config = Arc::clone(&self.config);
            let shared_root = self.shared_root.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(socket, config, shared_root, addr).await {
                    error!("Connection error from {:?}: {}", addr, e);
                }
                info!("Connection closed for {:?}", addr);
            });
        }
    }
}

pub async fn start_server(config: Arc<Config>) -> Result<()> {
    Server::bind(config).await?.serve().await
}

/// Per-connection loop: banner, then read one command line, dispatch,
/// respond, until QUIT, peer close or an unrecoverable channel error.
pub async fn handle_connection(
    socket: TcpStream,
    config: Arc<Config>,
    shared_root: PathBuf,
    peer: SocketAddr,
) -> Result<(), FtpError> {
    let (mut reader, mut writer) = core_channel::split(socket);
    writer.send_line(&helpers::banner_line(&config)).await?;

    let mut session = Session::new(shared_root);

    loop {
        let line = match reader
            .read_line(crate::constants::SERVER_IDLE_TIMEOUT)
            .await
        {
            Ok(line) => line,
            Err(FtpError::ConnectionClosed) => {
                info!("Client {:?} disconnected", peer);
                break;
            }
            Err(FtpError::Timeout(_)) => {
                info!("Client {:?} idle too long, closing", peer);
                break;
            }
            Err(e) => return Err(e),
        };
        info!("Received command from {:?}: {}", peer, line);

        let (command, arg) = core_command::parse_line(&line);
        match command {
            Some(Command::LIST) => {
                core_command::list::handle_list_command(&mut writer, &config, &mut session, &arg)
                    .await?
            }
            Some(Command::CD) => {
                core_command::cd::handle_cd_command(&mut writer, &config, &mut session, &arg)
                    .await?
            }
            Some(Command::CDUP) => {
                core_command::cdup::handle_cdup_command(&mut writer, &config, &mut session, &arg)
                    .await?
            }
            Some(Command::MKDIR) => {
                core_command::mkdir::handle_mkdir_command(&mut writer, &config, &mut session, &arg)
                    .await?
            }
            Some(Command::GET) => {
                core_command::get::handle_get_command(&mut writer, &config, &mut session, &arg)
                    .await?
            }
            Some(Command::GETDIR) => {
                core_command::getdir::handle_getdir_command(
                    &mut writer,
                    &config,
                    &mut session,
                    &arg,
                )
                .await?
            }
            Some(Command::PUT) => {
                core_command::put::handle_put_command(
                    &mut reader,
                    &mut writer,
                    &config,
                    &mut session,
                    &arg,
                )
                .await?
            }
            Some(Command::PUTDIR) => {
                core_command::putdir::handle_putdir_command(
                    &mut reader,
                    &mut writer,
                    &config,
                    &mut session,
                    &arg,
                )
                .await?
            }
            Some(Command::DELETE) => {
                core_command::delete::handle_delete_command(
                    &mut writer,
                    &config,
                    &mut session,
                    &arg,
                )
                .await?
            }
            Some(Command::RMDIR) => {
                core_command::rmdir::handle_rmdir_command(&mut writer, &config, &mut session, &arg)
                    .await?
            }
            Some(Command::NOOP) => core_command::noop::handle_noop_command(&mut writer).await?,
            Some(Command::QUIT) => {
                core_command::quit::handle_quit_command(&mut writer).await?;
                break;
            }
            None => {
                writer.send_line("Invalid command.").await?;
            }
        }
    }
    writer.shutdown().await;
    Ok(())
}

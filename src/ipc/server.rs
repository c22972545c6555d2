//! Unix domain socket server for IPC
//!
//! Accepts connections from the two UI surfaces. Each connection attaches as
//! either the control or graphics surface, after which its inbound frames
//! are forwarded to the coordinator and its outbound queue is drained by a
//! dedicated writer task.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::service::ServiceEvent;
use crate::surface::SurfaceHandle;

use super::protocol::{Notice, Request};

/// Upper bound for a single frame body
const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// IPC server handling surface connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    event_tx: mpsc::Sender<ServiceEvent>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind the server socket and prepare to accept surfaces.
    pub fn new(socket_path: &Path, event_tx: mpsc::Sender<ServiceEvent>) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            event_tx,
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("surface connected");
                    let event_tx = self.event_tx.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, event_tx) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single surface connection.
    async fn handle_client(stream: UnixStream, event_tx: mpsc::Sender<ServiceEvent>) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();

        // A connection is anonymous until its first frame names a role.
        let role = match read_frame(&mut reader).await? {
            Some(Request::Attach { role }) => role,
            Some(other) => {
                warn!(?other, "first message must be attach, disconnecting");
                return Ok(());
            }
            None => return Ok(()),
        };

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let handle = SurfaceHandle::new(outbound_tx);

        // Writer half: drains the surface's outbound queue until every
        // handle is dropped or the peer goes away.
        tokio::spawn(async move {
            while let Some(notice) = outbound_rx.recv().await {
                if let Err(e) = write_frame(&mut writer, &notice).await {
                    debug!(?e, "surface write failed, stopping writer");
                    break;
                }
            }
        });

        handle.send(Notice::Attached { role });
        event_tx
            .send(ServiceEvent::SurfaceAttached {
                role,
                handle: handle.clone(),
            })
            .await
            .context("coordinator channel closed")?;

        let result = Self::pump_requests(&mut reader, role, &event_tx).await;

        debug!(?role, "surface disconnected");
        let _ = event_tx
            .send(ServiceEvent::SurfaceDetached { role, handle })
            .await;
        result
    }

    /// Forward inbound frames to the coordinator until EOF.
    async fn pump_requests(
        reader: &mut OwnedReadHalf,
        role: crate::surface::SurfaceRole,
        event_tx: &mpsc::Sender<ServiceEvent>,
    ) -> Result<()> {
        while let Some(request) = read_frame(reader).await? {
            event_tx
                .send(ServiceEvent::Request { role, request })
                .await
                .context("coordinator channel closed")?;
        }
        Ok(())
    }

    /// Gracefully shutdown the server.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Read one length-prefixed JSON frame. `None` on clean EOF or oversized frame.
async fn read_frame(reader: &mut OwnedReadHalf) -> Result<Option<Request>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        warn!(len, "frame too large, disconnecting");
        return Ok(None);
    }

    let mut msg_buf = vec![0u8; len];
    reader.read_exact(&mut msg_buf).await?;

    let request = serde_json::from_slice(&msg_buf).context("failed to parse request")?;
    debug!(?request, "received request");
    Ok(Some(request))
}

/// Write one length-prefixed JSON frame.
async fn write_frame<T: serde::Serialize>(writer: &mut OwnedWriteHalf, msg: &T) -> Result<()> {
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}

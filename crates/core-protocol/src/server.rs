//! Accept loop for the client-server protocol. Each accepted connection
//! gets a read task and a write task sharing one split socket; the read
//! task posts decoded frames onto the single shared daemon event channel,
//! the write task drains replies the main loop routes through the
//! `ClientRegistry`. Neither task drives its own reactor.

use std::path::PathBuf;

use core_events::{AsyncEventSource, ClientEvent, Event};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixListener;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinHandle;

use crate::framing::{Frame, FrameDecoder};
use crate::registry::ClientRegistry;

pub struct ProtocolServer {
    socket_path: PathBuf,
    registry: ClientRegistry,
}

impl ProtocolServer {
    pub fn new(socket_path: impl Into<PathBuf>, registry: ClientRegistry) -> Self {
        Self { socket_path: socket_path.into(), registry }
    }

    async fn accept_loop(socket_path: PathBuf, registry: ClientRegistry, tx: Sender<Event>) {
        if socket_path.exists() {
            if let Err(err) = std::fs::remove_file(&socket_path) {
                tracing::warn!(target: "protocol", %err, "failed to remove stale socket");
            }
        }
        if let Some(parent) = socket_path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::error!(target: "protocol", %err, "failed to create socket directory");
                return;
            }
        }

        let listener = match UnixListener::bind(&socket_path) {
            Ok(listener) => listener,
            Err(err) => {
                tracing::error!(target: "protocol", %err, path = %socket_path.display(), "failed to bind socket");
                return;
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            if let Err(err) = std::fs::set_permissions(&socket_path, perms) {
                tracing::warn!(target: "protocol", %err, "failed to set socket permissions");
            }
        }

        tracing::info!(target: "protocol", path = %socket_path.display(), "listening");

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let client_id = rand::random::<u64>();
                    core_events::CLIENT_CONNECTS.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    let outbox = registry.register(client_id);
                    let (read_half, write_half) = stream.into_split();
                    tokio::spawn(Self::write_task(client_id, write_half, outbox));
                    if tx.send(Event::Client(ClientEvent::Connected { client_id })).await.is_err() {
                        tracing::warn!(target: "protocol", "event channel closed, stopping accept loop");
                        registry.unregister(client_id);
                        break;
                    }
                    tokio::spawn(Self::read_task(client_id, read_half, registry.clone(), tx.clone()));
                }
                Err(err) => {
                    tracing::warn!(target: "protocol", %err, "accept failed");
                }
            }
        }
    }

    async fn read_task(
        client_id: u64,
        mut read_half: tokio::net::unix::OwnedReadHalf,
        registry: ClientRegistry,
        tx: Sender<Event>,
    ) {
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = match read_half.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) => {
                    tracing::warn!(target: "protocol", %err, client_id, "read error");
                    break;
                }
            };
            let frames = match decoder.feed(&buf[..n]) {
                Ok(frames) => frames,
                Err(err) => {
                    tracing::warn!(target: "protocol", %err, client_id, "framing error, closing connection");
                    break;
                }
            };
            for frame in frames {
                let event = ClientEvent::Frame { client_id, frame_type: frame.frame_type, payload: frame.payload };
                if tx.send(Event::Client(event)).await.is_err() {
                    registry.unregister(client_id);
                    return;
                }
            }
        }
        registry.unregister(client_id);
        core_events::CLIENT_DISCONNECTS.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let _ = tx.send(Event::Client(ClientEvent::Disconnected { client_id })).await;
    }

    async fn write_task(
        client_id: u64,
        mut write_half: tokio::net::unix::OwnedWriteHalf,
        mut outbox: Receiver<Frame>,
    ) {
        while let Some(frame) = outbox.recv().await {
            if let Err(err) = write_half.write_all(&frame.encode()).await {
                tracing::warn!(target: "protocol", %err, client_id, "write error, closing connection");
                break;
            }
        }
    }
}

impl AsyncEventSource for ProtocolServer {
    fn name(&self) -> &'static str {
        "protocol"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        tokio::spawn(Self::accept_loop(self.socket_path, self.registry, tx))
    }
}

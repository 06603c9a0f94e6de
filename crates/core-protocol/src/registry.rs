//! Routes outbound frames from the single-consumer main loop back to the
//! per-connection write half that owns a client's socket. The read side
//! of a connection posts onto the shared event channel like every other
//! producer; the write side cannot, since only the main loop decides what
//! to reply, so this registry is the other direction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::Sender;

use crate::connection::ClientId;
use crate::framing::Frame;

const OUTBOX_CAP: usize = 64;

#[derive(Debug, Default, Clone)]
pub struct ClientRegistry {
    inner: Arc<Mutex<HashMap<ClientId, Sender<Frame>>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, client_id: ClientId) -> tokio::sync::mpsc::Receiver<Frame> {
        let (tx, rx) = tokio::sync::mpsc::channel(OUTBOX_CAP);
        self.inner.lock().expect("registry mutex poisoned").insert(client_id, tx);
        rx
    }

    pub fn unregister(&self, client_id: ClientId) {
        self.inner.lock().expect("registry mutex poisoned").remove(&client_id);
    }

    /// Best-effort delivery: a full or closed outbox drops the frame
    /// rather than blocking the main loop, same discipline as the shared
    /// event channel's own backpressure policy.
    pub fn send(&self, client_id: ClientId, frame: Frame) {
        let sender = self.inner.lock().expect("registry mutex poisoned").get(&client_id).cloned();
        let Some(sender) = sender else {
            return;
        };
        if sender.try_send(frame).is_err() {
            core_events::CHANNEL_SEND_FAILURES.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registered_client_receives_sent_frames() {
        let registry = ClientRegistry::new();
        let mut rx = registry.register(1);
        registry.send(1, Frame::new(0, vec![9]));
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.frame_type, 0);
        assert_eq!(frame.payload, vec![9]);
    }

    #[tokio::test]
    async fn send_to_unknown_client_is_a_silent_no_op() {
        let registry = ClientRegistry::new();
        registry.send(99, Frame::new(0, Vec::new()));
    }

    #[tokio::test]
    async fn unregistered_client_stops_receiving() {
        let registry = ClientRegistry::new();
        let mut rx = registry.register(1);
        registry.unregister(1);
        registry.send(1, Frame::new(0, Vec::new()));
        assert!(rx.recv().await.is_none());
    }
}

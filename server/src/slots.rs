//! Connection slot management for the two player identities.
//!
//! A slot owns the write half of its TCP stream and the handle of the
//! receive task reading from the other half. Slot handles are only ever
//! touched by the orchestrator's own control flow; receive tasks report a
//! dead connection by flipping the shared [`SlotStatus`] flag and exiting,
//! never by mutating the slot itself.

use shared::PlayerId;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::task::JoinHandle;

/// Current timestamp in milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// Connection health shared between a slot and its receive task.
///
/// The receive task marks the status disconnected on EOF or read error and
/// touches the timestamp on every inbound message; the orchestrator polls
/// the flag before each tick and uses the timestamp for latency logging.
#[derive(Debug)]
pub struct SlotStatus {
    connected: AtomicBool,
    last_message_millis: AtomicU64,
}

impl SlotStatus {
    pub fn connected_now() -> Arc<SlotStatus> {
        Arc::new(SlotStatus {
            connected: AtomicBool::new(true),
            last_message_millis: AtomicU64::new(unix_millis()),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Records that a message just arrived on this connection.
    pub fn touch(&self) {
        self.last_message_millis
            .store(unix_millis(), Ordering::SeqCst);
    }

    /// Milliseconds since the last inbound message, for latency estimation.
    pub fn millis_since_last_message(&self) -> u64 {
        unix_millis().saturating_sub(self.last_message_millis.load(Ordering::SeqCst))
    }
}

/// One of the two player connection slots.
pub struct PlayerSlot {
    pub id: PlayerId,
    writer: Option<OwnedWriteHalf>,
    status: Option<Arc<SlotStatus>>,
    receiver: Option<JoinHandle<()>>,
}

impl PlayerSlot {
    /// Creates an empty, disconnected slot for the given identity.
    pub fn empty(id: PlayerId) -> PlayerSlot {
        PlayerSlot {
            id,
            writer: None,
            status: None,
            receiver: None,
        }
    }

    /// Binds a fresh connection to this slot, replacing any previous one
    /// wholesale: the old receive task is aborted and the old write half
    /// dropped (which closes it).
    pub fn bind(
        &mut self,
        writer: OwnedWriteHalf,
        status: Arc<SlotStatus>,
        receiver: JoinHandle<()>,
    ) {
        self.teardown();
        self.writer = Some(writer);
        self.status = Some(status);
        self.receiver = Some(receiver);
    }

    /// Disconnects the slot: aborts the receive task, closes the stream,
    /// and leaves the slot empty.
    pub fn teardown(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            receiver.abort();
        }
        if let Some(status) = self.status.take() {
            status.mark_disconnected();
        }
        self.writer = None;
    }

    pub fn is_connected(&self) -> bool {
        self.status
            .as_ref()
            .map(|status| status.is_connected())
            .unwrap_or(false)
    }

    pub fn status(&self) -> Option<Arc<SlotStatus>> {
        self.status.clone()
    }

    pub fn writer_mut(&mut self) -> Option<&mut OwnedWriteHalf> {
        self.writer.as_mut()
    }
}

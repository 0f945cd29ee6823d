use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use tokio::sync::mpsc;
use tracing::debug;

pub type PeerId = u64;

/// One serialized envelope, shared by every peer it is delivered to.
pub type Frame = Arc<str>;

/// The set of currently connected peers.
///
/// Each peer owns an outbound queue; [`Relay::broadcast`] pushes a frame onto
/// every queue present at the moment of the call. The lock is never held
/// across an await point.
pub struct Relay {
    peers: Mutex<HashMap<PeerId, mpsc::UnboundedSender<Frame>>>,
    next_id: AtomicU64,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl Relay {
    pub fn new() -> Self {
        Self {
            peers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn peers(&self) -> MutexGuard<'_, HashMap<PeerId, mpsc::UnboundedSender<Frame>>> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new peer and hands back the receiving end of its queue.
    pub fn add(&self) -> (PeerId, mpsc::UnboundedReceiver<Frame>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers().insert(id, tx);
        (id, rx)
    }

    pub fn remove(&self, id: PeerId) -> bool {
        self.peers().remove(&id).is_some()
    }

    /// Queues `frame` for every connected peer and returns how many accepted
    /// it. Peers whose receiver is gone are dropped from the set.
    pub fn broadcast(&self, frame: Frame) -> usize {
        let mut peers = self.peers();
        let mut delivered = 0;
        peers.retain(|id, tx| match tx.send(Arc::clone(&frame)) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                debug!(peer = id, "pruning closed peer");
                false
            }
        });
        delivered
    }

    pub fn len(&self) -> usize {
        self.peers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers().is_empty()
    }
}

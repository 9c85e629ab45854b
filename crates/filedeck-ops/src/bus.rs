//! Progress registry and bounded message bus.
//!
//! The registry owns every [`Process`] record keyed by id; each task only
//! writes its own entry. The bus carries full snapshots to the renderer
//! over a bounded channel. Intermediate ticks are dropped once the queue
//! holds `tick_threshold` or more pending messages. Start and terminal
//! announcements wait for room instead, so they are never lost.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use filedeck_core::{Message, Process, ProcessId};
use tokio::sync::mpsc;

/// Create a bus and its single consumer end.
pub fn channel(capacity: usize, tick_threshold: usize) -> (MessageBus, MessageReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        MessageBus {
            tx,
            tick_threshold,
        },
        MessageReceiver { rx },
    )
}

/// Producer side of the bus. Cheap to clone; one clone per task.
#[derive(Debug, Clone)]
pub struct MessageBus {
    tx: mpsc::Sender<Message>,
    tick_threshold: usize,
}

impl MessageBus {
    /// Messages queued but not yet received.
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Whether intermediate ticks are currently being dropped.
    pub fn is_congested(&self) -> bool {
        self.pending() >= self.tick_threshold
    }

    /// Offer an intermediate update. Returns whether it was queued.
    pub fn tick(&self, message: Message) -> bool {
        if self.is_congested() {
            return false;
        }
        self.tx.try_send(message).is_ok()
    }

    /// Queue a message that must not be dropped, waiting for room.
    ///
    /// Only fails when the receiver is gone, in which case nobody is
    /// listening and the message is discarded.
    pub async fn announce(&self, message: Message) {
        if self.tx.send(message).await.is_err() {
            tracing::debug!(target: "filedeck::ops", "message bus closed, announcement discarded");
        }
    }

    /// Queue a must-deliver message from synchronous code.
    ///
    /// Sends immediately when there is room; otherwise a task waits for
    /// room. Requires a running tokio runtime in the latter case.
    pub fn post(&self, message: Message) {
        match self.tx.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(message)) => {
                let bus = self.clone();
                tokio::spawn(async move { bus.announce(message).await });
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(target: "filedeck::ops", "message bus closed, announcement discarded");
            }
        }
    }
}

/// Consumer side of the bus, held by the renderer.
#[derive(Debug)]
pub struct MessageReceiver {
    rx: mpsc::Receiver<Message>,
}

impl MessageReceiver {
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    /// Everything currently queued, in delivery order.
    pub fn drain(&mut self) -> Vec<Message> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// All process records, keyed by id.
#[derive(Debug, Default)]
pub struct Registry {
    processes: DashMap<ProcessId, Process>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id. Ids start at 1 and are never reused.
    pub fn next_id(&self) -> ProcessId {
        ProcessId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn insert(&self, process: Process) {
        self.processes.insert(process.id, process);
    }

    /// Last known snapshot of `id`.
    pub fn record(&self, id: ProcessId) -> Option<Process> {
        self.processes.get(&id).map(|p| p.clone())
    }

    /// Mutate the record for `id` in place and return the new snapshot.
    pub fn update(&self, id: ProcessId, f: impl FnOnce(&mut Process)) -> Option<Process> {
        self.processes.get_mut(&id).map(|mut p| {
            f(p.value_mut());
            p.clone()
        })
    }

    /// All records, ordered by id.
    pub fn snapshot(&self) -> Vec<Process> {
        let mut all: Vec<Process> = self.processes.iter().map(|p| p.value().clone()).collect();
        all.sort_by_key(|p| p.id);
        all
    }

    /// Drop finished records whose `done_time` is older than `older_than`.
    ///
    /// Returns how many were removed.
    pub fn prune_finished(&self, older_than: chrono::Duration) -> usize {
        let cutoff = chrono::Utc::now() - older_than;
        let before = self.processes.len();
        self.processes.retain(|_, p| match p.done_time {
            Some(t) if p.is_finished() => t > cutoff,
            _ => true,
        });
        before - self.processes.len()
    }

    pub fn remove(&self, id: ProcessId) -> Option<Process> {
        self.processes.remove(&id).map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

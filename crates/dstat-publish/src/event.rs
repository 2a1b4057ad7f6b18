use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::scm::SourceControlState;

/// Paths whose decoration must be re-evaluated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecorationsChanged {
    pub root: PathBuf,
    /// Deduplicated, sorted.
    pub paths: Vec<PathBuf>,
}

/// New resource groups for one root.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceControlChanged {
    pub root: PathBuf,
    pub state: Arc<SourceControlState>,
}

/// A broadcast channel receiver for publisher events.
pub type EventStream<E> = broadcast::Receiver<E>;

/// Fan-out sender shared by the publishers.
///
/// Sending with no live receivers is not an error: hosts subscribe lazily
/// and may come and go.
pub(crate) struct Notifier<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> Notifier<E> {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> EventStream<E> {
        self.sender.subscribe()
    }

    pub(crate) fn send(&self, event: E) {
        if self.sender.send(event).is_err() {
            debug!("no subscribers for publisher event");
        }
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` between the job executors that
//! publish and whatever listens (the log listener, tests).

use chrono::{DateTime, Utc};
use scenegen_core::job::{JobRecord, JobStatus};
use scenegen_core::types::JobId;
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// A job's state immediately after one registry mutation.
#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    pub message: String,
    pub output_file: Option<String>,
    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    pub fn from_record(record: &JobRecord) -> Self {
        Self {
            job_id: record.id().clone(),
            status: record.status(),
            message: record.message().to_string(),
            output_file: record.output_artifact().map(str::to_string),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use scenegen_events::EventBus;
///
/// let bus = EventBus::default();
/// let _rx = bus.subscribe();
/// assert_eq!(bus.subscriber_count(), 1);
/// ```
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: JobEvent) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

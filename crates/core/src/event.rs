//! Domain event system — decoupled reporting of refinement progress.
//!
//! Events are published as a run moves through its steps. Hosts can
//! subscribe to render progress or persist a log without the loop
//! depending on them.

use crate::observer::Termination;
use crate::step::StepKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A step collaborator is about to be invoked
    StepStarted {
        run_id: String,
        step: StepKind,
        iteration: u32,
        timestamp: DateTime<Utc>,
    },

    /// A step collaborator returned
    StepCompleted {
        run_id: String,
        step: StepKind,
        iteration: u32,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A run finished (termination is `None` when it aborted)
    RunCompleted {
        run_id: String,
        termination: Option<Termination>,
        iterations: u32,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

//! Built-in loop observers.

use chrono::Utc;
use draftloop_core::event::{DomainEvent, EventBus};
use draftloop_core::observer::{LoopObserver, RunSummary, StepEvent, StepOutcome};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Logs every step through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LoopObserver for TracingObserver {
    fn on_step_start(&self, event: &StepEvent) {
        debug!(
            run_id = %event.run_id,
            step = %event.step,
            iteration = event.iteration,
            "Step started"
        );
    }

    fn on_step_end(&self, event: &StepEvent, outcome: &StepOutcome) {
        if outcome.success {
            info!(
                run_id = %event.run_id,
                step = %event.step,
                iteration = event.iteration,
                duration_ms = outcome.duration_ms,
                output_chars = outcome.output_chars,
                approved = ?outcome.approved,
                "Step finished"
            );
        } else {
            warn!(
                run_id = %event.run_id,
                step = %event.step,
                iteration = event.iteration,
                duration_ms = outcome.duration_ms,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "Step failed"
            );
        }
    }
}

/// Republishes loop callbacks as [`DomainEvent`]s.
pub struct EventBusObserver {
    bus: Arc<EventBus>,
}

impl EventBusObserver {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl LoopObserver for EventBusObserver {
    fn on_step_start(&self, event: &StepEvent) {
        self.bus.publish(DomainEvent::StepStarted {
            run_id: event.run_id.clone(),
            step: event.step,
            iteration: event.iteration,
            timestamp: Utc::now(),
        });
    }

    fn on_step_end(&self, event: &StepEvent, outcome: &StepOutcome) {
        self.bus.publish(DomainEvent::StepCompleted {
            run_id: event.run_id.clone(),
            step: event.step,
            iteration: event.iteration,
            success: outcome.success,
            duration_ms: outcome.duration_ms,
            timestamp: Utc::now(),
        });
    }

    fn on_run_complete(&self, summary: &RunSummary) {
        self.bus.publish(DomainEvent::RunCompleted {
            run_id: summary.run_id.clone(),
            termination: summary.termination,
            iterations: summary.iterations,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::RefinementLoop;
    use crate::test_helpers::*;
    use draftloop_core::observer::Termination;
    use draftloop_core::step::StepKind;

    #[tokio::test]
    async fn event_bus_receives_step_and_run_events() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();

        let controller = RefinementLoop::new(
            Arc::new(ScriptedProducer::returning("A0")),
            Arc::new(ScriptedReviewer::saying(&["APPROVED"])),
            Arc::new(ScriptedRefiner::returning(&[])),
        )
        .with_observer(Arc::new(EventBusObserver::new(bus.clone())))
        .with_observer(Arc::new(TracingObserver));

        controller.run("cats").await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 5);

        assert!(matches!(
            events[0].as_ref(),
            DomainEvent::StepStarted {
                step: StepKind::Producer,
                iteration: 0,
                ..
            }
        ));
        assert!(matches!(
            events[3].as_ref(),
            DomainEvent::StepCompleted {
                step: StepKind::Reviewer,
                success: true,
                ..
            }
        ));
        assert!(matches!(
            events[4].as_ref(),
            DomainEvent::RunCompleted {
                termination: Some(Termination::Approved),
                iterations: 1,
                ..
            }
        ));
    }
}

//! Per-step record of fired event classes
//!
//! Backs precedence constraints: an event requiring class `A` is only
//! dispatched if `A` was published since the last step-begin event.

use crate::types::{Event, EventClass};
use std::collections::HashSet;

/// Result of admitting an event into the current step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Dispatch may proceed
    Admitted,
    /// The required preceding class has not fired this step
    Gated { missing: EventClass },
}

/// Set of event classes seen since the last step-begin event
#[derive(Debug)]
pub struct TimestepTracker {
    step_begin: EventClass,
    fired: HashSet<EventClass>,
}

impl TimestepTracker {
    pub fn new(step_begin: EventClass) -> Self {
        Self {
            step_begin,
            fired: HashSet::new(),
        }
    }

    /// Record `event` and check its precedence requirement
    ///
    /// A step-begin event clears the set first. The class is recorded
    /// whether or not the event is admitted.
    pub fn admit(&mut self, event: &Event) -> Admission {
        if *event.class() == self.step_begin {
            tracing::debug!(
                event = %event.class(),
                cleared = self.fired.len(),
                "Step begin, timestep set cleared"
            );
            self.fired.clear();
        }

        let admission = match event.required_event() {
            Some(required) if !self.fired.contains(required) => Admission::Gated {
                missing: required.clone(),
            },
            _ => Admission::Admitted,
        };

        self.fired.insert(event.class().clone());
        admission
    }

    pub fn has_fired(&self, class: &EventClass) -> bool {
        self.fired.contains(class)
    }

    pub fn step_begin(&self) -> &EventClass {
        &self.step_begin
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }

    pub fn clear(&mut self) {
        self.fired.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> TimestepTracker {
        TimestepTracker::new(EventClass::from_static("model.step"))
    }

    fn event(class: &'static str) -> Event {
        Event::sequential(class, serde_json::json!({}))
    }

    #[test]
    fn test_unconstrained_event_admitted_and_recorded() {
        let mut steps = tracker();
        assert_eq!(steps.admit(&event("agent.perceive")), Admission::Admitted);
        assert!(steps.has_fired(&EventClass::from_static("agent.perceive")));
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_precedence_gating() {
        let mut steps = tracker();
        let decide = event("agent.decide").requires("agent.preprocess");

        assert_eq!(
            steps.admit(&decide),
            Admission::Gated {
                missing: EventClass::from_static("agent.preprocess")
            }
        );
        // Gated events are still recorded
        assert!(steps.has_fired(&EventClass::from_static("agent.decide")));

        steps.admit(&event("agent.preprocess"));
        assert_eq!(steps.admit(&decide), Admission::Admitted);
    }

    #[test]
    fn test_step_begin_resets_requirements() {
        let mut steps = tracker();
        let decide = event("agent.decide").requires("agent.preprocess");

        steps.admit(&event("agent.preprocess"));
        assert_eq!(steps.admit(&decide), Admission::Admitted);

        steps.admit(&event("model.step"));
        assert!(steps.has_fired(&EventClass::from_static("model.step")));
        assert!(!steps.has_fired(&EventClass::from_static("agent.preprocess")));
        assert!(matches!(steps.admit(&decide), Admission::Gated { .. }));
    }

    #[test]
    fn test_step_begin_clears_before_requirement_check() {
        let mut steps = tracker();
        let step = event("model.step").requires("model.finish");
        steps.admit(&event("model.finish"));
        // The step-begin clear happens before the requirement check
        assert!(matches!(steps.admit(&step), Admission::Gated { .. }));
    }

    #[test]
    fn test_clear() {
        let mut steps = tracker();
        steps.admit(&event("agent.perceive"));
        steps.clear();
        assert!(steps.is_empty());
    }
}

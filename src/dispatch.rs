//! Notification disciplines
//!
//! [`Dispatcher`] notifies a resolved subscriber set in two phases
//! (internal, then external) using the event's discipline:
//!
//! - **Sequential**: each subscriber is awaited in turn on the publishing
//!   task, in registration order.
//! - **Synchronous**: one tokio task per subscriber; the publisher waits on a
//!   per-phase [`JoinSet`] until every unit of the phase has finished before
//!   starting the next phase.
//! - **Asynchronous**: one detached tokio task per subscriber for both
//!   phases; the publisher returns as soon as all units are spawned.
//!
//! Every notification is isolated: an `Err` return or a panic is logged and
//! counted, and the remaining notifications go ahead.

use crate::error::EventError;
use crate::subscriber::{Phase, SubscriberRef};
use crate::types::{Dispatch, Event, EventClass};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;

/// What happened to one published event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// All notifications completed; counts are per (subscriber, phase)
    Delivered { notified: usize, failed: usize },
    /// Units were spawned and are still running or done
    Detached { spawned: usize },
    /// No subscriber was registered for the event
    Unobserved,
    /// The required preceding event had not fired this step
    Gated { missing: EventClass },
}

impl Outcome {
    pub fn is_gated(&self) -> bool {
        matches!(self, Outcome::Gated { .. })
    }
}

/// Outcome of one event in a publish chain
#[derive(Debug, Clone)]
pub struct Delivery {
    pub class: EventClass,
    pub event_id: String,
    pub outcome: Outcome,
}

/// Outcomes of a `publish` call: the trigger first, then each consecutive event
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    deliveries: Vec<Delivery>,
}

impl PublishReport {
    pub(crate) fn push(&mut self, event: &Event, outcome: Outcome) {
        self.deliveries.push(Delivery {
            class: event.class().clone(),
            event_id: event.id().to_string(),
            outcome,
        });
    }

    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    /// Outcome of the first event of `class` in the chain
    pub fn outcome_of(&self, class: &EventClass) -> Option<&Outcome> {
        self.deliveries
            .iter()
            .find(|d| d.class == *class)
            .map(|d| &d.outcome)
    }

    /// Outcome of the published event itself
    pub fn trigger(&self) -> Option<&Outcome> {
        self.deliveries.first().map(|d| &d.outcome)
    }

    /// Successful notifications across the chain (detached units excluded)
    pub fn notified(&self) -> usize {
        self.deliveries
            .iter()
            .map(|d| match d.outcome {
                Outcome::Delivered { notified, .. } => notified,
                _ => 0,
            })
            .sum()
    }

    /// Failed notifications across the chain (detached units excluded)
    pub fn failed(&self) -> usize {
        self.deliveries
            .iter()
            .map(|d| match d.outcome {
                Outcome::Delivered { failed, .. } => failed,
                _ => 0,
            })
            .sum()
    }

    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }
}

#[derive(Default)]
struct Tally {
    notified: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, ok: bool) {
        if ok {
            self.notified += 1;
        } else {
            self.failed += 1;
        }
    }

    fn into_outcome(self) -> Outcome {
        Outcome::Delivered {
            notified: self.notified,
            failed: self.failed,
        }
    }
}

/// Executes a notification discipline over a resolved subscriber set
#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher {
    force_sequential: bool,
}

impl Dispatcher {
    pub fn new(force_sequential: bool) -> Self {
        Self { force_sequential }
    }

    /// Discipline used for `event`, after the force-sequential override
    pub fn discipline(&self, event: &Event) -> Dispatch {
        if self.force_sequential {
            Dispatch::Sequential
        } else {
            event.dispatch()
        }
    }

    /// Notify `subscribers` of `event`
    ///
    /// Synchronous and asynchronous disciplines spawn tokio tasks and must be
    /// called from within a tokio runtime.
    pub async fn dispatch(&self, event: &Arc<Event>, subscribers: &[SubscriberRef]) -> Outcome {
        match self.discipline(event) {
            Dispatch::Sequential => sequential(event, subscribers).await,
            Dispatch::Synchronous => synchronous(event, subscribers).await,
            Dispatch::Asynchronous => asynchronous(event, subscribers),
        }
    }
}

fn members(subscribers: &[SubscriberRef], phase: Phase) -> impl Iterator<Item = &SubscriberRef> {
    subscribers
        .iter()
        .filter(move |sub| sub.role().holds(phase))
}

async fn sequential(event: &Arc<Event>, subscribers: &[SubscriberRef]) -> Outcome {
    let mut tally = Tally::default();
    for phase in Phase::ORDER {
        for sub in members(subscribers, phase) {
            tally.record(notify(sub, event, phase).await);
        }
    }
    tally.into_outcome()
}

async fn synchronous(event: &Arc<Event>, subscribers: &[SubscriberRef]) -> Outcome {
    let mut tally = Tally::default();
    for phase in Phase::ORDER {
        let mut units = JoinSet::new();
        for sub in members(subscribers, phase) {
            let sub = Arc::clone(sub);
            let event = Arc::clone(event);
            units.spawn(async move { notify(&sub, &event, phase).await });
        }

        // Barrier: the next phase starts only when this one has drained
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(ok) => tally.record(ok),
                Err(e) => {
                    tracing::warn!(
                        event = %event.class(),
                        event_id = %event.id(),
                        %phase,
                        error = %e,
                        "Notification unit did not complete"
                    );
                    tally.record(false);
                }
            }
        }
    }
    tally.into_outcome()
}

fn asynchronous(event: &Arc<Event>, subscribers: &[SubscriberRef]) -> Outcome {
    let mut spawned = 0;
    for phase in Phase::ORDER {
        for sub in members(subscribers, phase) {
            let sub = Arc::clone(sub);
            let event = Arc::clone(event);
            tokio::spawn(async move {
                notify(&sub, &event, phase).await;
            });
            spawned += 1;
        }
    }
    Outcome::Detached { spawned }
}

/// Run one callback, isolating errors and panics
async fn notify(sub: &SubscriberRef, event: &Event, phase: Phase) -> bool {
    tracing::trace!(
        subscriber = sub.name(),
        event = %event.class(),
        %phase,
        "Notifying subscriber"
    );

    let reason = match AssertUnwindSafe(sub.on_event(event, phase))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => return true,
        Ok(Err(e)) => e.to_string(),
        Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
    };

    let failure = EventError::Subscriber {
        subscriber: sub.name().to_string(),
        class: event.class().to_string(),
        reason,
    };
    tracing::warn!(
        event_id = %event.id(),
        %phase,
        error = %failure,
        "Subscriber failed, continuing with remaining subscribers"
    );
    false
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

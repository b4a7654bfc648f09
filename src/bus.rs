//! Event bus instance
//!
//! `EventBus` owns a class-scoped subscription registry, a lazily created
//! decision-scoped registry layered over it, the timestep set used for
//! precedence checks, and the dispatcher. Thread-safe via internal locks;
//! no lock is held while subscribers run, so callbacks may subscribe,
//! unsubscribe and publish on the same bus.

use crate::config::BusConfig;
use crate::dispatch::{Dispatcher, Outcome, PublishReport};
use crate::registry::{DecisionRegistry, SubscriptionRegistry};
use crate::subscriber::SubscriberRef;
use crate::timestep::{Admission, TimestepTracker};
use crate::types::{BusId, DecisionConfigId, Event, EventClass};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct Subscriptions {
    classes: SubscriptionRegistry,
    decisions: Option<DecisionRegistry>,
}

impl Subscriptions {
    fn decisions_mut(&mut self) -> &mut DecisionRegistry {
        self.decisions.get_or_insert_with(DecisionRegistry::new)
    }
}

/// A single, independently addressable event bus
pub struct EventBus {
    id: BusId,
    config: BusConfig,
    dispatcher: Dispatcher,
    subscriptions: Mutex<Subscriptions>,
    timestep: Mutex<TimestepTracker>,
}

impl EventBus {
    pub fn new(id: impl Into<BusId>, config: BusConfig) -> Self {
        let id = id.into();
        tracing::debug!(
            bus = %id,
            force_sequential = config.force_sequential,
            step_begin = %config.step_begin,
            "Event bus created"
        );
        Self {
            id,
            dispatcher: Dispatcher::new(config.force_sequential),
            timestep: Mutex::new(TimestepTracker::new(config.step_begin.clone())),
            subscriptions: Mutex::new(Subscriptions::default()),
            config,
        }
    }

    pub fn id(&self) -> &BusId {
        &self.id
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Subscribe permanently to `class`; returns false if already subscribed
    pub async fn subscribe(&self, subscriber: SubscriberRef, class: impl Into<EventClass>) -> bool {
        let class = class.into();
        tracing::debug!(bus = %self.id, subscriber = subscriber.name(), event = %class, "Subscribed");
        self.subscriptions
            .lock()
            .await
            .classes
            .subscribe(subscriber, class)
    }

    /// Subscribe to the next publish of `class` only
    pub async fn subscribe_once(
        &self,
        subscriber: SubscriberRef,
        class: impl Into<EventClass>,
    ) -> bool {
        let class = class.into();
        tracing::debug!(bus = %self.id, subscriber = subscriber.name(), event = %class, "Subscribed once");
        self.subscriptions
            .lock()
            .await
            .classes
            .subscribe_once(subscriber, class)
    }

    /// Subscribe permanently to `class` events scoped to `decision`
    pub async fn subscribe_scoped(
        &self,
        subscriber: SubscriberRef,
        class: impl Into<EventClass>,
        decision: impl Into<DecisionConfigId>,
    ) -> bool {
        let (class, decision) = (class.into(), decision.into());
        tracing::debug!(
            bus = %self.id,
            subscriber = subscriber.name(),
            event = %class,
            %decision,
            "Subscribed to decision scope"
        );
        self.subscriptions
            .lock()
            .await
            .decisions_mut()
            .subscribe(subscriber, class, decision)
    }

    /// Subscribe to the next `class` event scoped to `decision` only
    pub async fn subscribe_once_scoped(
        &self,
        subscriber: SubscriberRef,
        class: impl Into<EventClass>,
        decision: impl Into<DecisionConfigId>,
    ) -> bool {
        let (class, decision) = (class.into(), decision.into());
        tracing::debug!(
            bus = %self.id,
            subscriber = subscriber.name(),
            event = %class,
            %decision,
            "Subscribed once to decision scope"
        );
        self.subscriptions
            .lock()
            .await
            .decisions_mut()
            .subscribe_once(subscriber, class, decision)
    }

    /// Remove `subscriber`'s class-scoped subscription to `class`
    pub async fn unsubscribe(&self, subscriber: &SubscriberRef, class: &EventClass) -> bool {
        self.subscriptions
            .lock()
            .await
            .classes
            .unsubscribe(subscriber, class)
    }

    /// Drop every subscriber of `class`, scoped or not
    pub async fn unsubscribe_class(&self, class: &EventClass) -> usize {
        let mut subs = self.subscriptions.lock().await;
        let mut removed = subs.classes.unsubscribe_class(class);
        if let Some(decisions) = subs.decisions.as_mut() {
            removed += decisions.unsubscribe_class_all(class);
        }
        tracing::debug!(bus = %self.id, event = %class, removed, "Event class cleared");
        removed
    }

    /// Drop `subscriber` from every class and decision scope
    ///
    /// Scans every registration on the bus.
    pub async fn unsubscribe_all(&self, subscriber: &SubscriberRef) -> usize {
        let mut subs = self.subscriptions.lock().await;
        let mut removed = subs.classes.unsubscribe_all(subscriber);
        if let Some(decisions) = subs.decisions.as_mut() {
            removed += decisions.unsubscribe_all(subscriber);
        }
        tracing::debug!(bus = %self.id, subscriber = subscriber.name(), removed, "Subscriber removed");
        removed
    }

    pub async fn unsubscribe_scoped(
        &self,
        subscriber: &SubscriberRef,
        class: &EventClass,
        decision: &DecisionConfigId,
    ) -> bool {
        let mut subs = self.subscriptions.lock().await;
        subs.decisions
            .as_mut()
            .is_some_and(|d| d.unsubscribe(subscriber, class, decision))
    }

    pub async fn unsubscribe_scoped_class(
        &self,
        class: &EventClass,
        decision: &DecisionConfigId,
    ) -> usize {
        let mut subs = self.subscriptions.lock().await;
        subs.decisions
            .as_mut()
            .map_or(0, |d| d.unsubscribe_class(class, decision))
    }

    /// Drop `subscriber` from every class scoped to `decision`
    pub async fn unsubscribe_decision(
        &self,
        subscriber: &SubscriberRef,
        decision: &DecisionConfigId,
    ) -> usize {
        let mut subs = self.subscriptions.lock().await;
        subs.decisions
            .as_mut()
            .map_or(0, |d| d.unsubscribe_decision(subscriber, decision))
    }

    /// Publish an event and any consecutive events it declares
    ///
    /// Returns once the chain has been dispatched according to each event's
    /// discipline. Subscriber failures are logged and reported, never returned.
    pub async fn publish(&self, event: Event) -> PublishReport {
        let mut report = PublishReport::default();
        let mut pending = Some(event);

        while let Some(event) = pending.take() {
            let event = Arc::new(event);
            let outcome = self.publish_one(&event).await;
            if !outcome.is_gated() {
                pending = event.consecutive_event().cloned();
            }
            report.push(&event, outcome);
        }

        report
    }

    async fn publish_one(&self, event: &Arc<Event>) -> Outcome {
        tracing::debug!(
            bus = %self.id,
            event = %event.class(),
            event_id = %event.id(),
            dispatch = %self.dispatcher.discipline(event),
            "Publishing event"
        );

        let admission = self.timestep.lock().await.admit(event);
        if let Admission::Gated { missing } = admission {
            tracing::warn!(
                bus = %self.id,
                event = %event.class(),
                required = %missing,
                "Required preceding event has not fired this step, dispatch skipped"
            );
            return Outcome::Gated { missing };
        }

        let subscribers = self.resolve(event).await;
        if subscribers.is_empty() {
            if self.config.warn_unobserved {
                tracing::warn!(bus = %self.id, event = %event.class(), "No subscribers for event");
            } else {
                tracing::debug!(bus = %self.id, event = %event.class(), "No subscribers for event");
            }
            return Outcome::Unobserved;
        }

        self.dispatcher.dispatch(event, &subscribers).await
    }

    async fn resolve(&self, event: &Event) -> Vec<SubscriberRef> {
        let mut subs = self.subscriptions.lock().await;
        let Subscriptions { classes, decisions } = &mut *subs;
        match (event.decision(), decisions.as_mut()) {
            (Some(decision), Some(scoped)) => scoped.resolve(event.class(), decision, classes),
            _ => classes.resolve(event.class()),
        }
    }

    /// Clear all subscriptions and the timestep set
    pub async fn reset(&self) {
        *self.subscriptions.lock().await = Subscriptions::default();
        self.timestep.lock().await.clear();
        tracing::debug!(bus = %self.id, "Event bus reset");
    }

    pub async fn subscriber_count(&self, class: &EventClass) -> usize {
        self.subscriptions
            .lock()
            .await
            .classes
            .subscriber_count(class)
    }

    pub async fn scoped_subscriber_count(
        &self,
        class: &EventClass,
        decision: &DecisionConfigId,
    ) -> usize {
        self.subscriptions
            .lock()
            .await
            .decisions
            .as_ref()
            .map_or(0, |d| d.subscriber_count(class, decision))
    }

    /// Whether `class` has been published since the last step-begin event
    pub async fn fired_this_step(&self, class: &EventClass) -> bool {
        self.timestep.lock().await.has_fired(class)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusId::default(), BusConfig::default())
    }
}

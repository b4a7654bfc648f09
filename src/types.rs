//! Core event types for the agentsim-event system
//!
//! An [`Event`] is an immutable envelope whose capability tags decide how
//! the bus treats it: the dispatch discipline, an optional precedence
//! requirement, an optional consecutive event and an optional
//! decision-configuration scope. All types use camelCase JSON serialization.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// Name of an event class (e.g. `agent.decide`, `model.step`)
///
/// Subscriptions, precedence checks and the timestep set are all keyed by
/// class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventClass(Cow<'static, str>);

impl EventClass {
    /// Class name known at compile time
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Class name built at runtime
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EventClass {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for EventClass {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Identity of a decision configuration
///
/// Opaque to the bus; used only as a routing key by the decision-scoped
/// registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionConfigId(String);

impl DecisionConfigId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DecisionConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DecisionConfigId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a bus instance within a [`BusRegistry`](crate::BusRegistry)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(String);

impl BusId {
    /// Id of the canonical default bus
    pub const DEFAULT: &'static str = "default";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BusId {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BusId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Notification discipline of an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dispatch {
    /// Serial notification on the publishing task
    #[default]
    Sequential,
    /// One concurrent unit per subscriber, publisher waits for each phase
    Synchronous,
    /// One concurrent unit per subscriber, publisher does not wait
    Asynchronous,
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dispatch::Sequential => "sequential",
            Dispatch::Synchronous => "synchronous",
            Dispatch::Asynchronous => "asynchronous",
        };
        f.write_str(name)
    }
}

/// A single event published on a bus
///
/// The dispatch discipline is chosen at construction and cannot be changed
/// afterwards. The remaining tags are attached with the `with_*` builders
/// before the event is handed to the bus, which freezes it behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    id: String,
    class: EventClass,
    dispatch: Dispatch,

    /// Class that must already have fired in the current step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    requires: Option<EventClass>,

    /// Follow-up published once this event's notification completes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    consecutive: Option<Box<Event>>,

    /// Decision configuration used as a routing key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    decision: Option<DecisionConfigId>,

    payload: serde_json::Value,

    #[serde(default)]
    source: String,

    emitted_at: DateTime<Utc>,

    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl Event {
    /// Create an event with auto-generated id and timestamp
    pub fn new(class: impl Into<EventClass>, dispatch: Dispatch, payload: serde_json::Value) -> Self {
        Self {
            id: format!("evt-{}", uuid::Uuid::new_v4()),
            class: class.into(),
            dispatch,
            requires: None,
            consecutive: None,
            decision: None,
            payload,
            source: String::new(),
            emitted_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn sequential(class: impl Into<EventClass>, payload: serde_json::Value) -> Self {
        Self::new(class, Dispatch::Sequential, payload)
    }

    pub fn synchronous(class: impl Into<EventClass>, payload: serde_json::Value) -> Self {
        Self::new(class, Dispatch::Synchronous, payload)
    }

    pub fn asynchronous(class: impl Into<EventClass>, payload: serde_json::Value) -> Self {
        Self::new(class, Dispatch::Asynchronous, payload)
    }

    /// Require `class` to have fired earlier in the same step
    pub fn requires(mut self, class: impl Into<EventClass>) -> Self {
        self.requires = Some(class.into());
        self
    }

    /// Publish `next` automatically after this event
    pub fn then(mut self, next: Event) -> Self {
        self.consecutive = Some(Box::new(next));
        self
    }

    /// Scope this event to a decision configuration
    pub fn scoped_to(mut self, decision: impl Into<DecisionConfigId>) -> Self {
        self.decision = Some(decision.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn class(&self) -> &EventClass {
        &self.class
    }

    pub fn dispatch(&self) -> Dispatch {
        self.dispatch
    }

    pub fn required_event(&self) -> Option<&EventClass> {
        self.requires.as_ref()
    }

    pub fn consecutive_event(&self) -> Option<&Event> {
        self.consecutive.as_deref()
    }

    pub fn decision(&self) -> Option<&DecisionConfigId> {
        self.decision.as_ref()
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Decode the payload into a typed value
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn emitted_at(&self) -> DateTime<Utc> {
        self.emitted_at
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = Event::synchronous("agent.perceive", serde_json::json!({"agent": "a-1"}))
            .with_source("agent-a-1");

        assert!(event.id().starts_with("evt-"));
        assert_eq!(event.class().as_str(), "agent.perceive");
        assert_eq!(event.dispatch(), Dispatch::Synchronous);
        assert_eq!(event.source(), "agent-a-1");
        assert!(event.required_event().is_none());
        assert!(event.consecutive_event().is_none());
        assert!(event.decision().is_none());
        assert!(event.metadata().is_empty());
    }

    #[test]
    fn test_event_capability_tags() {
        let event = Event::sequential("agent.execute", serde_json::json!({}))
            .requires("agent.postprocess")
            .then(Event::asynchronous("agent.post_execute", serde_json::json!({})))
            .scoped_to("greedy");

        assert_eq!(event.required_event().unwrap().as_str(), "agent.postprocess");
        let next = event.consecutive_event().unwrap();
        assert_eq!(next.class().as_str(), "agent.post_execute");
        assert_eq!(next.dispatch(), Dispatch::Asynchronous);
        assert_eq!(event.decision().unwrap().as_str(), "greedy");
        // Builders never touch the discipline
        assert_eq!(event.dispatch(), Dispatch::Sequential);
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = Event::sequential("model.step", serde_json::json!({}));
        let b = Event::sequential("model.step", serde_json::json!({}));
        assert_ne!(a.id(), b.id());
        assert_eq!(a.class(), b.class());
    }

    #[test]
    fn test_payload_as() {
        #[derive(Deserialize)]
        struct Step {
            step: u64,
        }

        let event = Event::sequential("model.step", serde_json::json!({"step": 7}));
        let step: Step = event.payload_as().unwrap();
        assert_eq!(step.step, 7);

        let bad = Event::sequential("model.step", serde_json::json!("seven"));
        assert!(bad.payload_as::<Step>().is_err());
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = Event::synchronous("agent.decide", serde_json::json!({"agent": "a-1"}))
            .requires("agent.preprocess")
            .scoped_to("satisficing")
            .with_metadata("run", "7");

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"class\":\"agent.decide\""));
        assert!(json.contains("\"dispatch\":\"synchronous\""));
        assert!(json.contains("\"requires\":\"agent.preprocess\""));
        assert!(json.contains("\"decision\":\"satisficing\""));
        assert!(json.contains("\"emittedAt\""));
        assert!(!json.contains("consecutive"));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id(), event.id());
        assert_eq!(parsed.metadata()["run"], "7");
    }

    #[test]
    fn test_event_class_equality_ignores_storage() {
        let owned = EventClass::new(String::from("model.step"));
        let borrowed = EventClass::from_static("model.step");
        assert_eq!(owned, borrowed);
        assert_eq!(borrowed.to_string(), "model.step");
    }

    #[test]
    fn test_dispatch_default_is_sequential() {
        assert_eq!(Dispatch::default(), Dispatch::Sequential);
        assert_eq!(Dispatch::Asynchronous.to_string(), "asynchronous");
    }
}

//! Subscriber trait and notification roles
//!
//! Subscribers are shared as [`SubscriberRef`] (`Arc<dyn Subscriber>`) and
//! compared by identity: registering the same `Arc` twice is a no-op, while
//! two distinct instances with equal state are two subscribers.

use crate::error::Result;
use crate::types::Event;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Notification phase of a dispatch
///
/// Every discipline notifies the internal phase before the external phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Internal,
    External,
}

impl Phase {
    /// Phases in notification order
    pub const ORDER: [Phase; 2] = [Phase::Internal, Phase::External];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Internal => f.write_str("internal"),
            Phase::External => f.write_str("external"),
        }
    }
}

/// Which phases a subscriber takes part in
///
/// Framework-core listeners (memory, preprocessing stages, the model clock)
/// are `Internal`; ordinary listeners are `External`. A subscriber holding
/// `Both` is notified once in each phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Role {
    Internal,
    #[default]
    External,
    Both,
}

impl Role {
    /// Whether this role is notified in `phase`
    pub fn holds(self, phase: Phase) -> bool {
        matches!(
            (self, phase),
            (Role::Both, _) | (Role::Internal, Phase::Internal) | (Role::External, Phase::External)
        )
    }
}

/// Event subscriber
///
/// Callbacks may run on the publishing task (sequential events) or on a
/// spawned tokio task (synchronous and asynchronous events). A callback that
/// returns an error or panics is logged and counted; it never prevents the
/// remaining subscribers from being notified.
#[async_trait]
pub trait Subscriber: Send + Sync + 'static {
    /// Handle one event in one phase
    async fn on_event(&self, event: &Event, phase: Phase) -> Result<()>;

    /// Notification role (default: external)
    fn role(&self) -> Role {
        Role::External
    }

    /// Name used in logs and failure reports
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared subscriber handle
pub type SubscriberRef = Arc<dyn Subscriber>;

/// Identity comparison for subscriber handles
///
/// Compares the data pointer only, so two handles to the same allocation are
/// equal even if they were coerced through different vtables.
pub fn same_subscriber(a: &SubscriberRef, b: &SubscriberRef) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

type Callback = dyn Fn(&Event, Phase) -> Result<()> + Send + Sync;

/// Subscriber backed by a closure
///
/// ```rust
/// use agentsim_event::{FnSubscriber, Role, Subscriber};
///
/// let sub = FnSubscriber::arc("clock", Role::Internal, |event, _phase| {
///     println!("tick: {}", event.class());
///     Ok(())
/// });
/// assert_eq!(sub.name(), "clock");
/// ```
pub struct FnSubscriber {
    name: String,
    role: Role,
    callback: Box<Callback>,
}

impl FnSubscriber {
    pub fn new<F>(name: impl Into<String>, role: Role, callback: F) -> Self
    where
        F: Fn(&Event, Phase) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            role,
            callback: Box::new(callback),
        }
    }

    /// Build the subscriber already wrapped for registration
    pub fn arc<F>(name: impl Into<String>, role: Role, callback: F) -> SubscriberRef
    where
        F: Fn(&Event, Phase) -> Result<()> + Send + Sync + 'static,
    {
        Arc::new(Self::new(name, role, callback))
    }
}

#[async_trait]
impl Subscriber for FnSubscriber {
    async fn on_event(&self, event: &Event, phase: Phase) -> Result<()> {
        (self.callback)(event, phase)
    }

    fn role(&self) -> Role {
        self.role
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Subscriber that writes every event it receives to `tracing`
///
/// Attach it (usually as `External`) to see the event flow of a simulation.
pub struct LogSubscriber {
    role: Role,
}

impl LogSubscriber {
    pub fn new(role: Role) -> Self {
        Self { role }
    }
}

impl Default for LogSubscriber {
    fn default() -> Self {
        Self::new(Role::External)
    }
}

#[async_trait]
impl Subscriber for LogSubscriber {
    async fn on_event(&self, event: &Event, phase: Phase) -> Result<()> {
        tracing::info!(
            event = %event.class(),
            event_id = %event.id(),
            dispatch = %event.dispatch(),
            decision = ?event.decision().map(|d| d.as_str()),
            %phase,
            payload = %event.payload(),
            "Event received"
        );
        Ok(())
    }

    fn role(&self) -> Role {
        self.role
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_role_holds() {
        assert!(Role::Internal.holds(Phase::Internal));
        assert!(!Role::Internal.holds(Phase::External));
        assert!(Role::External.holds(Phase::External));
        assert!(!Role::External.holds(Phase::Internal));
        assert!(Role::Both.holds(Phase::Internal));
        assert!(Role::Both.holds(Phase::External));
        assert_eq!(Role::default(), Role::External);
    }

    #[test]
    fn test_same_subscriber_is_identity() {
        let a = FnSubscriber::arc("a", Role::External, |_, _| Ok(()));
        let a2 = Arc::clone(&a);
        let b = FnSubscriber::arc("a", Role::External, |_, _| Ok(()));

        assert!(same_subscriber(&a, &a2));
        assert!(!same_subscriber(&a, &b));
    }

    #[tokio::test]
    async fn test_fn_subscriber_forwards_phase() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let sub = FnSubscriber::arc("recorder", Role::Both, move |event, phase| {
            log.lock().unwrap().push((event.class().to_string(), phase));
            Ok(())
        });

        let event = Event::sequential("model.step", serde_json::json!({}));
        sub.on_event(&event, Phase::Internal).await.unwrap();
        sub.on_event(&event, Phase::External).await.unwrap();

        assert_eq!(sub.role(), Role::Both);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("model.step".to_string(), Phase::Internal),
                ("model.step".to_string(), Phase::External),
            ]
        );
    }

    #[tokio::test]
    async fn test_log_subscriber_accepts_everything() {
        let sub = LogSubscriber::default();
        let event = Event::asynchronous("agent.post_execute", serde_json::json!({"agent": "a-1"}))
            .scoped_to("greedy");
        assert!(sub.on_event(&event, Phase::External).await.is_ok());
        assert_eq!(sub.name(), "log");
    }
}

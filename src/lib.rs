//! # agentsim-event
//!
//! Typed in-process event dispatch core for boundedly-rational agent
//! simulations.
//!
//! ## Overview
//!
//! Agents, memories, preprocessing stages and the model clock never call each
//! other directly: they publish and subscribe to events on an [`EventBus`].
//! Each event declares how it is delivered and how it relates to other
//! events in the same simulation step.
//!
//! ## Quick Start
//!
//! ```rust
//! use agentsim_event::{catalog, BusRegistry, FnSubscriber, Role};
//!
//! # async fn example() {
//! let buses = BusRegistry::default();
//! let bus = buses.default_bus().await;
//!
//! let clock = FnSubscriber::arc("clock", Role::Internal, |event, _phase| {
//!     println!("step: {}", event.payload());
//!     Ok(())
//! });
//! bus.subscribe(clock, catalog::model::STEP).await;
//!
//! let report = bus.publish(catalog::model::step(1)).await;
//! assert_eq!(report.notified(), 1);
//! # }
//! ```
//!
//! ## Dispatch disciplines
//!
//! - **Sequential** — subscribers run one after another on the publishing task
//! - **Synchronous** — one tokio task per subscriber, `publish` waits for the
//!   internal phase to drain before starting the external phase, and for
//!   the external phase before returning
//! - **Asynchronous** — one tokio task per subscriber, `publish` returns once
//!   all tasks are spawned
//!
//! Internal subscribers are always notified before external ones. A bus
//! configured with `force_sequential` treats every event as sequential.
//!
//! ## Capability tags
//!
//! - `requires` — the event is dispatched only if the named class already
//!   fired in the current step (steps start with the step-begin class,
//!   `model.step` by default)
//! - `then` — a consecutive event published right after this one
//! - `scoped_to` — route through the decision-scoped registry as well as
//!   the class-scoped one
//!
//! ## Architecture
//!
//! - **EventBus** — subscribe / unsubscribe / publish surface of one bus
//! - **BusRegistry** — lazily created bus instances addressed by [`BusId`]
//! - **SubscriptionRegistry / DecisionRegistry** — class and decision scoped subscriptions
//! - **Dispatcher** — the three notification disciplines
//! - **TimestepTracker** — classes fired in the current step

pub mod bus;
pub mod buses;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod subscriber;
pub mod timestep;
pub mod types;

// Re-export core types
pub use bus::EventBus;
pub use buses::BusRegistry;
pub use config::BusConfig;
pub use dispatch::{Delivery, Dispatcher, Outcome, PublishReport};
pub use error::{EventError, Result};
pub use registry::{DecisionRegistry, SubscriptionRegistry};
pub use subscriber::{
    same_subscriber, FnSubscriber, LogSubscriber, Phase, Role, Subscriber, SubscriberRef,
};
pub use timestep::{Admission, TimestepTracker};
pub use types::{BusId, DecisionConfigId, Dispatch, Event, EventClass};

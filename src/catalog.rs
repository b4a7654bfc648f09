//! Framework event classes
//!
//! Event classes published by the model driver, the agent pipeline and the
//! preprocessor, with constructors that attach the capability tags each one
//! carries. Collaborators define their own classes with [`EventClass`] and
//! [`Event`] directly.

use crate::types::{DecisionConfigId, Event, EventClass};
use serde::{Deserialize, Serialize};

/// Payload of agent lifecycle events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPayload {
    pub agent: String,
}

/// Payload of step events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPayload {
    pub step: u64,
}

/// Payload of preprocessor events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagePayload {
    pub agent: String,
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_options: Option<usize>,
}

fn json<T: Serialize>(payload: &T) -> serde_json::Value {
    // Plain structs of strings and integers always serialize
    serde_json::to_value(payload).unwrap_or_default()
}

/// Model lifecycle
pub mod model {
    use super::*;

    pub const INSTANTIATED: EventClass = EventClass::from_static("model.instantiated");
    pub const INITIALIZED: EventClass = EventClass::from_static("model.initialized");
    /// Step-begin marker, clears the timestep set by default
    pub const STEP: EventClass = EventClass::from_static("model.step");
    pub const STEP_FINISHED: EventClass = EventClass::from_static("model.step_finished");
    pub const FINISH: EventClass = EventClass::from_static("model.finish");

    const SOURCE: &str = "model";

    pub fn instantiated() -> Event {
        Event::sequential(INSTANTIATED, serde_json::json!({})).with_source(SOURCE)
    }

    pub fn initialized() -> Event {
        Event::sequential(INITIALIZED, serde_json::json!({}))
            .requires(INSTANTIATED)
            .with_source(SOURCE)
    }

    pub fn step(step: u64) -> Event {
        Event::sequential(STEP, json(&StepPayload { step })).with_source(SOURCE)
    }

    pub fn step_finished(step: u64) -> Event {
        Event::sequential(STEP_FINISHED, json(&StepPayload { step }))
            .requires(STEP)
            .with_source(SOURCE)
    }

    pub fn finish() -> Event {
        Event::sequential(FINISH, serde_json::json!({})).with_source(SOURCE)
    }
}

/// Agent lifecycle: perceive → preprocess → decide → postprocess → execute → post-execute
pub mod agent {
    use super::*;

    pub const PERCEIVE: EventClass = EventClass::from_static("agent.perceive");
    pub const PREPROCESS: EventClass = EventClass::from_static("agent.preprocess");
    pub const DECIDE: EventClass = EventClass::from_static("agent.decide");
    pub const POSTPROCESS: EventClass = EventClass::from_static("agent.postprocess");
    pub const EXECUTE: EventClass = EventClass::from_static("agent.execute");
    pub const POST_EXECUTE: EventClass = EventClass::from_static("agent.post_execute");

    fn lifecycle(class: EventClass, agent: &str) -> Event {
        let payload = json(&AgentPayload {
            agent: agent.to_string(),
        });
        Event::synchronous(class, payload).with_source(format!("agent:{agent}"))
    }

    pub fn perceive(agent: &str) -> Event {
        lifecycle(PERCEIVE, agent)
    }

    pub fn preprocess(agent: &str) -> Event {
        lifecycle(PREPROCESS, agent).requires(PERCEIVE)
    }

    /// Routed to the subscribers of `decision` as well as class-wide ones
    pub fn decide(agent: &str, decision: impl Into<DecisionConfigId>) -> Event {
        lifecycle(DECIDE, agent)
            .requires(PREPROCESS)
            .scoped_to(decision)
    }

    pub fn postprocess(agent: &str) -> Event {
        lifecycle(POSTPROCESS, agent).requires(DECIDE)
    }

    /// Chains [`post_execute`] once execution listeners have run
    pub fn execute(agent: &str) -> Event {
        lifecycle(EXECUTE, agent)
            .requires(POSTPROCESS)
            .then(post_execute(agent))
    }

    pub fn post_execute(agent: &str) -> Event {
        let payload = json(&AgentPayload {
            agent: agent.to_string(),
        });
        Event::asynchronous(POST_EXECUTE, payload)
            .requires(EXECUTE)
            .with_source(format!("agent:{agent}"))
    }
}

/// Preprocessor-internal events
pub mod preprocess {
    use super::*;

    pub const STAGE_COMPLETED: EventClass = EventClass::from_static("preprocess.stage_completed");
    pub const OPTIONS_FILTERED: EventClass = EventClass::from_static("preprocess.options_filtered");

    pub fn stage_completed(
        agent: &str,
        stage: &str,
        decision: impl Into<DecisionConfigId>,
    ) -> Event {
        let payload = json(&StagePayload {
            agent: agent.to_string(),
            stage: stage.to_string(),
            remaining_options: None,
        });
        Event::sequential(STAGE_COMPLETED, payload)
            .scoped_to(decision)
            .with_source(format!("agent:{agent}"))
    }

    pub fn options_filtered(
        agent: &str,
        stage: &str,
        remaining: usize,
        decision: impl Into<DecisionConfigId>,
    ) -> Event {
        let payload = json(&StagePayload {
            agent: agent.to_string(),
            stage: stage.to_string(),
            remaining_options: Some(remaining),
        });
        Event::sequential(OPTIONS_FILTERED, payload)
            .requires(STAGE_COMPLETED)
            .scoped_to(decision)
            .with_source(format!("agent:{agent}"))
    }
}

//! The publish workflow.
//!
//! - [`state`] - Workflow states, user/system actions and the transition table
//! - [`session`] - Session context threaded through every transition
//! - [`orchestrator`] - Owns the live session and runs transition effects

pub mod orchestrator;
pub mod session;
pub mod state;

pub use orchestrator::Orchestrator;
pub use session::{Effect, Flow, Session, SessionId, SessionSnapshot, Transition};
pub use state::{Action, Destination, Step, WorkflowState, next_step};

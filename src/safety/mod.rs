//! Content safety gating
//!
//! Input moderation before a message reaches a provider, and output filtering
//! before a generated reply reaches the caller.

pub mod filter;
pub mod moderation;

pub use filter::{FilterResult, ResponseFilter};
pub use moderation::{GateDecision, ModerationFailurePolicy, ModerationGate};

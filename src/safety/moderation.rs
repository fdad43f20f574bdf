//! Input moderation gate
//!
//! Classifies user text before it reaches a provider. A failed moderation
//! call is a distinct outcome from a positive flag and is resolved by an
//! explicit policy: fail-closed (default) refuses to admit unchecked content,
//! fail-open logs and admits.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::llm::traits::ModerationClient;
use crate::llm::{ModerationVerdict, ProviderError};

/// What to do when the moderation call itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationFailurePolicy {
    /// Admit the message unchecked, logging the outage.
    FailOpen,
    /// Refuse the message; never silently admit unchecked content.
    FailClosed,
}

impl FromStr for ModerationFailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(ModerationFailurePolicy::FailOpen),
            "closed" => Ok(ModerationFailurePolicy::FailClosed),
            other => Err(format!("unknown moderation failure policy: {}", other)),
        }
    }
}

/// Outcome of screening one input.
#[derive(Debug)]
pub enum GateDecision {
    /// Input passed moderation (or an outage under fail-open).
    Clear,
    /// Input violates the content policy.
    Flagged(ModerationVerdict),
    /// The moderation call failed and the policy is fail-closed.
    Unavailable(ProviderError),
}

/// Screens user input through a moderation client.
pub struct ModerationGate {
    client: Arc<dyn ModerationClient>,
    failure_policy: ModerationFailurePolicy,
}

impl ModerationGate {
    pub fn new(client: Arc<dyn ModerationClient>, failure_policy: ModerationFailurePolicy) -> Self {
        Self {
            client,
            failure_policy,
        }
    }

    /// Classify `text`, applying the failure policy when the call itself
    /// cannot complete.
    pub async fn screen(&self, text: &str) -> GateDecision {
        match self.client.moderate(text).await {
            Ok(verdict) if verdict.flagged => {
                info!(
                    "input flagged by moderation (categories: {})",
                    verdict.categories.join(", ")
                );
                GateDecision::Flagged(verdict)
            }
            Ok(_) => GateDecision::Clear,
            Err(err) => match self.failure_policy {
                ModerationFailurePolicy::FailOpen => {
                    warn!("moderation call failed, admitting unchecked input: {}", err);
                    GateDecision::Clear
                }
                ModerationFailurePolicy::FailClosed => {
                    error!("moderation call failed, refusing input: {}", err);
                    GateDecision::Unavailable(err)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModeration;

    #[tokio::test]
    async fn clean_input_is_clear() {
        let gate = ModerationGate::new(
            Arc::new(ScriptedModeration::Clear),
            ModerationFailurePolicy::FailClosed,
        );
        assert!(matches!(gate.screen("hello").await, GateDecision::Clear));
    }

    #[tokio::test]
    async fn flagged_input_carries_categories() {
        let gate = ModerationGate::new(
            Arc::new(ScriptedModeration::Flagged(vec!["harassment".to_string()])),
            ModerationFailurePolicy::FailClosed,
        );
        match gate.screen("nasty").await {
            GateDecision::Flagged(verdict) => {
                assert_eq!(verdict.categories, vec!["harassment"])
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[tokio::test]
    async fn outage_fails_closed_by_default_policy() {
        let gate = ModerationGate::new(
            Arc::new(ScriptedModeration::Unavailable),
            ModerationFailurePolicy::FailClosed,
        );
        assert!(matches!(
            gate.screen("hello").await,
            GateDecision::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn outage_admits_under_fail_open() {
        let gate = ModerationGate::new(
            Arc::new(ScriptedModeration::Unavailable),
            ModerationFailurePolicy::FailOpen,
        );
        assert!(matches!(gate.screen("hello").await, GateDecision::Clear));
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!(
            "open".parse::<ModerationFailurePolicy>().unwrap(),
            ModerationFailurePolicy::FailOpen
        );
        assert_eq!(
            "Closed".parse::<ModerationFailurePolicy>().unwrap(),
            ModerationFailurePolicy::FailClosed
        );
        assert!("maybe".parse::<ModerationFailurePolicy>().is_err());
    }
}

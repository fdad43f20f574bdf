//! Scripted in-process providers shared by unit and router tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::traits::{CompletionProvider, ModerationClient};
use super::{ChatMessage, ModerationVerdict, ProviderError, ProviderKind, ProviderResult};

/// A completion provider that replays a script of outcomes, then falls back
/// to a default outcome. Counts every `complete` invocation.
pub(crate) struct ScriptedProvider {
    kind: ProviderKind,
    model: String,
    script: Mutex<VecDeque<ProviderResult<String>>>,
    default_outcome: ProviderResult<String>,
    calls: AtomicU32,
}

impl ScriptedProvider {
    fn new(kind: ProviderKind, default_outcome: ProviderResult<String>) -> Self {
        Self {
            kind,
            model: "mock-model".to_string(),
            script: Mutex::new(VecDeque::new()),
            default_outcome,
            calls: AtomicU32::new(0),
        }
    }

    pub fn always_ok(kind: ProviderKind, reply: &str) -> Self {
        Self::new(kind, Ok(reply.to_string()))
    }

    pub fn always_err(kind: ProviderKind, error: ProviderError) -> Self {
        Self::new(kind, Err(error))
    }

    /// Fail `failures` times with `error`, then reply with `reply` forever.
    pub fn fail_times(kind: ProviderKind, failures: u32, error: ProviderError, reply: &str) -> Self {
        let provider = Self::new(kind, Ok(reply.to_string()));
        {
            let mut script = provider.script.lock().unwrap();
            for _ in 0..failures {
                script.push_back(Err(error.clone()));
            }
        }
        provider
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, _conversation: &[ChatMessage]) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.default_outcome.clone())
    }

    async fn embed(&self, _text: &str) -> ProviderResult<Vec<f32>> {
        Ok(vec![0.1, 0.2, 0.3])
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Fixed-behavior moderation client.
pub(crate) enum ScriptedModeration {
    Clear,
    Flagged(Vec<String>),
    Unavailable,
}

#[async_trait]
impl ModerationClient for ScriptedModeration {
    async fn moderate(&self, _input: &str) -> ProviderResult<ModerationVerdict> {
        match self {
            ScriptedModeration::Clear => Ok(ModerationVerdict {
                flagged: false,
                categories: Vec::new(),
            }),
            ScriptedModeration::Flagged(categories) => Ok(ModerationVerdict {
                flagged: true,
                categories: categories.clone(),
            }),
            ScriptedModeration::Unavailable => Err(ProviderError::Network(
                "moderation endpoint unreachable".to_string(),
            )),
        }
    }
}

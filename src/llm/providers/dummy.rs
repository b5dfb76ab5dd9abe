//! Dummy completion provider — echoes the last user message back prefixed
//! with `[echo]`, after an optional artificial latency.
//! Used for offline runs and for exercising the deadline race in tests.

use std::time::Duration;

use crate::llm::{CompletionRequest, ProviderError, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DummyBehaviour {
    Echo,
    Fail,
}

#[derive(Debug, Clone)]
pub struct DummyProvider {
    latency: Duration,
    behaviour: DummyBehaviour,
}

impl DummyProvider {
    pub fn new(latency: Duration, behaviour: DummyBehaviour) -> Self {
        Self { latency, behaviour }
    }

    pub fn echo() -> Self {
        Self::new(Duration::ZERO, DummyBehaviour::Echo)
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.behaviour {
            DummyBehaviour::Fail => Err(ProviderError::Remote("dummy provider set to fail".into())),
            DummyBehaviour::Echo => {
                let last = request
                    .messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or_default();
                Ok(format!("[echo] {last}"))
            }
        }
    }
}

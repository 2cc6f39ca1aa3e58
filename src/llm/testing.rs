use std::sync::Mutex;

use async_trait::async_trait;

use super::{LlmProvider, LlmRequest, ProviderError};

/// Scripted provider: pops one canned step per call. Shared by the engine
/// test suites to exercise retry, degradation and contract paths without a
/// network.
pub(crate) struct ScriptedProvider {
    steps: Mutex<Vec<ScriptedStep>>,
    repeat: bool,
}

pub(crate) enum ScriptedStep {
    Reply(String),
    Transient(String),
    Terminal(String),
}

impl ScriptedProvider {
    pub(crate) fn new(steps: Vec<ScriptedStep>) -> Self {
        Self {
            steps: Mutex::new(steps),
            repeat: false,
        }
    }

    pub(crate) fn replying(raw: &str) -> Self {
        Self::new(vec![ScriptedStep::Reply(raw.to_string())])
    }

    /// Always replies with the same text, regardless of call count.
    pub(crate) fn always(raw: &str) -> Self {
        let mut provider = Self::replying(raw);
        provider.repeat = true;
        provider
    }

    pub(crate) fn always_terminal() -> Self {
        let mut provider = Self::new(vec![ScriptedStep::Terminal("scripted outage".to_string())]);
        provider.repeat = true;
        provider
    }

    pub(crate) fn remaining(&self) -> usize {
        self.steps.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete_text(&self, _request: &LlmRequest) -> Result<String, ProviderError> {
        let mut steps = self.steps.lock().unwrap();
        let step = if self.repeat && steps.len() == 1 {
            match &steps[0] {
                ScriptedStep::Reply(raw) => return Ok(raw.clone()),
                ScriptedStep::Transient(detail) => {
                    return Err(ProviderError::Transient(detail.clone()));
                }
                ScriptedStep::Terminal(detail) => {
                    return Err(ProviderError::Terminal(detail.clone()));
                }
            }
        } else if steps.is_empty() {
            return Err(ProviderError::Terminal("script exhausted".to_string()));
        } else {
            steps.remove(0)
        };

        match step {
            ScriptedStep::Reply(raw) => Ok(raw),
            ScriptedStep::Transient(detail) => Err(ProviderError::Transient(detail)),
            ScriptedStep::Terminal(detail) => Err(ProviderError::Terminal(detail)),
        }
    }
}

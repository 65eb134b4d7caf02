//! Outcome of one `call`

use crate::response::ResponseEnvelope;

/// Result of a single executed (or attempted) fixture
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Passed(ResponseEnvelope),
    /// Only recorded in lax mode; strict mode returns the error instead
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedCall {
    pub name: String,
    pub outcome: CallOutcome,
}

impl ExecutedCall {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, CallOutcome::Passed(_))
    }

    pub fn response(&self) -> Option<&ResponseEnvelope> {
        match &self.outcome {
            CallOutcome::Passed(response) => Some(response),
            CallOutcome::Failed(_) => None,
        }
    }
}

/// Ordered record of every HTTP call made for one requested fixture
#[derive(Debug, Clone, PartialEq)]
pub struct CallReport {
    pub fixture: String,
    pub calls: Vec<ExecutedCall>,
}

impl CallReport {
    pub fn new(fixture: impl Into<String>) -> Self {
        Self {
            fixture: fixture.into(),
            calls: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, name: impl Into<String>, outcome: CallOutcome) {
        self.calls.push(ExecutedCall {
            name: name.into(),
            outcome,
        });
    }

    pub fn is_success(&self) -> bool {
        self.calls.iter().all(ExecutedCall::passed)
    }

    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.calls
            .iter()
            .filter_map(|call| match &call.outcome {
                CallOutcome::Failed(reason) => Some((call.name.as_str(), reason.as_str())),
                CallOutcome::Passed(_) => None,
            })
            .collect()
    }

    pub fn responses(&self) -> impl Iterator<Item = &ResponseEnvelope> {
        self.calls.iter().filter_map(ExecutedCall::response)
    }

    /// Response of the last call that passed
    pub fn last_response(&self) -> Option<&ResponseEnvelope> {
        self.calls.iter().rev().find_map(ExecutedCall::response)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

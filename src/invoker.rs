//! Model invocation with fallback across model variants and retry rounds.
//!
//! ## State machine
//!
//! ```text
//!   Pending
//!      │ start
//!      ▼
//!   TryingModel(r, i) ──success──▶ Success(r, i)
//!      │ failure
//!      ├── i + 1 < models ──▶ TryingModel(r, i + 1)
//!      ▼
//!   RoundExhausted(r) ── r < rounds, wait r×2 units ──▶ TryingModel(r + 1, 0)
//!      │ r == rounds
//!      ▼
//!   Exhausted
//! ```
//!
//! An attempt fails when the request errors, returns no content, or the
//! content does not parse into a `DepthAssessment`. Transitions live in
//! `Schedule` and carry no I/O; `ModelInvoker` drives them against a
//! `VisionClient`.

use serde_json::Value;
use std::time::Duration;

use crate::client::{CompletionRequest, VisionClient};
use crate::model::{DepthAssessment, InvocationError, ModelError};
use crate::parse::parse_assessment;
use crate::prompt::{ChatMessage, response_format};

pub const DEFAULT_MAX_ROUNDS: u32 = 3;
pub const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 2000;

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Full passes over the model list before giving up.
    pub max_rounds: u32,
    /// Round `r` is followed by a wait of `r × 2` units.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait after a failed round (1-based).
    pub fn backoff_after(&self, round: u32) -> Duration {
        self.backoff_unit * (round * 2)
    }
}

// ---------------------------------------------------------------------------
// States and transitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvocationState {
    #[default]
    Pending,
    /// Round is 1-based, `index` points into the model list.
    TryingModel { round: u32, index: usize },
    RoundExhausted { round: u32 },
    Success { round: u32, index: usize },
    Exhausted,
}

impl InvocationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvocationState::Success { .. } | InvocationState::Exhausted)
    }
}

/// Transition table for a given model count and round limit.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub model_count: usize,
    pub max_rounds: u32,
}

impl Schedule {
    /// Leaves `Pending`.
    pub fn start(&self) -> InvocationState {
        if self.model_count == 0 || self.max_rounds == 0 {
            InvocationState::Exhausted
        } else {
            InvocationState::TryingModel { round: 1, index: 0 }
        }
    }

    /// Outcome of the attempt in a `TryingModel` state. Other states are
    /// returned unchanged.
    pub fn on_attempt(&self, state: InvocationState, succeeded: bool) -> InvocationState {
        match state {
            InvocationState::TryingModel { round, index } if succeeded => {
                InvocationState::Success { round, index }
            }
            InvocationState::TryingModel { round, index } if index + 1 < self.model_count => {
                InvocationState::TryingModel { round, index: index + 1 }
            }
            InvocationState::TryingModel { round, .. } => InvocationState::RoundExhausted { round },
            other => other,
        }
    }

    /// Leaves a `RoundExhausted` state. Other states are returned unchanged.
    pub fn on_round_end(&self, state: InvocationState) -> InvocationState {
        match state {
            InvocationState::RoundExhausted { round } if round < self.max_rounds => {
                InvocationState::TryingModel { round: round + 1, index: 0 }
            }
            InvocationState::RoundExhausted { .. } => InvocationState::Exhausted,
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// One model attempt, kept for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub round: u32,
    pub model: String,
    pub error: Option<String>,
}

/// A successful invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub model_used: String,
    pub assessment: DepthAssessment,
    pub attempts: Vec<Attempt>,
}

pub struct ModelInvoker<'a> {
    client: &'a dyn VisionClient,
    models: Vec<String>,
    policy: RetryPolicy,
    max_completion_tokens: u32,
    response_format: Value,
    pause: Box<dyn Fn(Duration) + 'a>,
}

impl<'a> ModelInvoker<'a> {
    pub fn new(client: &'a dyn VisionClient, models: Vec<String>, policy: RetryPolicy) -> Self {
        Self {
            client,
            models,
            policy,
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
            response_format: response_format(),
            pause: Box::new(|d| {
                if !d.is_zero() {
                    std::thread::sleep(d);
                }
            }),
        }
    }

    pub fn with_max_completion_tokens(mut self, tokens: u32) -> Self {
        self.max_completion_tokens = tokens;
        self
    }

    /// Replaces the backoff sleep.
    pub fn with_pause(mut self, pause: impl Fn(Duration) + 'a) -> Self {
        self.pause = Box::new(pause);
        self
    }

    /// Runs the state machine to a terminal state.
    ///
    /// # Errors
    /// `InvocationError::Exhausted` after every model failed in every round.
    pub fn invoke(&self, messages: &[ChatMessage]) -> Result<Invocation, InvocationError> {
        let schedule = Schedule {
            model_count: self.models.len(),
            max_rounds: self.policy.max_rounds,
        };
        let mut attempts = Vec::new();
        let mut accepted: Option<DepthAssessment> = None;
        let mut state = InvocationState::default();

        loop {
            match state {
                InvocationState::Pending => state = schedule.start(),
                InvocationState::TryingModel { round, index } => {
                    let model = &self.models[index];
                    tracing::debug!(model = %model, round, "trying model");

                    let outcome = self.attempt(model, messages);
                    let succeeded = outcome.is_ok();
                    match outcome {
                        Ok(assessment) => {
                            accepted = Some(assessment);
                            attempts.push(Attempt { round, model: model.clone(), error: None });
                        }
                        Err(e) => {
                            tracing::warn!(model = %model, round, error = %e, "model attempt failed");
                            attempts.push(Attempt { round, model: model.clone(), error: Some(e.to_string()) });
                        }
                    }
                    state = schedule.on_attempt(state, succeeded);
                }
                InvocationState::RoundExhausted { round } => {
                    if round < self.policy.max_rounds {
                        let wait = self.policy.backoff_after(round);
                        tracing::info!(round, wait_ms = wait.as_millis() as u64, "all models failed, backing off");
                        (self.pause)(wait);
                    }
                    state = schedule.on_round_end(state);
                }
                InvocationState::Success { index, .. } => {
                    let Some(assessment) = accepted.take() else {
                        unreachable!("Success is only entered after an accepted attempt");
                    };
                    return Ok(Invocation {
                        model_used: self.models[index].clone(),
                        assessment,
                        attempts,
                    });
                }
                InvocationState::Exhausted => {
                    return Err(InvocationError::Exhausted {
                        rounds: self.policy.max_rounds,
                        attempts: attempts.len(),
                    });
                }
            }
        }
    }

    fn attempt(&self, model: &str, messages: &[ChatMessage]) -> Result<DepthAssessment, ModelError> {
        let request = CompletionRequest {
            model,
            messages,
            max_completion_tokens: self.max_completion_tokens,
            response_format: &self.response_format,
        };

        let content = self.client.complete(&request)?.ok_or(ModelError::EmptyContent)?;
        Ok(parse_assessment(&content)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Scripted reply for one call.
    pub enum Reply {
        Content(&'static str),
        Empty,
        Fail(&'static str),
    }

    /// Replays scripted replies in call order and records the model of
    /// every request. Calls past the end of the script fail.
    pub struct ScriptedClient {
        replies: RefCell<VecDeque<Reply>>,
        pub calls: RefCell<Vec<String>>,
    }

    impl ScriptedClient {
        pub fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                calls: RefCell::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl VisionClient for ScriptedClient {
        fn complete(&self, request: &CompletionRequest<'_>) -> Result<Option<String>, ModelError> {
            self.calls.borrow_mut().push(request.model.to_string());
            match self.replies.borrow_mut().pop_front() {
                Some(Reply::Content(text)) => Ok(Some(text.to_string())),
                Some(Reply::Empty) => Ok(None),
                Some(Reply::Fail(msg)) => Err(ModelError::Transport(msg.to_string())),
                None => Err(ModelError::Transport("script exhausted".to_string())),
            }
        }
    }
}

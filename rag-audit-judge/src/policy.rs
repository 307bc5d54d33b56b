//! Resilience policy for judge calls.
//!
//! The policy is a pure function from the progress so far and the latest
//! failure class to a [`Decision`]. It never sleeps; the client does that,
//! which keeps the whole state machine testable without timers.

use rag_audit_core::{BackoffConfig, JitterStrategy, JudgeConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::JudgeFailureKind;

/// Where a judge invocation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeState {
    Primary,
    Fallback,
    /// Terminal failure.
    Exhausted,
    /// Terminal success.
    Succeeded,
}

impl JudgeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JudgeState::Exhausted | JudgeState::Succeeded)
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    RetrySameModel { delay: Duration },
    SwitchModel,
    Fail,
}

/// Exponential backoff: `initial * multiplier^n`, capped at `max_delay`,
/// then jittered.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: JitterStrategy,
}

impl ExponentialBackoff {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            initial_delay: config.initial_delay(),
            max_delay: config.max_delay(),
            multiplier: config.multiplier,
            jitter: config.jitter,
        }
    }

    /// Delay before retry number `retry` (zero-based) on the same model.
    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());
        self.apply_jitter(Duration::from_secs_f64(capped))
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                let jitter = rand::random::<f64>();
                Duration::from_secs_f64(delay.as_secs_f64() * jitter)
            }
            JitterStrategy::Equal => {
                let jitter = rand::random::<f64>();
                let base = delay.as_secs_f64() / 2.0;
                Duration::from_secs_f64(base + (base * jitter))
            }
        }
    }
}

/// Counters the policy decides on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptProgress {
    pub state: JudgeState,
    /// Rate-limit retries on the current model.
    pub rate_limit_retries: u32,
    /// Malformed-reply retries on the current model.
    pub malformed_retries: u32,
}

impl Default for AttemptProgress {
    fn default() -> Self {
        Self {
            state: JudgeState::Primary,
            rate_limit_retries: 0,
            malformed_retries: 0,
        }
    }
}

impl AttemptProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the counters after `decision` was taken for `kind`.
    pub fn apply(&mut self, kind: JudgeFailureKind, decision: Decision) {
        match decision {
            Decision::RetrySameModel { .. } => match kind {
                JudgeFailureKind::RateLimited => self.rate_limit_retries += 1,
                JudgeFailureKind::MalformedResponse => self.malformed_retries += 1,
                _ => {}
            },
            Decision::SwitchModel => {
                self.state = JudgeState::Fallback;
                self.rate_limit_retries = 0;
                self.malformed_retries = 0;
            }
            Decision::Fail => self.state = JudgeState::Exhausted,
        }
    }

    pub fn succeed(&mut self) {
        self.state = JudgeState::Succeeded;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResiliencePolicy {
    backoff: ExponentialBackoff,
    has_fallback: bool,
    max_malformed_retries: u32,
}

impl ResiliencePolicy {
    pub fn new(backoff: ExponentialBackoff, has_fallback: bool, max_malformed_retries: u32) -> Self {
        Self {
            backoff,
            has_fallback,
            max_malformed_retries,
        }
    }

    pub fn from_config(config: &JudgeConfig) -> Self {
        Self::new(
            ExponentialBackoff::new(&config.backoff),
            config.fallback_model.is_some(),
            config.max_malformed_retries,
        )
    }

    /// Rate limits retry forever with growing delays. An unavailable or
    /// missing model moves from primary to fallback once. Malformed replies
    /// retry immediately up to the configured bound. Everything else fails.
    pub fn decide(&self, progress: &AttemptProgress, kind: JudgeFailureKind) -> Decision {
        if progress.state.is_terminal() {
            return Decision::Fail;
        }

        match kind {
            JudgeFailureKind::RateLimited => Decision::RetrySameModel {
                delay: self.backoff.delay(progress.rate_limit_retries),
            },
            JudgeFailureKind::Unavailable | JudgeFailureKind::ModelNotFound => {
                if progress.state == JudgeState::Primary && self.has_fallback {
                    Decision::SwitchModel
                } else {
                    Decision::Fail
                }
            }
            JudgeFailureKind::MalformedResponse => {
                if progress.malformed_retries < self.max_malformed_retries {
                    Decision::RetrySameModel {
                        delay: Duration::ZERO,
                    }
                } else {
                    Decision::Fail
                }
            }
            JudgeFailureKind::Unknown | JudgeFailureKind::Cancelled => Decision::Fail,
        }
    }
}

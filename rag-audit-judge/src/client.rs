//! Judge client
//!
//! Drives one judge invocation through the [`ResiliencePolicy`], sleeping
//! between rate-limited attempts and recording every attempt for cost
//! accounting. Only backoff waits observe cancellation; a request already
//! in flight always completes.

use async_trait::async_trait;
use rag_audit_core::{ConversationTurn, JudgeConfig, QualityScores};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{JudgeFailure, JudgeFailureKind};
use crate::policy::{AttemptProgress, Decision, JudgeState, ResiliencePolicy};
use crate::prompt::JudgePrompt;
use crate::response::parse_verdict;
use crate::service::JudgeService;

/// Waits out a backoff delay. Swapped out in tests to avoid real timers.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    Failed(JudgeFailureKind),
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Succeeded => "succeeded",
            AttemptOutcome::Failed(kind) => kind.as_str(),
        }
    }
}

/// One call to the judge service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based.
    pub attempt: u32,
    pub model: String,
    pub outcome: AttemptOutcome,
    /// Backoff waited before this attempt was sent.
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JudgeOutcome {
    pub result: Result<QualityScores, JudgeFailure>,
    pub attempts: Vec<AttemptRecord>,
    pub final_state: JudgeState,
}

impl JudgeOutcome {
    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    /// Model of the last attempt.
    pub fn model(&self) -> Option<&str> {
        self.attempts.last().map(|a| a.model.as_str())
    }
}

#[derive(Clone)]
pub struct JudgeClient {
    service: Arc<dyn JudgeService>,
    sleeper: Arc<dyn Sleeper>,
    policy: ResiliencePolicy,
    primary_model: String,
    fallback_model: Option<String>,
}

impl std::fmt::Debug for JudgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeClient")
            .field("policy", &self.policy)
            .field("primary_model", &self.primary_model)
            .field("fallback_model", &self.fallback_model)
            .finish()
    }
}

impl JudgeClient {
    pub fn new(config: &JudgeConfig, service: Arc<dyn JudgeService>) -> Self {
        Self {
            service,
            sleeper: Arc::new(TokioSleeper),
            policy: ResiliencePolicy::from_config(config),
            primary_model: config.primary_model.clone(),
            fallback_model: config.fallback_model.clone(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn primary_model(&self) -> &str {
        &self.primary_model
    }

    pub async fn judge(&self, turn: &ConversationTurn, context: &[String]) -> JudgeOutcome {
        self.judge_until(turn, context, &CancellationToken::new())
            .await
    }

    /// Like [`judge`](Self::judge), but gives up with a `Cancelled` failure
    /// if `cancel` fires during a backoff wait.
    pub async fn judge_until(
        &self,
        turn: &ConversationTurn,
        context: &[String],
        cancel: &CancellationToken,
    ) -> JudgeOutcome {
        let prompt = JudgePrompt::for_turn(turn, context);
        let turn_id = turn.turn_id();

        let mut progress = AttemptProgress::new();
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut model = self.primary_model.as_str();
        let mut delay = Duration::ZERO;

        loop {
            if !delay.is_zero() {
                metrics::histogram!("judge_backoff_seconds").record(delay.as_secs_f64());
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!(turn_id, model, "Judge backoff interrupted by cancellation");
                        progress.apply(JudgeFailureKind::Cancelled, Decision::Fail);
                        return Self::failed(
                            attempts,
                            progress.state,
                            JudgeFailureKind::Cancelled,
                            model,
                            "cancelled while waiting to retry".to_string(),
                        );
                    }
                    _ = self.sleeper.sleep(delay) => {}
                }
            }

            let attempt = attempts.len() as u32 + 1;
            debug!(turn_id, model, attempt, delay_ms = delay.as_millis() as u64, "Submitting to judge");

            let reply = match self.service.submit(prompt.as_str(), model).await {
                Ok(body) => parse_verdict(&body).map_err(|msg| (JudgeFailureKind::MalformedResponse, msg)),
                Err(err) => Err((err.kind(), err.to_string())),
            };

            let outcome = match &reply {
                Ok(_) => AttemptOutcome::Succeeded,
                Err((kind, _)) => AttemptOutcome::Failed(*kind),
            };
            metrics::counter!(
                "judge_attempts_total",
                "model" => model.to_string(),
                "outcome" => outcome.as_str()
            )
            .increment(1);
            attempts.push(AttemptRecord {
                attempt,
                model: model.to_string(),
                outcome,
                delay,
            });

            let (kind, message) = match reply {
                Ok(scores) => {
                    progress.succeed();
                    debug!(turn_id, model, attempt, "Judge returned scores");
                    return JudgeOutcome {
                        result: Ok(scores),
                        attempts,
                        final_state: progress.state,
                    };
                }
                Err(failure) => failure,
            };

            let decision = self.policy.decide(&progress, kind);
            progress.apply(kind, decision);

            match decision {
                Decision::RetrySameModel { delay: next } => {
                    warn!(
                        turn_id,
                        model,
                        attempt,
                        kind = kind.as_str(),
                        delay_ms = next.as_millis() as u64,
                        "Judge attempt failed, retrying"
                    );
                    delay = next;
                }
                Decision::SwitchModel => {
                    // The policy only switches when a fallback is configured.
                    let Some(fallback) = self.fallback_model.as_deref() else {
                        return Self::failed(attempts, JudgeState::Exhausted, kind, model, message);
                    };
                    warn!(
                        turn_id,
                        from = model,
                        to = fallback,
                        kind = kind.as_str(),
                        "Switching judge to fallback model"
                    );
                    model = fallback;
                    delay = Duration::ZERO;
                }
                Decision::Fail => {
                    warn!(turn_id, model, attempt, kind = kind.as_str(), error = %message, "Judge gave up");
                    return Self::failed(attempts, progress.state, kind, model, message);
                }
            }
        }
    }

    fn failed(
        attempts: Vec<AttemptRecord>,
        final_state: JudgeState,
        kind: JudgeFailureKind,
        model: &str,
        message: String,
    ) -> JudgeOutcome {
        JudgeOutcome {
            result: Err(JudgeFailure {
                kind,
                model: model.to_string(),
                attempts: attempts.len() as u32,
                message,
            }),
            attempts,
            final_state,
        }
    }
}

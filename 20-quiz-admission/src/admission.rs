//! Winner admission.
//!
//! All session mutations, including the lifecycle actions in
//! [`crate::lifecycle`], go through [`AdmissionController::commit`]: read a
//! versioned snapshot, apply a pure mutation, write it back only if the
//! version is unchanged. A lost race throws the work away and starts again
//! from a fresh read, so two submissions racing for the last slot can never
//! both land, and a failed mutation never writes anything.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::AdminAuth;
use crate::config::{MAX_COMMIT_BACKOFF, QuizConfig};
use crate::error::{ConfigError, QuizError};
use crate::questions::{ClientQuestion, QuestionBank};
use crate::session::{Phase, Session, unix_millis};
use crate::store::{CommitOutcome, SessionStore};

/// A client's claim to a winner slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub user_id: String,
    pub question_ids: Vec<usize>,
    pub answers: Vec<usize>,
}

/// A successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admission {
    /// 1-based position in the winner list.
    pub rank: usize,
    pub winner_count: usize,
    pub session_ended: bool,
    pub sequence_number: u64,
}

/// Owns the quiz session's mutation path.
///
/// Cheap to clone; clones share the same store and question bank.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    store: Arc<dyn SessionStore>,
    bank: Arc<QuestionBank>,
    auth: AdminAuth,
    config: QuizConfig,
}

impl AdmissionController {
    pub fn new(
        store: Arc<dyn SessionStore>,
        bank: Arc<QuestionBank>,
        auth: AdminAuth,
        config: QuizConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if bank.len() < config.question_count {
            return Err(ConfigError::BankTooSmall {
                available: bank.len(),
                required: config.question_count,
            });
        }
        Ok(Self {
            store,
            bank,
            auth,
            config,
        })
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// Whether `secret` is the administrator secret.
    pub fn is_admin(&self, secret: &str) -> bool {
        self.auth.is_admin(secret)
    }

    pub(crate) fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    /// Deals a fresh random question set of the configured size.
    pub fn question_set(&self) -> Vec<ClientQuestion> {
        self.bank.fetch_question_set(self.config.question_count)
    }

    /// Grades answers without submitting them. Only available while live.
    pub async fn validate(
        &self,
        question_ids: &[usize],
        answers: &[usize],
    ) -> Result<usize, QuizError> {
        let snapshot = self.store.read_session().await?;
        if snapshot.value.phase() != Phase::Live {
            return Err(QuizError::SessionNotAcceptingSubmissions);
        }
        self.bank.grade(question_ids, answers)
    }

    /// Admits `submission` as the next winner if it is fully correct and a
    /// slot is open.
    ///
    /// Checks run in order and stop at the first failure: user id, answers,
    /// phase, capacity. The last two are re-checked on every commit attempt
    /// against the snapshot being replaced.
    pub async fn submit(&self, submission: &Submission) -> Result<Admission, QuizError> {
        let user_id = submission.user_id.trim();
        if user_id.is_empty() {
            return Err(QuizError::InvalidInput("user ID is required".to_string()));
        }

        self.bank.check_perfect(
            &submission.question_ids,
            &submission.answers,
            self.config.question_count,
        )?;

        let capacity = self.config.capacity;
        let (admission, _) = self
            .commit("submit", |session| admit(session, user_id, capacity))
            .await?;

        info!(
            user_id,
            rank = admission.rank,
            sequence = admission.sequence_number,
            session_ended = admission.session_ended,
            "winner admitted"
        );
        Ok(admission)
    }

    /// Atomic read-modify-write of the whole session.
    ///
    /// `mutate` runs against a private copy of the latest snapshot and may run
    /// several times. If it fails, nothing is written. Returns the mutation's
    /// output together with the session that was committed.
    pub(crate) async fn commit<T, F>(
        &self,
        operation: &'static str,
        mut mutate: F,
    ) -> Result<(T, Session), QuizError>
    where
        F: FnMut(&mut Session) -> Result<T, QuizError> + Send,
        T: Send,
    {
        let attempts = self.config.max_commit_attempts;
        let mut backoff = self.config.commit_backoff;

        for attempt in 1..=attempts {
            let snapshot = self.store.read_session().await.inspect_err(|err| {
                warn!(operation, error = %err, "failed to read session");
            })?;

            let mut next = snapshot.value;
            let output = mutate(&mut next)?;

            let outcome = self
                .store
                .write_session_if_unchanged(snapshot.version, &next)
                .await
                .inspect_err(|err| {
                    warn!(operation, error = %err, "failed to write session");
                })?;

            match outcome {
                CommitOutcome::Committed(version) => {
                    debug!(operation, attempt, version, "session committed");
                    return Ok((output, next));
                }
                CommitOutcome::Conflict => {
                    debug!(operation, attempt, "lost commit race, retrying");
                }
            }

            if attempt < attempts {
                tokio::time::sleep(jittered(backoff)).await;
                backoff = (backoff * 2).min(MAX_COMMIT_BACKOFF);
            }
        }

        warn!(operation, attempts, "commit retry budget exhausted");
        Err(QuizError::Contention { attempts })
    }
}

/// The admission decision applied to one snapshot.
fn admit(session: &mut Session, user_id: &str, capacity: usize) -> Result<Admission, QuizError> {
    if session.phase() != Phase::Live || session.is_full(capacity) {
        return Err(QuizError::SessionNotAcceptingSubmissions);
    }

    let rank = session.push_winner(user_id, unix_millis(), capacity);
    Ok(Admission {
        rank,
        winner_count: session.winner_count(),
        session_ended: session.phase() == Phase::Ended,
        sequence_number: session.winners()[rank - 1].sequence_number,
    })
}

/// Full jitter: a uniform delay in `[0, backoff]`.
fn jittered(backoff: Duration) -> Duration {
    let ceiling = backoff.as_micros() as u64;
    if ceiling == 0 {
        return Duration::ZERO;
    }
    Duration::from_micros(rand::thread_rng().gen_range(0..=ceiling))
}

//! Error taxonomy for quiz operations.
//!
//! Every failure leaves the persisted session exactly as it was before the
//! call. Only [`QuizError::Contention`] comes out of an internal retry loop;
//! everything else is reported on first occurrence.

use crate::lifecycle::LifecycleAction;
use crate::session::Phase;

/// Failures reported by the admission controller and lifecycle API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    /// A submission field is missing or malformed.
    #[error("{0}")]
    InvalidInput(String),

    /// The answers did not prove a fully-correct run.
    #[error("must answer all {required} questions correctly")]
    IncorrectSubmission {
        /// Size of the question set that must be answered.
        required: usize,
    },

    /// The session is not live or has no winner slots left.
    ///
    /// Both causes share one variant so callers cannot tell "full" from
    /// "not started".
    #[error("quiz has ended")]
    SessionNotAcceptingSubmissions,

    /// A lifecycle action was requested from the wrong phase.
    #[error("cannot {action} the quiz while it is {phase}")]
    InvalidTransition {
        /// The requested action.
        action: LifecycleAction,
        /// The phase the session was in.
        phase: Phase,
    },

    /// The administrator secret did not match.
    #[error("unauthorized")]
    Unauthorized,

    /// The optimistic commit lost too many races in a row.
    #[error("session is under contention; gave up after {attempts} attempts")]
    Contention {
        /// How many commit attempts were made.
        attempts: u32,
    },

    /// The state store could not be reached or returned garbage.
    #[error("state store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// Failures raised by a session store backing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing could not complete the request.
    #[error("backend error: {0}")]
    Backend(String),

    /// The stored record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

/// Rejected quiz configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("capacity must be at least 1")]
    ZeroCapacity,

    #[error("question count must be at least 1")]
    ZeroQuestionCount,

    #[error("commit retry budget must be at least 1")]
    ZeroRetryBudget,

    #[error("question bank holds {available} questions but each set needs {required}")]
    BankTooSmall { available: usize, required: usize },
}

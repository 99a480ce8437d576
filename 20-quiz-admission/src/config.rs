use std::time::Duration;

use crate::error::ConfigError;

/// Maximum winners admitted per session unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 5;

/// Questions dealt per set; a winner must answer all of them correctly.
pub const DEFAULT_QUESTION_COUNT: usize = 10;

/// Commit attempts before a submission gives up with `Contention`.
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 16;

/// First backoff between lost commit races; doubles up to [`MAX_COMMIT_BACKOFF`].
pub const DEFAULT_COMMIT_BACKOFF: Duration = Duration::from_millis(2);

pub const MAX_COMMIT_BACKOFF: Duration = Duration::from_millis(100);

/// Settings shared by every operation on one quiz instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizConfig {
    pub capacity: usize,
    pub question_count: usize,
    pub max_commit_attempts: u32,
    pub commit_backoff: Duration,
}

impl QuizConfig {
    pub fn new(capacity: usize, question_count: usize) -> Result<Self, ConfigError> {
        let config = Self {
            capacity,
            question_count,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_retry(mut self, max_commit_attempts: u32, commit_backoff: Duration) -> Self {
        self.max_commit_attempts = max_commit_attempts;
        self.commit_backoff = commit_backoff;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.question_count == 0 {
            return Err(ConfigError::ZeroQuestionCount);
        }
        if self.max_commit_attempts == 0 {
            return Err(ConfigError::ZeroRetryBudget);
        }
        Ok(())
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            question_count: DEFAULT_QUESTION_COUNT,
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
            commit_backoff: DEFAULT_COMMIT_BACKOFF,
        }
    }
}

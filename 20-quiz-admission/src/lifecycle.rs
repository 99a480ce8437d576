//! Administrator-driven phase transitions.
//!
//! ```text
//! inactive --start--> live --end--> ended
//!     ^                                |
//!     +------------- reset ------------+   (reset is allowed from any phase)
//! ```
//!
//! Filling the last winner slot also moves `live` to `ended`; that transition
//! belongs to the admission path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::admission::AdmissionController;
use crate::error::QuizError;
use crate::session::{Phase, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    Start,
    End,
    Reset,
}

impl LifecycleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleAction::Start => "start",
            LifecycleAction::End => "end",
            LifecycleAction::Reset => "reset",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleAction {
    type Err = QuizError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "start" => Ok(LifecycleAction::Start),
            "end" => Ok(LifecycleAction::End),
            "reset" => Ok(LifecycleAction::Reset),
            _ => Err(QuizError::InvalidInput("invalid action".to_string())),
        }
    }
}

impl AdmissionController {
    /// `inactive -> live`.
    pub async fn start(&self, secret: &str) -> Result<Phase, QuizError> {
        self.apply(secret, LifecycleAction::Start).await
    }

    /// `live -> ended`.
    pub async fn end(&self, secret: &str) -> Result<Phase, QuizError> {
        self.apply(secret, LifecycleAction::End).await
    }

    /// Back to a fresh inactive session with no winners, from any phase.
    pub async fn reset(&self, secret: &str) -> Result<Phase, QuizError> {
        self.apply(secret, LifecycleAction::Reset).await
    }

    /// Authorizes and applies `action`, returning the resulting phase.
    pub async fn apply(&self, secret: &str, action: LifecycleAction) -> Result<Phase, QuizError> {
        if !self.is_admin(secret) {
            return Err(QuizError::Unauthorized);
        }

        let (from, session) = self
            .commit(action.as_str(), |session| {
                let from = session.phase();
                transition(session, action)?;
                Ok(from)
            })
            .await?;

        info!(%action, %from, to = %session.phase(), "quiz phase changed");
        Ok(session.phase())
    }
}

fn transition(session: &mut Session, action: LifecycleAction) -> Result<(), QuizError> {
    match (action, session.phase()) {
        (LifecycleAction::Start, Phase::Inactive) => session.phase = Phase::Live,
        (LifecycleAction::End, Phase::Live) => session.phase = Phase::Ended,
        (LifecycleAction::Reset, _) => *session = Session::new(),
        (action, phase) => return Err(QuizError::InvalidTransition { action, phase }),
    }
    Ok(())
}

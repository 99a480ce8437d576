use serde::{Deserialize, Serialize};

use crate::admission::AdmissionController;
use crate::error::QuizError;
use crate::session::{Phase, Session};

/// Read-only projection of one session snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardView {
    pub phase: Phase,
    pub winner_count: usize,
    pub capacity: usize,
    pub winners: Vec<RankedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub rank: usize,
    pub user_id: String,
    pub admitted_at_ms: u64,
    pub sequence_number: u64,
}

impl LeaderboardView {
    /// Ranks follow admission order; nothing else is used to sort.
    pub fn from_session(session: &Session, capacity: usize) -> Self {
        let winners = session
            .winners()
            .iter()
            .enumerate()
            .map(|(index, entry)| RankedEntry {
                rank: index + 1,
                user_id: entry.user_id.clone(),
                admitted_at_ms: entry.admitted_at_ms,
                sequence_number: entry.sequence_number,
            })
            .collect();

        Self {
            phase: session.phase(),
            winner_count: session.winner_count(),
            capacity,
            winners,
        }
    }
}

impl AdmissionController {
    /// Current leaderboard, built from a single store read.
    pub async fn read(&self) -> Result<LeaderboardView, QuizError> {
        let snapshot = self.store().read_session().await?;
        Ok(LeaderboardView::from_session(
            &snapshot.value,
            self.config().capacity,
        ))
    }
}

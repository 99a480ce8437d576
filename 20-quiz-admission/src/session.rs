//! The session record: phase plus the ordered list of admitted winners.
//!
//! The winner count is never stored on its own. It is always the length of
//! `winners`, so a reader holding one `Session` value cannot see a count that
//! disagrees with the list.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Inactive,
    Live,
    Ended,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Inactive => "inactive",
            Phase::Live => "live",
            Phase::Ended => "ended",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One admitted winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerEntry {
    pub user_id: String,
    /// Milliseconds since the Unix epoch, taken by the controller.
    pub admitted_at_ms: u64,
    /// Position in commit order, starting at 1 for each session lifetime.
    pub sequence_number: u64,
}

/// The single unit of shared mutable state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub(crate) phase: Phase,
    pub(crate) winners: Vec<WinnerEntry>,
}

impl Session {
    /// A fresh session: inactive with no winners.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Winners in admission order.
    pub fn winners(&self) -> &[WinnerEntry] {
        &self.winners
    }

    pub fn winner_count(&self) -> usize {
        self.winners.len()
    }

    /// The sequence number the next admission will receive.
    pub fn next_sequence(&self) -> u64 {
        self.winners
            .last()
            .map_or(1, |entry| entry.sequence_number + 1)
    }

    pub fn is_full(&self, capacity: usize) -> bool {
        self.winners.len() >= capacity
    }

    /// Appends a winner with the next sequence number and closes the session
    /// once it reaches `capacity`. Returns the 1-based rank.
    ///
    /// Callers must have checked the phase and remaining capacity.
    pub(crate) fn push_winner(
        &mut self,
        user_id: &str,
        admitted_at_ms: u64,
        capacity: usize,
    ) -> usize {
        let sequence_number = self.next_sequence();
        self.winners.push(WinnerEntry {
            user_id: user_id.to_string(),
            admitted_at_ms,
            sequence_number,
        });
        if self.winners.len() >= capacity {
            self.phase = Phase::Ended;
        }
        self.winners.len()
    }
}

/// Wall-clock milliseconds since the Unix epoch.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

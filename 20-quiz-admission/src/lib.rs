//! Capacity-limited quiz competition with a race-free winner admission path.
//!
//! A single shared session accepts answer submissions from many concurrent
//! clients, admits only the first `capacity` fully-correct submissions and
//! publishes a rank-ordered leaderboard. Each module owns one concern:
//!
//! - [`session`] holds the session record: phase, ordered winners, sequence
//!   numbers.
//! - [`store`] defines the snapshot/commit contract and its in-memory and
//!   key-value backings.
//! - [`admission`] validates submissions and admits winners through a bounded
//!   optimistic compare-and-swap loop.
//! - [`lifecycle`] drives the `inactive -> live -> ended` state machine and
//!   reset.
//! - [`leaderboard`] projects a single consistent snapshot for display.
//! - [`questions`] loads the question bank, deals random question sets and
//!   grades answers server-side.
//! - [`auth`] checks the administrator secret.
//! - [`config`] carries the capacity and retry settings.
//! - [`http`] maps everything onto an axum router.
//! - [`cli`] parses arguments for the server and load generator binaries.
//!
//! The integration tests drive the controller directly against both backings
//! and exercise the HTTP surface through the router.

pub mod admission;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod leaderboard;
pub mod lifecycle;
pub mod questions;
pub mod session;
pub mod store;

pub use admission::{Admission, AdmissionController, Submission};
pub use auth::AdminAuth;
pub use config::QuizConfig;
pub use error::{ConfigError, QuizError, StoreError};
pub use leaderboard::LeaderboardView;
pub use lifecycle::LifecycleAction;
pub use questions::QuestionBank;
pub use session::{Phase, Session, WinnerEntry};
pub use store::{KvSessionStore, MemoryKv, MemorySessionStore, SessionStore};

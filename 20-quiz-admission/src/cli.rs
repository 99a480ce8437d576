use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::auth::DEFAULT_ADMIN_PASSWORD;
use crate::config::{DEFAULT_CAPACITY, DEFAULT_QUESTION_COUNT, QuizConfig};
use crate::error::ConfigError;

/// The bundled question bank, anchored to the crate so both binaries find it
/// from any working directory.
pub const DEFAULT_QUESTIONS_PATH: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/data/questions.json");

/// Where the quiz session is persisted.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Versioned session held directly in process memory.
    Memory,
    /// Whole session serialised as one record in a key-value store.
    Kv,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve a capacity-limited quiz competition")]
pub struct ServerArgs {
    /// Socket address to serve HTTP on.
    #[arg(long, env = "QUIZ_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,

    /// Maximum number of winners per session.
    #[arg(long, env = "QUIZ_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,

    /// Questions per set; winners must answer all of them correctly.
    #[arg(long, env = "QUIZ_QUESTION_COUNT", default_value_t = DEFAULT_QUESTION_COUNT)]
    pub question_count: usize,

    /// Path to the JSON question bank.
    #[arg(long, env = "QUIZ_QUESTIONS", default_value = DEFAULT_QUESTIONS_PATH)]
    pub questions: PathBuf,

    /// Shared secret for lifecycle actions.
    #[arg(
        long,
        env = "ADMIN_PASSWORD",
        default_value = DEFAULT_ADMIN_PASSWORD,
        hide_env_values = true
    )]
    pub admin_password: String,

    /// Session persistence backing.
    #[arg(long, value_enum, default_value_t = Backend::Memory)]
    pub backend: Backend,
}

impl ServerArgs {
    pub fn quiz_config(&self) -> Result<QuizConfig, ConfigError> {
        QuizConfig::new(self.capacity, self.question_count)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "System check and load simulation against a quiz server")]
pub struct LoadgenArgs {
    /// Base URL of the quiz server.
    #[arg(long, env = "QUIZ_BASE_URL", default_value = "http://127.0.0.1:3000")]
    pub base_url: String,

    /// Administrator secret used to reset and start the quiz.
    #[arg(
        long,
        env = "ADMIN_PASSWORD",
        default_value = DEFAULT_ADMIN_PASSWORD,
        hide_env_values = true
    )]
    pub admin_password: String,

    /// Local copy of the question bank, used to look up correct answers.
    #[arg(long, env = "QUIZ_QUESTIONS", default_value = DEFAULT_QUESTIONS_PATH)]
    pub questions: PathBuf,

    /// Number of simulated users; 0 runs only the system checks.
    #[arg(long, env = "LOAD_USERS", default_value_t = 0)]
    pub users: usize,

    /// Each simulated user waits a random delay up to this many milliseconds.
    #[arg(long, env = "LOAD_MAX_DELAY_MS", default_value_t = 20_000)]
    pub max_delay_ms: u64,

    /// Fraction of simulated users that answer everything correctly.
    #[arg(long, env = "LOAD_CORRECT_RATE", default_value_t = 0.4)]
    pub correct_rate: f64,
}

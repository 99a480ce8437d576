//! Quiz competition server.
//!
//! ```bash
//! ADMIN_PASSWORD=s3cret cargo run --bin quiz-server -- --capacity 7 --backend kv
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use quiz_admission::{
    AdminAuth, AdmissionController, KvSessionStore, MemoryKv, MemorySessionStore, QuestionBank,
    SessionStore,
    cli::{Backend, ServerArgs},
    http,
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = ServerArgs::parse();
    let config = args.quiz_config().context("invalid quiz configuration")?;
    let bank = QuestionBank::load(&args.questions)
        .with_context(|| format!("failed to load questions from {}", args.questions.display()))?;

    let auth = AdminAuth::new(args.admin_password.clone());
    if auth.is_default() {
        warn!("ADMIN_PASSWORD not set; using the default admin password");
    }

    let store: Arc<dyn SessionStore> = match args.backend {
        Backend::Memory => Arc::new(MemorySessionStore::new()),
        Backend::Kv => Arc::new(KvSessionStore::new(MemoryKv::new())),
    };

    let controller = AdmissionController::new(store, Arc::new(bank), auth, config)
        .context("invalid quiz configuration")?;

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!(
        addr = %listener.local_addr()?,
        capacity = config.capacity,
        question_count = config.question_count,
        backend = ?args.backend,
        "quiz server listening"
    );

    axum::serve(listener, http::router(controller))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("quiz server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = ?err, "failed to install ctrl-c handler");
    }
}

//! End-to-end check and load simulation against a running quiz server.
//!
//! Resets and starts the quiz, walks through the happy and unhappy submission
//! paths, then optionally fires a crowd of simulated users at `/api/submit`
//! and prints how their submissions were received.
//!
//! ```bash
//! cargo run --bin quiz-loadgen -- --users 200 --max-delay-ms 2000
//! ```

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use anyhow::{Context, Result, bail, ensure};
use clap::Parser;
use futures::future::join_all;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use quiz_admission::{
    Phase, QuestionBank,
    cli::LoadgenArgs,
    http::{ActionResponse, LeaderboardResponse, QuestionsResponse, QuizStateResponse},
};

struct QuizClient {
    http: Client,
    base_url: String,
}

impl QuizClient {
    fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn action(&self, secret: &str, action: &str) -> Result<ActionResponse> {
        let response = self
            .http
            .post(self.url("/api/quiz-state"))
            .header(reqwest::header::AUTHORIZATION, secret)
            .json(&json!({ "action": action }))
            .send()
            .await
            .with_context(|| format!("{action} request failed"))?;
        ensure!(
            response.status() == StatusCode::OK,
            "{action} returned {}",
            response.status()
        );
        Ok(response.json().await?)
    }

    async fn state(&self) -> Result<QuizStateResponse> {
        Ok(self
            .http
            .get(self.url("/api/quiz-state"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn questions(&self) -> Result<QuestionsResponse> {
        Ok(self
            .http
            .get(self.url("/api/questions"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn leaderboard(&self) -> Result<LeaderboardResponse> {
        Ok(self
            .http
            .get(self.url("/api/leaderboard"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    /// Returns the status and the parsed body, whatever the status.
    async fn submit(
        &self,
        user_id: &str,
        question_ids: &[usize],
        answers: &[usize],
    ) -> Result<(StatusCode, Value)> {
        let response = self
            .http
            .post(self.url("/api/submit"))
            .json(&json!({
                "userId": user_id,
                "questionIds": question_ids,
                "answers": answers,
            }))
            .send()
            .await?;
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok((status, body))
    }
}

/// Answers for `set`: all correct, or with the first one deliberately wrong.
fn answers_for(bank: &QuestionBank, set: &QuestionsResponse, correct: bool) -> Result<Vec<usize>> {
    set.questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let known = bank
                .get(question.id)
                .with_context(|| format!("server sent unknown question id {}", question.id))?;
            if correct || index > 0 {
                Ok(known.correct_answer)
            } else {
                Ok((known.correct_answer + 1) % known.options.len())
            }
        })
        .collect()
}

async fn run_checks(client: &QuizClient, bank: &QuestionBank, secret: &str) -> Result<()> {
    client.action(secret, "reset").await?;
    println!("OK: reset quiz state");

    let started = client.action(secret, "start").await?;
    ensure!(started.state == Phase::Live, "start left the quiz {}", started.state);
    println!("OK: started quiz");

    let state = client.state().await?;
    ensure!(state.state == Phase::Live, "quiz state is {}", state.state);
    println!("OK: quiz state is live");

    let first = client.questions().await?;
    ensure!(
        first.count == first.questions.len() && first.count > 0,
        "question set count mismatch"
    );
    ensure!(
        first.questions.iter().all(|q| q.options.len() >= 2),
        "a question is missing options"
    );
    println!("OK: received {} valid questions", first.count);

    let second = client.questions().await?;
    let first_ids: HashSet<usize> = first.questions.iter().map(|q| q.id).collect();
    let second_ids: HashSet<usize> = second.questions.iter().map(|q| q.id).collect();
    if first_ids == second_ids {
        println!("WARN: two consecutive question sets are identical (possible but unlikely)");
    } else {
        println!("OK: question set appears randomized");
    }

    let ids: Vec<usize> = first.questions.iter().map(|q| q.id).collect();
    let wrong = answers_for(bank, &first, false)?;
    let (status, _) = client.submit("system-test-user", &ids, &wrong).await?;
    ensure!(status == StatusCode::BAD_REQUEST, "expected 400 for bad submit, got {status}");
    println!("OK: rejected incorrect submission");

    let right = answers_for(bank, &first, true)?;
    let (status, body) = client.submit("system-test-user", &ids, &right).await?;
    ensure!(status == StatusCode::OK, "expected 200 for good submit, got {status}: {body}");
    println!("OK: accepted correct submission");

    let leaderboard = client.leaderboard().await?;
    ensure!(!leaderboard.leaderboard.is_empty(), "leaderboard did not update");
    println!("OK: leaderboard updated");

    Ok(())
}

async fn simulate_user(
    client: &QuizClient,
    bank: &QuestionBank,
    args: &LoadgenArgs,
    index: usize,
) -> &'static str {
    let (delay, correct) = {
        let mut rng = rand::thread_rng();
        (
            Duration::from_millis(rng.gen_range(0..=args.max_delay_ms)),
            rng.gen_bool(args.correct_rate.clamp(0.0, 1.0)),
        )
    };
    tokio::time::sleep(delay).await;

    let Ok(set) = client.questions().await else {
        return "questions_failed";
    };
    let Ok(answers) = answers_for(bank, &set, correct) else {
        return "unexpected";
    };
    let ids: Vec<usize> = set.questions.iter().map(|q| q.id).collect();

    match client.submit(&format!("load-user-{index}"), &ids, &answers).await {
        Ok((StatusCode::OK, _)) => "accepted",
        Ok((StatusCode::BAD_REQUEST, body)) => match body["message"].as_str() {
            Some("Quiz has ended") => "quiz_ended",
            Some(message) if message.starts_with("Must answer all") => "rejected",
            _ => "unexpected",
        },
        Ok((StatusCode::CONFLICT, _)) => "contention",
        _ => "unexpected",
    }
}

async fn run_load(client: &QuizClient, bank: &QuestionBank, args: &LoadgenArgs) -> Result<()> {
    println!(
        "Simulating {} users over ~{}ms (correct rate {})",
        args.users, args.max_delay_ms, args.correct_rate
    );

    let users = (1..=args.users).map(|index| simulate_user(client, bank, args, index));
    let outcomes = join_all(users).await;
    let mut summary: BTreeMap<&str, usize> = BTreeMap::new();
    for outcome in outcomes {
        *summary.entry(outcome).or_default() += 1;
    }
    println!("Load simulation results: {summary:?}");

    let leaderboard = client.leaderboard().await?;
    if leaderboard.winner_count > leaderboard.capacity {
        bail!(
            "admitted {} winners with capacity {}",
            leaderboard.winner_count,
            leaderboard.capacity
        );
    }
    println!(
        "OK: {} of {} winner slots filled, quiz is {}",
        leaderboard.winner_count, leaderboard.capacity, leaderboard.quiz_state
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = LoadgenArgs::parse();
    let bank = QuestionBank::load(&args.questions)
        .with_context(|| format!("failed to load questions from {}", args.questions.display()))?;
    let client = QuizClient::new(&args.base_url);

    println!("Running system checks against {}", args.base_url);
    run_checks(&client, &bank, &args.admin_password).await?;

    if args.users > 0 {
        run_load(&client, &bank, &args).await?;
    }

    println!("System checks complete");
    Ok(())
}

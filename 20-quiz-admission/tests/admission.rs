//! Admission properties under concurrency, checked against both session
//! backings.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use quiz_admission::{
    Admission, AdminAuth, AdmissionController, KvSessionStore, MemoryKv, MemorySessionStore, Phase,
    QuestionBank, QuizConfig, QuizError, SessionStore, Submission,
};

const SECRET: &str = "test-secret";
const BANK: &str = include_str!("../data/questions.json");

fn backings() -> Vec<(&'static str, Arc<dyn SessionStore>)> {
    vec![
        ("memory", Arc::new(MemorySessionStore::new())),
        ("kv", Arc::new(KvSessionStore::new(MemoryKv::new()))),
    ]
}

fn controller(store: Arc<dyn SessionStore>, capacity: usize) -> Result<AdmissionController> {
    let bank = QuestionBank::from_json(BANK)?;
    let config = QuizConfig::new(capacity, 10)?;
    Ok(AdmissionController::new(
        store,
        Arc::new(bank),
        AdminAuth::new(SECRET),
        config,
    )?)
}

fn perfect_submission(controller: &AdmissionController, user_id: &str) -> Submission {
    let question_ids: Vec<usize> = (0..controller.config().question_count).collect();
    let answers = question_ids
        .iter()
        .map(|&id| controller.bank().get(id).map_or(0, |q| q.correct_answer))
        .collect();
    Submission {
        user_id: user_id.to_string(),
        question_ids,
        answers,
    }
}

/// Fires `submitters` concurrent perfect submissions and returns each result.
async fn race(
    controller: &AdmissionController,
    submitters: usize,
) -> Vec<Result<Admission, QuizError>> {
    let handles: Vec<_> = (0..submitters)
        .map(|index| {
            let controller = controller.clone();
            tokio::spawn(async move {
                let submission = perfect_submission(&controller, &format!("user-{index}"));
                controller.submit(&submission).await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(submitters);
    for handle in handles {
        results.push(handle.await.expect("submit task panicked"));
    }
    results
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submitters_never_exceed_capacity() -> Result<()> {
    for capacity in [5, 7] {
        for (name, store) in backings() {
            let controller = controller(store, capacity)?;
            controller.start(SECRET).await?;

            let results = race(&controller, capacity * 4).await;

            let admitted: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
            assert_eq!(admitted.len(), capacity, "{name} backing, capacity {capacity}");
            for rejected in results.iter().filter_map(|r| r.as_ref().err()) {
                assert_eq!(rejected, &QuizError::SessionNotAcceptingSubmissions, "{name}");
            }

            let mut ranks: Vec<usize> = admitted.iter().map(|a| a.rank).collect();
            ranks.sort_unstable();
            assert_eq!(ranks, (1..=capacity).collect::<Vec<_>>(), "{name}");
            assert_eq!(
                admitted.iter().filter(|a| a.session_ended).count(),
                1,
                "exactly the last admission closes the session ({name})"
            );

            let view = controller.read().await?;
            assert_eq!(view.phase, Phase::Ended, "{name}");
            assert_eq!(view.winner_count, capacity, "{name}");
            let sequences: Vec<u64> = view.winners.iter().map(|w| w.sequence_number).collect();
            assert_eq!(sequences, (1..=capacity as u64).collect::<Vec<_>>(), "{name}");
            let users: HashSet<&str> = view.winners.iter().map(|w| w.user_id.as_str()).collect();
            assert_eq!(users.len(), capacity, "{name}");
        }
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn five_winner_scenario_then_sixth_is_turned_away() -> Result<()> {
    for (name, store) in backings() {
        let controller = controller(store, 5)?;
        assert_eq!(controller.read().await?.phase, Phase::Inactive);
        assert_eq!(controller.start(SECRET).await?, Phase::Live);

        let results = race(&controller, 5).await;
        let mut ranks = Vec::new();
        for result in results {
            ranks.push(result?.rank);
        }
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5], "{name}");
        assert_eq!(controller.read().await?.phase, Phase::Ended, "{name}");

        let late = controller
            .submit(&perfect_submission(&controller, "latecomer"))
            .await;
        assert_eq!(late, Err(QuizError::SessionNotAcceptingSubmissions), "{name}");
        assert_eq!(controller.read().await?.winner_count, 5, "{name}");
    }
    Ok(())
}

#[tokio::test]
async fn sequential_admissions_rank_in_commit_order() -> Result<()> {
    let controller = controller(Arc::new(MemorySessionStore::new()), 5)?;
    controller.start(SECRET).await?;

    for (expected_rank, user) in ["alice", "bob", "carol"].iter().enumerate() {
        let admission = controller
            .submit(&perfect_submission(&controller, user))
            .await?;
        assert_eq!(admission.rank, expected_rank + 1);
        assert_eq!(admission.winner_count, expected_rank + 1);
        assert!(!admission.session_ended);
    }

    let view = controller.read().await?;
    let order: Vec<&str> = view.winners.iter().map(|w| w.user_id.as_str()).collect();
    assert_eq!(order, vec!["alice", "bob", "carol"]);
    Ok(())
}

#[tokio::test]
async fn user_ids_are_trimmed_and_may_repeat() -> Result<()> {
    let controller = controller(Arc::new(KvSessionStore::new(MemoryKv::new())), 5)?;
    controller.start(SECRET).await?;

    controller
        .submit(&perfect_submission(&controller, "  alice  "))
        .await?;
    controller
        .submit(&perfect_submission(&controller, "alice"))
        .await?;

    let view = controller.read().await?;
    assert_eq!(view.winner_count, 2);
    assert!(view.winners.iter().all(|w| w.user_id == "alice"));
    Ok(())
}

#[tokio::test]
async fn blank_user_id_leaves_session_untouched() -> Result<()> {
    for (name, store) in backings() {
        let controller = controller(store, 5)?;
        controller.start(SECRET).await?;
        let before = controller.read().await?;

        let result = controller
            .submit(&perfect_submission(&controller, "  "))
            .await;
        assert!(matches!(result, Err(QuizError::InvalidInput(_))), "{name}");
        assert_eq!(controller.read().await?, before, "{name}");
    }
    Ok(())
}

#[tokio::test]
async fn submissions_before_start_are_not_accepted() -> Result<()> {
    let controller = controller(Arc::new(MemorySessionStore::new()), 5)?;
    let result = controller
        .submit(&perfect_submission(&controller, "eager"))
        .await;
    assert_eq!(result, Err(QuizError::SessionNotAcceptingSubmissions));
    assert_eq!(controller.read().await?.winner_count, 0);
    Ok(())
}

#[tokio::test]
async fn short_or_wrong_answer_sets_are_incorrect() -> Result<()> {
    let controller = controller(Arc::new(MemorySessionStore::new()), 5)?;
    controller.start(SECRET).await?;

    let mut short = perfect_submission(&controller, "alice");
    short.question_ids.truncate(9);
    short.answers.truncate(9);
    assert_eq!(
        controller.submit(&short).await,
        Err(QuizError::IncorrectSubmission { required: 10 })
    );

    let mut wrong = perfect_submission(&controller, "alice");
    let first = controller.bank().get(wrong.question_ids[0]).expect("question 0");
    wrong.answers[0] = (first.correct_answer + 1) % first.options.len();
    assert_eq!(
        controller.submit(&wrong).await,
        Err(QuizError::IncorrectSubmission { required: 10 })
    );

    assert_eq!(controller.read().await?.winner_count, 0);
    Ok(())
}

#[tokio::test]
async fn end_while_inactive_is_an_invalid_transition() -> Result<()> {
    for (name, store) in backings() {
        let controller = controller(store, 5)?;
        let before = controller.read().await?;

        let result = controller.end(SECRET).await;
        assert_eq!(
            result,
            Err(QuizError::InvalidTransition {
                action: quiz_admission::LifecycleAction::End,
                phase: Phase::Inactive,
            }),
            "{name}"
        );
        assert_eq!(controller.read().await?, before, "{name}");
    }
    Ok(())
}

#[tokio::test]
async fn repeated_start_is_reported_not_ignored() -> Result<()> {
    let controller = controller(Arc::new(MemorySessionStore::new()), 5)?;
    controller.start(SECRET).await?;
    assert!(matches!(
        controller.start(SECRET).await,
        Err(QuizError::InvalidTransition { .. })
    ));
    assert_eq!(controller.end(SECRET).await?, Phase::Ended);
    assert!(matches!(
        controller.end(SECRET).await,
        Err(QuizError::InvalidTransition { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn lifecycle_requires_the_admin_secret() -> Result<()> {
    let controller = controller(Arc::new(MemorySessionStore::new()), 5)?;
    assert_eq!(controller.start("wrong").await, Err(QuizError::Unauthorized));
    assert_eq!(controller.reset("").await, Err(QuizError::Unauthorized));
    assert_eq!(controller.read().await?.phase, Phase::Inactive);
    Ok(())
}

#[tokio::test]
async fn reset_starts_a_new_lifetime_from_any_phase() -> Result<()> {
    for (name, store) in backings() {
        let controller = controller(store, 2)?;

        // Inactive.
        assert_eq!(controller.reset(SECRET).await?, Phase::Inactive, "{name}");

        // Ended by filling up.
        controller.start(SECRET).await?;
        controller
            .submit(&perfect_submission(&controller, "alice"))
            .await?;
        controller
            .submit(&perfect_submission(&controller, "bob"))
            .await?;
        assert_eq!(controller.read().await?.phase, Phase::Ended, "{name}");

        assert_eq!(controller.reset(SECRET).await?, Phase::Inactive, "{name}");
        assert_eq!(controller.reset(SECRET).await?, Phase::Inactive, "{name}");
        let view = controller.read().await?;
        assert_eq!(view.winner_count, 0, "{name}");
        assert!(view.winners.is_empty(), "{name}");

        controller.start(SECRET).await?;
        let admission = controller
            .submit(&perfect_submission(&controller, "carol"))
            .await?;
        assert_eq!((admission.rank, admission.sequence_number), (1, 1), "{name}");
    }
    Ok(())
}

#[tokio::test]
async fn reads_without_mutation_are_identical() -> Result<()> {
    let controller = controller(Arc::new(KvSessionStore::new(MemoryKv::new())), 5)?;
    controller.start(SECRET).await?;
    controller
        .submit(&perfect_submission(&controller, "alice"))
        .await?;

    let first = controller.read().await?;
    let second = controller.read().await?;
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_count_and_list_disagree() -> Result<()> {
    let controller = controller(Arc::new(KvSessionStore::new(MemoryKv::new())), 7)?;
    controller.start(SECRET).await?;

    let reader = {
        let controller = controller.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                let view = controller.read().await.expect("read");
                assert_eq!(view.winner_count, view.winners.len());
                assert!(view.winner_count <= view.capacity);
                if view.winner_count == view.capacity {
                    assert_eq!(view.phase, Phase::Ended);
                }
                tokio::task::yield_now().await;
            }
        })
    };

    race(&controller, 20).await;
    reader.await?;
    Ok(())
}

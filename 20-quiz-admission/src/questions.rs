//! Question bank: random question sets for clients, answer checking for the
//! server.
//!
//! A question's id is its index in the bank file. Clients only ever see
//! [`ClientQuestion`], which omits the correct answer; grading always happens
//! here against the bank.

use std::collections::HashSet;
use std::path::Path;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::QuizError;

/// A question as stored in the bank file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

/// What a client is allowed to see of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientQuestion {
    pub id: usize,
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BankError {
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse question bank: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("question {index} needs at least two options")]
    TooFewOptions { index: usize },

    #[error("question {index} marks option {answer} correct but has {options} options")]
    AnswerOutOfRange {
        index: usize,
        answer: usize,
        options: usize,
    },
}

#[derive(Deserialize)]
struct BankFile {
    questions: Vec<Question>,
}

#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Result<Self, BankError> {
        for (index, question) in questions.iter().enumerate() {
            if question.options.len() < 2 {
                return Err(BankError::TooFewOptions { index });
            }
            if question.correct_answer >= question.options.len() {
                return Err(BankError::AnswerOutOfRange {
                    index,
                    answer: question.correct_answer,
                    options: question.options.len(),
                });
            }
        }
        Ok(Self { questions })
    }

    /// Parses a bank in `{"questions": [...]}` form.
    pub fn from_json(raw: &str) -> Result<Self, BankError> {
        let file: BankFile = serde_json::from_str(raw)?;
        Self::new(file.questions)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BankError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Question> {
        self.questions.get(id)
    }

    /// Picks up to `count` distinct questions in random order, without
    /// their answers.
    pub fn fetch_question_set(&self, count: usize) -> Vec<ClientQuestion> {
        let mut rng = rand::thread_rng();
        let mut ids: Vec<usize> = (0..self.questions.len()).collect();
        ids.shuffle(&mut rng);
        ids.truncate(count);
        ids.into_iter()
            .map(|id| {
                let question = &self.questions[id];
                ClientQuestion {
                    id,
                    question: question.question.clone(),
                    options: question.options.clone(),
                }
            })
            .collect()
    }

    /// Counts correct answers. `answers[i]` is the chosen option for
    /// `question_ids[i]`.
    pub fn grade(&self, question_ids: &[usize], answers: &[usize]) -> Result<usize, QuizError> {
        if question_ids.len() != answers.len() {
            return Err(QuizError::InvalidInput(
                "question and answer counts do not match".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(question_ids.len());
        let mut correct = 0;
        for (&id, &answer) in question_ids.iter().zip(answers) {
            let question = self
                .get(id)
                .ok_or_else(|| QuizError::InvalidInput("invalid question set".to_string()))?;
            // Answering the same question twice must not count twice.
            if !seen.insert(id) {
                return Err(QuizError::InvalidInput("invalid question set".to_string()));
            }
            if answer >= question.options.len() {
                return Err(QuizError::InvalidInput("invalid answer data".to_string()));
            }
            if answer == question.correct_answer {
                correct += 1;
            }
        }
        Ok(correct)
    }

    /// Succeeds only for a full set of `required` questions, all answered
    /// correctly.
    pub fn check_perfect(
        &self,
        question_ids: &[usize],
        answers: &[usize],
        required: usize,
    ) -> Result<(), QuizError> {
        let correct = self.grade(question_ids, answers)?;
        if question_ids.len() != required || correct != required {
            return Err(QuizError::IncorrectSubmission { required });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK: &str = r#"{
        "questions": [
            {"question": "2 + 2?", "options": ["3", "4"], "correctAnswer": 1},
            {"question": "Capital of France?", "options": ["Paris", "Rome", "Oslo"], "correctAnswer": 0},
            {"question": "Largest planet?", "options": ["Mars", "Jupiter"], "correctAnswer": 1}
        ]
    }"#;

    fn bank() -> QuestionBank {
        QuestionBank::from_json(BANK).expect("valid bank")
    }

    #[test]
    fn question_sets_are_distinct_and_hide_answers() {
        let set = bank().fetch_question_set(3);
        let ids: HashSet<usize> = set.iter().map(|q| q.id).collect();
        assert_eq!(ids.len(), 3);

        let json = serde_json::to_string(&set).expect("encode");
        assert!(!json.contains("correctAnswer"));
    }

    #[test]
    fn question_set_is_capped_by_bank_size() {
        assert_eq!(bank().fetch_question_set(10).len(), 3);
    }

    #[test]
    fn grade_counts_correct_answers() {
        assert_eq!(bank().grade(&[0, 1, 2], &[1, 0, 0]), Ok(2));
    }

    #[test]
    fn grade_rejects_repeated_questions() {
        let err = bank().grade(&[0, 0], &[1, 1]).expect_err("duplicate ids");
        assert!(matches!(err, QuizError::InvalidInput(_)));
    }

    #[test]
    fn grade_rejects_out_of_range_answers() {
        let err = bank().grade(&[0], &[2]).expect_err("option 2 does not exist");
        assert_eq!(err, QuizError::InvalidInput("invalid answer data".to_string()));
    }

    #[test]
    fn check_perfect_requires_the_full_set() {
        let bank = bank();
        assert_eq!(bank.check_perfect(&[2, 0, 1], &[1, 1, 0], 3), Ok(()));
        assert_eq!(
            bank.check_perfect(&[0, 1], &[1, 0], 3),
            Err(QuizError::IncorrectSubmission { required: 3 })
        );
        assert_eq!(
            bank.check_perfect(&[0, 1, 2], &[1, 0, 0], 3),
            Err(QuizError::IncorrectSubmission { required: 3 })
        );
    }

    #[test]
    fn rejects_answers_outside_the_options() {
        let raw = r#"{"questions": [{"question": "?", "options": ["a", "b"], "correctAnswer": 5}]}"#;
        let err = QuestionBank::from_json(raw).expect_err("bad bank");
        assert!(matches!(err, BankError::AnswerOutOfRange { index: 0, .. }));
    }
}

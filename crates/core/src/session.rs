//! Mutable state of a single interview.
//!
//! A [`Session`] is created once by the syllabus bootstrapper, mutated once
//! per turn by the engine, and dropped when the interview terminates. It owns
//! the topic queue, the full conversation transcript, and the streak counters
//! the policy rules read.

use crate::momentum;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Only the most recent scores feed momentum and density checks.
pub const RECENT_SCORE_CAP: usize = 10;

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    User,
}

/// One entry of the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub role: Role,
    pub content: String,
}

impl TurnRecord {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// State of one interview.
#[derive(Debug, Clone)]
pub struct Session {
    /// Interview subject, fixed at creation.
    pub domain: String,
    /// Remaining topics, consumed front-first on pivot. Never reordered
    /// after the initial shuffle and never contains `current_topic`.
    pub topic_queue: VecDeque<String>,
    /// The active topic, replaced atomically on pivot.
    pub current_topic: String,
    /// Questions asked since the last topic change.
    pub questions_in_current_topic: u32,
    /// Full transcript, append-only.
    pub history: Vec<TurnRecord>,
    /// The most recently asked question, re-used for re-asks and analysis.
    pub last_question: String,
    /// Last scores, oldest to newest, capped at [`RECENT_SCORE_CAP`].
    pub recent_scores: Vec<f64>,
    /// Consecutive hesitation classifications.
    pub hesitation_streak: u32,
    /// Consecutive scores at or below the low bound. Logged only, never a
    /// decision input.
    pub low_score_streak: u32,
    /// Consecutive strong-negative momentum readings not yet acted on.
    pub pivot_grace_counter: u32,
    /// Divisor for momentum normalization.
    pub momentum_divisor: f64,
    /// Weight applied to the normalized momentum.
    pub momentum_weight: f64,
}

impl Session {
    /// Creates a session with `current_topic` already set and the remaining
    /// topics queued in order.
    pub fn new(
        domain: impl Into<String>,
        current_topic: impl Into<String>,
        topic_queue: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            topic_queue: topic_queue.into_iter().collect(),
            current_topic: current_topic.into(),
            questions_in_current_topic: 0,
            history: Vec::new(),
            last_question: String::new(),
            recent_scores: Vec::new(),
            hesitation_streak: 0,
            low_score_streak: 0,
            pivot_grace_counter: 0,
            momentum_divisor: momentum::DEFAULT_NORMALIZATION_DIVISOR,
            momentum_weight: momentum::DEFAULT_WEIGHT,
        }
    }

    /// Appends a resolved score, dropping the oldest entry past the cap.
    pub fn push_score(&mut self, score: f64) {
        self.recent_scores.push(score);
        if self.recent_scores.len() > RECENT_SCORE_CAP {
            let excess = self.recent_scores.len() - RECENT_SCORE_CAP;
            self.recent_scores.drain(..excess);
        }
    }

    /// The last `n` assistant questions, most recent first.
    pub fn recent_assistant_questions(&self, n: usize) -> Vec<String> {
        self.history
            .iter()
            .rev()
            .filter(|turn| turn.role == Role::Assistant)
            .take(n)
            .map(|turn| turn.content.clone())
            .collect()
    }

    /// Records an emitted question: transcript, `last_question`, and the
    /// per-topic depth counter all move together.
    pub fn ask(&mut self, question: String) {
        self.history.push(TurnRecord::assistant(question.clone()));
        self.last_question = question;
        self.questions_in_current_topic += 1;
    }

    /// Moves to the next queued topic, resetting topic-local counters.
    /// Returns `None` when the syllabus is exhausted.
    pub fn pivot(&mut self) -> Option<&str> {
        let next = self.topic_queue.pop_front()?;
        self.current_topic = next;
        self.questions_in_current_topic = 0;
        self.pivot_grace_counter = 0;
        Some(&self.current_topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            "Networking",
            "Networking",
            ["Routing".to_string(), "DNS".to_string()],
        )
    }

    #[test]
    fn test_push_score_caps_at_ten_most_recent() {
        let mut s = session();
        for i in 0..15 {
            s.push_score(i as f64);
        }
        assert_eq!(s.recent_scores.len(), RECENT_SCORE_CAP);
        assert_eq!(s.recent_scores.first(), Some(&5.0));
        assert_eq!(s.recent_scores.last(), Some(&14.0));
    }

    #[test]
    fn test_recent_assistant_questions_most_recent_first() {
        let mut s = session();
        s.ask("Q1?".to_string());
        s.history.push(TurnRecord::user("A1"));
        s.ask("Q2?".to_string());
        s.history.push(TurnRecord::user("A2"));
        s.ask("Q3?".to_string());

        assert_eq!(
            s.recent_assistant_questions(2),
            vec!["Q3?".to_string(), "Q2?".to_string()]
        );
    }

    #[test]
    fn test_ask_updates_last_question_and_depth() {
        let mut s = session();
        s.ask("What is a subnet?".to_string());
        assert_eq!(s.last_question, "What is a subnet?");
        assert_eq!(s.questions_in_current_topic, 1);
        assert_eq!(s.history.len(), 1);
    }

    #[test]
    fn test_pivot_pops_front_and_resets_counters() {
        let mut s = session();
        s.ask("Q1?".to_string());
        s.ask("Q2?".to_string());
        s.pivot_grace_counter = 1;

        assert_eq!(s.pivot(), Some("Routing"));
        assert_eq!(s.current_topic, "Routing");
        assert_eq!(s.questions_in_current_topic, 0);
        assert_eq!(s.pivot_grace_counter, 0);
        assert_eq!(s.topic_queue.len(), 1);
    }

    #[test]
    fn test_pivot_on_empty_queue_is_none() {
        let mut s = Session::new("Rust", "Rust", []);
        assert_eq!(s.pivot(), None);
        assert_eq!(s.current_topic, "Rust");
    }
}

//! The language-model oracle contract consumed by the decision engine.
//!
//! The engine never talks to a model directly. Everything it needs —
//! classification, numeric scoring, question drafting, refinement, topic
//! pivots, syllabus generation — is expressed as one capability on the
//! [`Oracle`] trait, so the backing service can be swapped for a mock in
//! tests or a different provider in production.

use crate::session::TurnRecord;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use serde_json::Value;

/// How an oracle call can fail, as seen by the engine.
///
/// `Unavailable` means the interview cannot continue (upstream throttled or
/// unreachable) and terminates the session. `Malformed` is recovered locally
/// with a documented per-capability fallback and never reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle upstream unavailable: {0}")]
    Unavailable(String),
    #[error("malformed oracle response: {0}")]
    Malformed(String),
}

/// Closed taxonomy of answer classifications, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnswerKind {
    /// Filler tokens, trailing off, or fewer than 3 meaningful words.
    Hesitation,
    /// An explicit "I don't know".
    KnowledgeGap,
    /// Stalling without admitting ignorance.
    EvasiveNonAnswer,
    /// Confronting the interviewer.
    EvasiveChallenge,
    FactuallyIncorrect,
    /// On-topic but thin.
    Vague,
    Normal,
}

impl AnswerKind {
    /// Parses the classifier's tag. Tags are matched case-insensitively;
    /// anything outside the closed set is an error for the caller to
    /// recover from, never a silent guess.
    pub fn from_tag(tag: &str) -> Result<Self, OracleError> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "HESITATION_SIGNAL" => Ok(Self::Hesitation),
            "KNOWLEDGE_GAP" => Ok(Self::KnowledgeGap),
            "EVASIVE_NON_ANSWER" => Ok(Self::EvasiveNonAnswer),
            "EVASIVE_CHALLENGE" => Ok(Self::EvasiveChallenge),
            "FACTUALLY_INCORRECT" => Ok(Self::FactuallyIncorrect),
            "VAGUE" => Ok(Self::Vague),
            "NORMAL" => Ok(Self::Normal),
            other => Err(OracleError::Malformed(format!(
                "unknown answer classification tag: {other:?}"
            ))),
        }
    }

    /// The wire tag, used when feeding the classification back into prompts.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Hesitation => "HESITATION_SIGNAL",
            Self::KnowledgeGap => "KNOWLEDGE_GAP",
            Self::EvasiveNonAnswer => "EVASIVE_NON_ANSWER",
            Self::EvasiveChallenge => "EVASIVE_CHALLENGE",
            Self::FactuallyIncorrect => "FACTUALLY_INCORRECT",
            Self::Vague => "VAGUE",
            Self::Normal => "NORMAL",
        }
    }
}

/// Structured result of the classification capability.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// One-line neutral summary of the answer.
    pub summary: String,
    /// Advisory-only numeric impression. Surfaced in diagnostics, never used
    /// for decisions; the dedicated scorer is the only numeric input.
    pub advisory_score: f64,
    pub kind: AnswerKind,
    /// One sentence explaining the classification.
    pub notes: String,
    /// Candidate follow-up suggested by the classifier.
    pub suggested_followup: String,
    /// Parsed for observability. The engine derives topic completion itself
    /// and ignores this flag.
    pub topic_is_complete: bool,
    /// Informational; termination is driven by `terminate`.
    pub safety_violation: bool,
    pub terminate: bool,
    pub termination_reason: Option<String>,
}

impl Analysis {
    /// Safe default used when the classifier response cannot be parsed.
    pub fn fallback() -> Self {
        Self {
            summary: "Analysis unavailable".to_string(),
            advisory_score: 0.0,
            kind: AnswerKind::Normal,
            notes: "Classifier response could not be parsed.".to_string(),
            suggested_followup: "Ask a simple, re-phrased question.".to_string(),
            topic_is_complete: false,
            safety_violation: false,
            terminate: false,
            termination_reason: None,
        }
    }
}

/// Result of the dedicated scoring capability.
#[derive(Debug, Clone)]
pub struct ScoreResult {
    /// In [0, 10], rounded to one decimal.
    pub score: f64,
    pub reason: String,
}

/// Everything the pivot-question capability needs to calibrate the opening
/// question of a new topic.
#[derive(Debug, Clone)]
pub struct PivotContext {
    pub new_topic: String,
    pub last_answer: String,
    pub score: f64,
    pub kind: AnswerKind,
    pub notes: String,
    pub recent_questions: Vec<String>,
}

/// Abstract language-model capability set.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Classifies the candidate's answer to `question`, given the last 1-2
    /// assistant questions for repetition avoidance.
    async fn classify(
        &self,
        question: &str,
        answer: &str,
        recent_questions: &[String],
    ) -> Result<Analysis, OracleError>;

    /// Scores the answer numerically, independently of classification.
    async fn score(&self, question: &str, answer: &str) -> Result<ScoreResult, OracleError>;

    /// Asks the lightweight triage model for a draft follow-up. Best effort:
    /// `None` covers an absent backend, a transport failure, and the
    /// low-confidence sentinel alike — the engine falls back to `freeform`.
    async fn draft_followup(&self, topic: &str, history: &[TurnRecord]) -> Option<String>;

    /// Free-form expert question generation steered by `hint`.
    async fn freeform(
        &self,
        domain: &str,
        history: &[TurnRecord],
        hint: &str,
    ) -> Result<String, OracleError>;

    /// Merges a triage draft with the classifier's analysis into the final
    /// wording.
    async fn refine(
        &self,
        answer: &str,
        notes: &str,
        draft: &str,
        kind: AnswerKind,
        recent_questions: &[String],
    ) -> Result<String, OracleError>;

    /// Opening-style question for a freshly pivoted topic, difficulty
    /// calibrated to the last score.
    async fn pivot_question(&self, ctx: &PivotContext) -> Result<String, OracleError>;

    /// 5-7 candidate subtopics for the syllabus bootstrap.
    async fn subtopics(&self, domain: &str) -> Result<Vec<String>, OracleError>;
}

/// Strict boolean parse for oracle JSON: accepts real booleans and the
/// strings "true"/"false" (any case). Anything else is malformed rather than
/// guessed at.
pub(crate) fn parse_flexible_bool(value: &Value) -> Result<bool, OracleError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(OracleError::Malformed(format!(
                "ambiguous boolean string: {other:?}"
            ))),
        },
        other => Err(OracleError::Malformed(format!(
            "expected boolean, got: {other}"
        ))),
    }
}

//! The per-turn decision engine.
//!
//! [`Engine::process_answer`] is the single entry point: given one candidate
//! answer it runs classification, scoring, momentum and the policy rules in
//! a fixed order, mutates the [`Session`], and returns exactly one
//! [`Outcome`]. The stage order is load-bearing — hesitation mercy before
//! termination checks, interceptors before any pivot rule, natural
//! completion before the momentum grace window, momentum before density —
//! and must not be rearranged.

use crate::momentum::{self, Momentum, MomentumSignal};
use crate::normalize::normalize;
use crate::oracle::{Analysis, AnswerKind, Oracle, OracleError, PivotContext};
use crate::session::{Session, TurnRecord};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// NORMAL answers scoring at or above this get an expert-level follow-up.
pub const DEEP_ESCALATION_THRESHOLD: f64 = 8.0;
/// Scores at or below this count as low for streak and density purposes.
pub const LOW_SCORE_BOUND: f64 = 1.5;
/// A topic must have at least this many questions before a non-mercy pivot.
pub const MIN_TOPIC_DEPTH: u32 = 2;
/// Consecutive strong-negative momentum readings required to force a pivot.
pub const PIVOT_GRACE_REQUIRED: u32 = 2;

const DENSITY_WINDOW: usize = 3;
const DENSITY_THRESHOLD: f64 = 0.75;
/// Natural completion (a): the last three scores must all reach this.
const NATURAL_STREAK_FLOOR: f64 = 7.0;
/// Natural completion (b): the last four scores must average this.
const NATURAL_AVG_FLOOR: f64 = 6.0;

const OPENING_HINT: &str = "Begin the interview. Ask one simple, factual, \
    introductory question about a fundamental concept in the domain, within \
    20 words. A short greeting is fine.";
const DEEP_ESCALATION_HINT: &str = "Candidate appears well-read. Ask a \
    deeper, expert-level technical follow-up. You may include a short \
    formula, a comparison, or ask for trade-offs. Do not use praise words.";

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EndReason {
    /// The topic queue ran out while a pivot condition was firing.
    SyllabusFinished,
    /// The oracle upstream is throttled or unreachable.
    UpstreamUnavailable,
    /// The classifier flagged the exchange as unsafe.
    SafetyViolation,
    /// The classifier requested termination for its own stated reason.
    Declared(String),
}

impl EndReason {
    /// The graceful closing line shown to the candidate. Raw errors never
    /// reach the transcript.
    pub fn closing_message(&self) -> &'static str {
        match self {
            EndReason::SyllabusFinished => {
                "That covers all the main topics I wanted to discuss. Thank you for your time!"
            }
            _ => "Thank you for your time. This concludes the interview.",
        }
    }
}

/// Per-turn observability data for the caller. None of this feeds back into
/// engine decisions.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    /// Effective classification, after any mercy promotion.
    pub classification: AnswerKind,
    pub summary: String,
    pub notes: String,
    /// The classifier's advisory number. Never a decision input.
    pub advisory_score: f64,
    /// The scorer-derived value the policy rules actually used.
    pub score_used: Option<f64>,
    pub momentum: Option<Momentum>,
}

impl Diagnostics {
    fn from_analysis(analysis: &Analysis, kind: AnswerKind) -> Self {
        Self {
            classification: kind,
            summary: analysis.summary.clone(),
            notes: analysis.notes.clone(),
            advisory_score: analysis.advisory_score,
            score_used: None,
            momentum: None,
        }
    }
}

/// The single result of one processed turn.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The interview goes on. A topic pivot is not a distinct outcome: it
    /// also continues, with `current_topic` already switched.
    Continue {
        next_question: String,
        diagnostics: Diagnostics,
    },
    Terminated {
        reason: EndReason,
        diagnostics: Option<Diagnostics>,
    },
}

/// Drives one interview session against an injected oracle.
pub struct Engine {
    oracle: Arc<dyn Oracle>,
}

impl Engine {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    /// Generates the opening question of the interview.
    ///
    /// Seeds the transcript and `last_question` but does not count toward
    /// topic depth; only questions produced by answer processing do.
    pub async fn open(&self, session: &mut Session) -> Result<String, OracleError> {
        let text = self
            .oracle
            .freeform(&session.domain, &session.history, OPENING_HINT)
            .await?;
        let question = normalize(&text);
        info!(topic = %session.current_topic, "opening question generated");
        session
            .history
            .push(TurnRecord::assistant(question.clone()));
        session.last_question = question.clone();
        Ok(question)
    }

    /// Processes one candidate answer and decides the next move.
    pub async fn process_answer(&self, session: &mut Session, answer: &str) -> Outcome {
        session.history.push(TurnRecord::user(answer));
        let recent_questions = session.recent_assistant_questions(2);

        // Stage: classify. Malformed responses recover to a neutral default;
        // an unavailable upstream ends the session before any counter moves.
        let analysis = match self
            .oracle
            .classify(&session.last_question, answer, &recent_questions)
            .await
        {
            Ok(analysis) => analysis,
            Err(OracleError::Unavailable(msg)) => {
                warn!(%msg, "classifier unavailable, terminating");
                return Outcome::Terminated {
                    reason: EndReason::UpstreamUnavailable,
                    diagnostics: None,
                };
            }
            Err(OracleError::Malformed(msg)) => {
                warn!(%msg, "classifier response malformed, using fallback analysis");
                Analysis::fallback()
            }
        };

        // Stage: hesitation streak and mercy promotion. Two hesitations in a
        // row are treated as an admitted knowledge gap for the rest of the
        // turn.
        let mut kind = analysis.kind;
        if kind == AnswerKind::Hesitation {
            session.hesitation_streak += 1;
        } else {
            session.hesitation_streak = 0;
        }
        if session.hesitation_streak >= 2 && kind == AnswerKind::Hesitation {
            info!("consecutive hesitations promoted to knowledge gap");
            kind = AnswerKind::KnowledgeGap;
        }

        let mut diagnostics = Diagnostics::from_analysis(&analysis, kind);

        // Stage: oracle-declared termination outranks everything.
        if analysis.terminate {
            let reason = if analysis.safety_violation {
                EndReason::SafetyViolation
            } else {
                EndReason::Declared(
                    analysis
                        .termination_reason
                        .clone()
                        .unwrap_or_else(|| "Candidate refusal.".to_string()),
                )
            };
            info!(?reason, "classifier requested termination");
            return Outcome::Terminated {
                reason,
                diagnostics: Some(diagnostics),
            };
        }

        // Stage: knowledge-gap fast path, else the dedicated scorer. The
        // classifier's advisory number is never substituted for a failed
        // scorer result.
        let mut topic_complete = kind == AnswerKind::KnowledgeGap;
        let score = if kind == AnswerKind::KnowledgeGap {
            info!("knowledge gap: skipping scorer, forcing mercy pivot");
            0.0
        } else {
            match self.oracle.score(&session.last_question, answer).await {
                Ok(result) => (result.score.clamp(0.0, 10.0) * 10.0).round() / 10.0,
                Err(OracleError::Unavailable(msg)) => {
                    warn!(%msg, "scorer unavailable, terminating");
                    return Outcome::Terminated {
                        reason: EndReason::UpstreamUnavailable,
                        diagnostics: Some(diagnostics),
                    };
                }
                Err(OracleError::Malformed(msg)) => {
                    let fallback = session.recent_scores.last().copied().unwrap_or(0.0);
                    warn!(%msg, fallback, "scorer response malformed, falling back");
                    fallback
                }
            }
        };
        diagnostics.score_used = Some(score);

        session.push_score(score);
        let momentum = momentum::compute(
            &session.recent_scores,
            session.momentum_divisor,
            session.momentum_weight,
        );
        diagnostics.momentum = Some(momentum);
        debug!(
            raw = momentum.raw,
            norm = momentum.norm,
            weighted = momentum.weighted,
            signal = ?momentum.signal,
            "momentum computed"
        );

        // Observability only; no rule branches on this streak.
        if score <= LOW_SCORE_BOUND {
            session.low_score_streak += 1;
            debug!(streak = session.low_score_streak, "low score streak");
        } else {
            session.low_score_streak = 0;
        }

        let density_trigger = low_score_density(&session.recent_scores);

        // Stage: behavioral interceptors. When one fires, the expert
        // capability answers immediately and every pivot rule below is
        // skipped this turn.
        let mut next_question: Option<String> = None;
        let intercept_hint = match kind {
            AnswerKind::EvasiveNonAnswer => Some(format!(
                "The candidate is stalling ({answer:?}). Politely but firmly, re-ask \
                 the last question: {:?}",
                session.last_question
            )),
            AnswerKind::EvasiveChallenge => Some(format!(
                "The candidate is challenging ({answer:?}). Politely restate your role \
                 as the interviewer, then re-ask the last question: {:?}",
                session.last_question
            )),
            AnswerKind::Hesitation => Some(format!(
                "Candidate hesitated on '{}'. Ask a short, simple clarifying question \
                 (12 words or fewer).",
                session.current_topic
            )),
            _ => None,
        };
        if let Some(hint) = intercept_hint {
            info!(kind = kind.tag(), "behavioral interceptor fired");
            let text = match self
                .oracle
                .freeform(&session.domain, &session.history, &hint)
                .await
            {
                Ok(text) => text,
                Err(err) => match self.recover_generation(err, &analysis, &diagnostics) {
                    Ok(text) => text,
                    Err(outcome) => return outcome,
                },
            };
            next_question = Some(text);
        }
        let intercepted = next_question.is_some();

        // Stage: natural topic completion, suppressed below the depth floor.
        if !intercepted
            && !matches!(kind, AnswerKind::Hesitation | AnswerKind::KnowledgeGap)
            && natural_completion(&session.recent_scores, momentum.weighted)
        {
            if session.questions_in_current_topic < MIN_TOPIC_DEPTH {
                debug!("natural completion triggered early, blocked by depth floor");
            } else {
                info!(topic = %session.current_topic, "natural topic completion");
                topic_complete = true;
            }
        }

        // Stage: momentum grace window, then density fallback. Only reached
        // when nothing above already decided the turn.
        let allow_pivot_checks = !topic_complete
            && !intercepted
            && !matches!(kind, AnswerKind::Hesitation | AnswerKind::KnowledgeGap);
        if allow_pivot_checks {
            if momentum.signal == MomentumSignal::StrongNegative {
                if session.pivot_grace_counter < PIVOT_GRACE_REQUIRED - 1 {
                    session.pivot_grace_counter += 1;
                    info!(
                        grace = session.pivot_grace_counter,
                        required = PIVOT_GRACE_REQUIRED,
                        "strong negative momentum, deferring pivot"
                    );
                } else {
                    info!("strong negative momentum past grace window, pivoting");
                    topic_complete = true;
                    session.low_score_streak = 0;
                    session.pivot_grace_counter = 0;
                }
            } else {
                // Any recovery breaks the consecutive requirement.
                session.pivot_grace_counter = 0;
            }

            if density_trigger && kind != AnswerKind::EvasiveNonAnswer {
                info!("low-score density trigger, pivoting");
                topic_complete = true;
                session.low_score_streak = 0;
                session.pivot_grace_counter = 0;
            }
        }

        // Stage: pivot execution.
        if topic_complete {
            // The mercy pivot is the only one exempt from the depth floor.
            if kind != AnswerKind::KnowledgeGap
                && session.questions_in_current_topic < MIN_TOPIC_DEPTH
            {
                info!("pivot blocked by depth floor, stalling on current question");
                return Outcome::Continue {
                    next_question: session.last_question.clone(),
                    diagnostics,
                };
            }
            session.low_score_streak = 0;

            let Some(new_topic) = session.pivot() else {
                info!("syllabus exhausted, ending interview");
                return Outcome::Terminated {
                    reason: EndReason::SyllabusFinished,
                    diagnostics: Some(diagnostics),
                };
            };
            let new_topic = new_topic.to_string();
            info!(topic = %new_topic, "pivoting to next topic");

            let ctx = PivotContext {
                new_topic,
                last_answer: answer.to_string(),
                score,
                kind,
                notes: analysis.notes.clone(),
                recent_questions,
            };
            let text = match self.oracle.pivot_question(&ctx).await {
                Ok(text) => text,
                Err(err) => match self.recover_generation(err, &analysis, &diagnostics) {
                    Ok(text) => text,
                    Err(outcome) => return outcome,
                },
            };
            next_question = Some(text);
        } else if next_question.is_none() {
            // Stage: default path. Strong NORMAL answers escalate straight
            // to an expert question; everything else runs the triage draft
            // through the refiner, with the expert capability as fallback.
            if kind == AnswerKind::Normal && score >= DEEP_ESCALATION_THRESHOLD {
                info!(score, "strong answer, escalating to expert follow-up");
                let text = match self
                    .oracle
                    .freeform(&session.domain, &session.history, DEEP_ESCALATION_HINT)
                    .await
                {
                    Ok(text) => text,
                    Err(err) => match self.recover_generation(err, &analysis, &diagnostics) {
                        Ok(text) => text,
                        Err(outcome) => return outcome,
                    },
                };
                next_question = Some(text);
            } else {
                let draft = self
                    .oracle
                    .draft_followup(&session.current_topic, &session.history)
                    .await;
                let text = match draft {
                    Some(draft) => {
                        debug!(%draft, "refining triage draft");
                        self.oracle
                            .refine(answer, &analysis.notes, &draft, kind, &recent_questions)
                            .await
                    }
                    None => {
                        debug!("triage draft unavailable, using expert fallback");
                        let hint = format!(
                            "Candidate's score was {score} and the triage draft was \
                             unavailable. Use this hint: {}",
                            analysis.suggested_followup
                        );
                        self.oracle
                            .freeform(&session.domain, &session.history, &hint)
                            .await
                    }
                };
                let text = match text {
                    Ok(text) => text,
                    Err(err) => match self.recover_generation(err, &analysis, &diagnostics) {
                        Ok(text) => text,
                        Err(outcome) => return outcome,
                    },
                };
                next_question = Some(text);
            }
        }

        // Stage: normalize and commit.
        let question = normalize(next_question.as_deref().unwrap_or_default());
        session.ask(question.clone());
        Outcome::Continue {
            next_question: question,
            diagnostics,
        }
    }

    /// Recovery for failed question generation: an unavailable upstream ends
    /// the session; a malformed generation falls back to the classifier's
    /// suggested follow-up, which is committed like any other question.
    fn recover_generation(
        &self,
        err: OracleError,
        analysis: &Analysis,
        diagnostics: &Diagnostics,
    ) -> Result<String, Outcome> {
        match err {
            OracleError::Unavailable(msg) => {
                warn!(%msg, "question generation unavailable, terminating");
                Err(Outcome::Terminated {
                    reason: EndReason::UpstreamUnavailable,
                    diagnostics: Some(diagnostics.clone()),
                })
            }
            OracleError::Malformed(msg) => {
                warn!(%msg, "question generation malformed, using suggested follow-up");
                Ok(analysis.suggested_followup.clone())
            }
        }
    }
}

/// True when the density window is full and at least 75% of it is low.
fn low_score_density(scores: &[f64]) -> bool {
    if scores.len() < DENSITY_WINDOW {
        return false;
    }
    let window = &scores[scores.len() - DENSITY_WINDOW..];
    let low = window.iter().filter(|s| **s <= LOW_SCORE_BOUND).count();
    low as f64 / DENSITY_WINDOW as f64 >= DENSITY_THRESHOLD
}

/// Natural completion: three straight strong scores, or four recent scores
/// with a solid average — either way only while momentum is not declining.
fn natural_completion(scores: &[f64], weighted_momentum: f64) -> bool {
    if weighted_momentum < 0.0 {
        return false;
    }
    if scores.len() >= 3 && scores[scores.len() - 3..].iter().all(|s| *s >= NATURAL_STREAK_FLOOR) {
        return true;
    }
    if scores.len() >= 4 {
        let last4 = &scores[scores.len() - 4..];
        return last4.iter().sum::<f64>() / 4.0 >= NATURAL_AVG_FLOOR;
    }
    false
}

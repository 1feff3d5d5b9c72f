//! Client for the remote triage model.
//!
//! A small fine-tuned model behind a plain HTTP endpoint drafts cheap
//! follow-up questions; the main oracle only refines them. Everything here
//! is best effort — any transport failure, an unhealthy backend, or a
//! low-confidence draft simply yields `None` and the engine falls back to
//! the expert capability.

use crate::prompts;
use crate::session::TurnRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Sentinel the triage model emits instead of a question it is unsure of.
pub const CONFIDENCE_LOW: &str = "[CONFIDENCE_LOW]";

const HESITATION_TOKENS: &[&str] = &["umm", "ummm", "uh", "uhh", "hmm", "er", "ah", "uhm"];
const FILLERS: &[&str] = &[
    "umm", "ummm", "uh", "uhh", "hmm", "er", "ah", "like", "uhm",
];

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z']+").unwrap());

#[derive(Serialize)]
struct TriageRequest<'a> {
    topic: &'a str,
    conversation_history: &'a [TurnRecord],
    system_prompt: String,
}

#[derive(Deserialize)]
struct TriageResponse {
    success: bool,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct HealthResponse {
    #[serde(default)]
    model_loaded: bool,
}

/// HTTP client for the triage draft endpoint.
#[derive(Debug, Clone)]
pub struct TriageClient {
    http: reqwest::Client,
    endpoint: String,
}

impl TriageClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Probes the backend's health endpoint. Used once at startup to decide
    /// whether the fusion path is worth attempting at all.
    pub async fn healthy(&self) -> bool {
        let url = format!("{}/health", self.endpoint);
        match self.http.get(&url).timeout(Duration::from_secs(5)).send().await {
            Ok(response) => response
                .json::<HealthResponse>()
                .await
                .map(|h| h.model_loaded)
                .unwrap_or(false),
            Err(err) => {
                warn!(%err, "triage health probe failed");
                false
            }
        }
    }

    /// Requests a draft follow-up question for the current topic.
    pub async fn draft(&self, topic: &str, history: &[TurnRecord]) -> Option<String> {
        let request = TriageRequest {
            topic,
            conversation_history: history,
            system_prompt: prompts::TRIAGE.replace("{topic}", topic),
        };
        let url = format!("{}/triage", self.endpoint);
        let response = match self
            .http
            .post(&url)
            .json(&request)
            .timeout(Duration::from_secs(15))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "triage request failed");
                return None;
            }
        };

        let body: TriageResponse = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                warn!(%err, "triage response was not valid JSON");
                return None;
            }
        };
        if !body.success {
            return None;
        }
        let text = body.text?;
        let vetted = vet_draft(&text);
        match &vetted {
            Some(draft) => debug!(%draft, "triage draft accepted"),
            None => debug!("triage draft rejected or low confidence"),
        }
        vetted
    }
}

/// Post-validates a triage draft: the low-confidence sentinel, hesitation
/// tokens, and drafts with fewer than 3 meaningful words are all rejected.
pub(crate) fn vet_draft(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() || text.contains(CONFIDENCE_LOW) {
        return None;
    }
    let lower = text.to_lowercase();
    // Hesitation tokens are matched as whole words so that "server" does
    // not trip over "er"; an ellipsis anywhere is trailing-off.
    if lower.contains("...")
        || WORD
            .find_iter(&lower)
            .any(|m| HESITATION_TOKENS.contains(&m.as_str()))
    {
        return None;
    }
    if meaningful_word_count(text) < 3 {
        return None;
    }
    Some(text.to_string())
}

/// Counts words after dropping common fillers and single letters.
fn meaningful_word_count(text: &str) -> usize {
    let lower = text.to_lowercase();
    WORD.find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|token| !FILLERS.contains(token) && token.len() > 1)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meaningful_word_count_ignores_fillers() {
        assert_eq!(meaningful_word_count("umm like uh"), 0);
        assert_eq!(meaningful_word_count("what is a socket"), 3);
        assert_eq!(meaningful_word_count("I a x"), 0);
    }

    #[test]
    fn test_vet_draft_accepts_a_real_question() {
        assert_eq!(
            vet_draft("What does DNS resolve?"),
            Some("What does DNS resolve?".to_string())
        );
    }

    #[test]
    fn test_vet_draft_rejects_low_confidence_sentinel() {
        assert_eq!(vet_draft(CONFIDENCE_LOW), None);
        assert_eq!(vet_draft("maybe [CONFIDENCE_LOW] maybe"), None);
    }

    #[test]
    fn test_vet_draft_matches_hesitation_tokens_as_words() {
        assert!(vet_draft("What load balances a web server?").is_some());
        assert_eq!(vet_draft("er, what balances a web server?"), None);
    }

    #[test]
    fn test_vet_draft_rejects_hesitation_and_short_drafts() {
        assert_eq!(vet_draft("umm what is tcp"), None);
        assert_eq!(vet_draft("so..."), None);
        assert_eq!(vet_draft("ok?"), None);
        assert_eq!(vet_draft(""), None);
    }
}

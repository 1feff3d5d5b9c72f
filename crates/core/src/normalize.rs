//! Deterministic cleanup of oracle-produced question text.
//!
//! Every question the engine emits goes through [`normalize`] first, so the
//! candidate never sees semicolons, robotic transition cliches, or a
//! three-sentence lecture where a question should be.

use regex::Regex;
use std::sync::LazyLock;

/// Robotic transition phrases that are removed from output wholesale and
/// banned in generation prompts.
pub const FORBIDDEN_TRANSITIONS: &[&str] = &[
    "let's switch gears",
    "pivoting to a new topic",
    "understood, let's move on",
    "let's shift gears",
    "let's move on",
    "let's continue to",
    "let's change topic",
    "switching gears",
    "pivoting",
];

static MULTI_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static WHITESPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([?.!,])").unwrap());
static PUNCT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([?.!,]){2,}").unwrap());
static QUESTION_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(what|why|how|when|which|describe|explain|tell)\b").unwrap()
});
static LEADING_STRAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\s.,;:]+").unwrap());
// Trailing cleanup keeps terminal `.?!` so normalization is stable when
// applied twice.
static TRAILING_STRAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s,;:]+$").unwrap());
static FORBIDDEN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    FORBIDDEN_TRANSITIONS
        .iter()
        .map(|phrase| Regex::new(&format!("(?i){}", regex::escape(phrase))).unwrap())
        .collect()
});

/// Shapes raw oracle text into a clean question of at most two sentences.
///
/// The transformation order matters: phrase substitution happens before
/// whitespace collapse, and the two-sentence cut keeps the *last* two
/// sentences so a trailing question survives over any preamble.
pub fn normalize(text: &str) -> String {
    let text = text.trim().trim_matches(['"', '\'']);
    if text.is_empty() {
        return String::new();
    }

    // Swap a few canned formal connectors for conversational ones.
    let mut text = text
        .replace("Therefore,", "So,")
        .replace("Moreover,", "Also,")
        .replace("In conclusion,", "Ultimately,");

    text = text.replace(';', ",");

    for pattern in FORBIDDEN_PATTERNS.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }

    text = MULTI_WHITESPACE.replace_all(&text, " ").into_owned();
    text = WHITESPACE_BEFORE_PUNCT
        .replace_all(&text, "$1")
        .into_owned();
    text = PUNCT_RUN.replace_all(&text, "$1").into_owned();
    text = text.trim().to_string();

    if !text.ends_with(['.', '?', '!', '"', '\'']) {
        if QUESTION_WORD.is_match(&text) {
            text.push('?');
        } else {
            text.push('.');
        }
    }

    let mut sentences = split_sentences(&text);
    if sentences.len() > 2 {
        sentences = sentences.split_off(sentences.len() - 2);
    }

    let joined = sentences.join(" ");
    let stripped = LEADING_STRAY.replace(&joined, "");
    let result = TRAILING_STRAY.replace(&stripped, "").into_owned();

    if result.is_empty() {
        // Degenerate input (e.g. a bare forbidden phrase): keep the
        // non-empty-in, non-empty-out contract.
        return ".".to_string();
    }
    result
}

/// Splits on sentence-ending punctuation followed by whitespace.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            sentences.push(current.trim().to_string());
            current.clear();
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_input_is_unchanged() {
        let q = "Alright, another angle. What is the role of ARP in a local network?";
        assert_eq!(normalize(q), q);
    }

    #[test]
    fn test_idempotent_on_normalized_output() {
        let inputs = [
            "Therefore,  we should ask ;; what is TCP??",
            "\"How does DNS resolution work ?\"",
            "Let's move on. Explain subnet masks",
            "One. Two. Three. What is NAT?",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_semicolons_become_commas() {
        let out = normalize("First part; second part; what is a VLAN");
        assert!(!out.contains(';'));
        assert!(out.contains(','));
    }

    #[test]
    fn test_forbidden_phrases_removed_case_insensitively() {
        let out = normalize("Understood, LET'S MOVE ON. What is a socket?");
        for phrase in FORBIDDEN_TRANSITIONS {
            assert!(
                !out.to_lowercase().contains(phrase),
                "output {out:?} still contains {phrase:?}"
            );
        }
        assert!(out.contains("What is a socket?"));
    }

    #[test]
    fn test_formal_connectors_replaced() {
        assert_eq!(
            normalize("Therefore, describe a three-way handshake"),
            "So, describe a three-way handshake?"
        );
        assert_eq!(normalize("Moreover, B follows A."), "Also, B follows A.");
    }

    #[test]
    fn test_question_word_gets_question_mark() {
        assert_eq!(normalize("explain routing tables"), "explain routing tables?");
        assert_eq!(normalize("Routing is next"), "Routing is next.");
    }

    #[test]
    fn test_keeps_only_last_two_sentences() {
        let out = normalize("Preamble one. Preamble two. Good segue. What is ICMP used for?");
        assert_eq!(out, "Good segue. What is ICMP used for?");
    }

    #[test]
    fn test_sentence_count_never_exceeds_two() {
        let out = normalize("A. B. C. D. E. How many hops?");
        assert!(split_sentences(&out).len() <= 2);
    }

    #[test]
    fn test_punctuation_runs_collapse() {
        assert_eq!(normalize("What is BGP???"), "What is BGP?");
        assert_eq!(normalize("Wait ... what is BGP ?"), "Wait. what is BGP?");
    }

    #[test]
    fn test_surrounding_quotes_stripped() {
        assert_eq!(normalize("\"What is a MAC address?\""), "What is a MAC address?");
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_nonempty_input_yields_nonempty_output() {
        assert!(!normalize("pivoting").is_empty());
    }
}

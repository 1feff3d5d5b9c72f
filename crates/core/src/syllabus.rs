//! One-shot syllabus bootstrap.
//!
//! Produces the [`Session`] for a new interview: the domain itself is always
//! the opening topic, and the oracle-generated subtopics wait in the queue
//! in shuffled order.

use crate::oracle::{Oracle, OracleError};
use crate::session::Session;
use rand::seq::SliceRandom;
use tracing::{info, warn};

/// Builds the interview session for `domain`.
///
/// A malformed or empty subtopic list degrades to a single-topic interview;
/// only an unavailable upstream is surfaced, since the interview cannot
/// start at all in that case.
pub async fn bootstrap(oracle: &dyn Oracle, domain: &str) -> Result<Session, OracleError> {
    match oracle.subtopics(domain).await {
        Ok(mut topics) if !topics.is_empty() => {
            topics.shuffle(&mut rand::rng());
            info!(first = %domain, queued = topics.len(), "syllabus generated");
            Ok(Session::new(domain, domain, topics))
        }
        Ok(_) => {
            warn!("syllabus came back empty, running a single-topic interview");
            Ok(Session::new(domain, domain, []))
        }
        Err(err @ OracleError::Unavailable(_)) => Err(err),
        Err(OracleError::Malformed(msg)) => {
            warn!(%msg, "syllabus generation failed, running a single-topic interview");
            Ok(Session::new(domain, domain, []))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockOracle;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_domain_is_always_the_first_topic() {
        let mut oracle = MockOracle::new();
        oracle.expect_subtopics().returning(|_| {
            Ok(vec![
                "Routing".to_string(),
                "DNS".to_string(),
                "TCP vs UDP".to_string(),
                "Subnetting".to_string(),
                "TLS".to_string(),
            ])
        });

        let session = bootstrap(&oracle, "Networking").await.unwrap();
        assert_eq!(session.current_topic, "Networking");
        assert_eq!(session.domain, "Networking");
        assert_eq!(session.questions_in_current_topic, 0);

        // Shuffled, but nothing lost and nothing invented.
        let queued: HashSet<_> = session.topic_queue.iter().cloned().collect();
        let expected: HashSet<_> = ["Routing", "DNS", "TCP vs UDP", "Subnetting", "TLS"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(queued, expected);
    }

    #[tokio::test]
    async fn test_malformed_subtopics_fall_back_to_single_topic() {
        let mut oracle = MockOracle::new();
        oracle
            .expect_subtopics()
            .returning(|_| Err(OracleError::Malformed("not a list".to_string())));

        let session = bootstrap(&oracle, "Databases").await.unwrap();
        assert_eq!(session.current_topic, "Databases");
        assert!(session.topic_queue.is_empty());
    }

    #[tokio::test]
    async fn test_empty_subtopics_fall_back_to_single_topic() {
        let mut oracle = MockOracle::new();
        oracle.expect_subtopics().returning(|_| Ok(Vec::new()));

        let session = bootstrap(&oracle, "Databases").await.unwrap();
        assert!(session.topic_queue.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_upstream_is_surfaced() {
        let mut oracle = MockOracle::new();
        oracle
            .expect_subtopics()
            .returning(|_| Err(OracleError::Unavailable("429".to_string())));

        let err = bootstrap(&oracle, "Databases").await.unwrap_err();
        assert!(matches!(err, OracleError::Unavailable(_)));
    }
}

//! `Oracle` implementation backed by any OpenAI-compatible chat API.
//!
//! In production this points at Google's OpenAI-compatible endpoint with a
//! Gemini flash model, but nothing here is provider-specific. Structured
//! capabilities (classification, scoring, syllabus) request JSON output and
//! parse it strictly; transport failures surface as
//! [`OracleError::Unavailable`], unparseable payloads as
//! [`OracleError::Malformed`] for the engine to recover from.

use crate::oracle::{
    parse_flexible_bool, Analysis, AnswerKind, Oracle, OracleError, PivotContext, ScoreResult,
};
use crate::prompts;
use crate::session::{Role, TurnRecord};
use crate::triage::TriageClient;
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Oracle backed by an OpenAI-compatible chat completion API, with an
/// optional remote triage model for cheap draft questions.
pub struct LlmOracle {
    client: Client<OpenAIConfig>,
    model: String,
    triage: Option<TriageClient>,
}

impl LlmOracle {
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            triage: None,
        }
    }

    /// Enables the triage fusion path.
    pub fn with_triage(mut self, triage: TriageClient) -> Self {
        self.triage = Some(triage);
        self
    }

    /// One blocking chat call: interviewer persona as system prompt, the
    /// capability's task as the user message.
    async fn chat(&self, task: String, json_mode: bool) -> Result<String, OracleError> {
        let system = prompts::INTERVIEWER_SYSTEM.replace("{forbidden}", &prompts::forbidden_list());
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(map_openai_err)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(task)
                .build()
                .map_err(map_openai_err)?
                .into(),
        ]);
        if json_mode {
            builder.response_format(ResponseFormat::JsonObject);
        }
        let request = builder.build().map_err(map_openai_err)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_err)?;
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| OracleError::Malformed("completion had no text content".to_string()))?;
        debug!(model = %self.model, chars = content.len(), "oracle call completed");
        Ok(content)
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn classify(
        &self,
        question: &str,
        answer: &str,
        recent_questions: &[String],
    ) -> Result<Analysis, OracleError> {
        let recent_json =
            serde_json::to_string(recent_questions).unwrap_or_else(|_| "[]".to_string());
        let task = prompts::ANALYZER
            .replace("{question}", question)
            .replace("{answer}", answer)
            .replace("{recent_questions_json}", &recent_json);
        let content = self.chat(task, true).await?;
        parse_analysis(&content)
    }

    async fn score(&self, question: &str, answer: &str) -> Result<ScoreResult, OracleError> {
        let task = prompts::SCORER
            .replace("{question}", question)
            .replace("{answer}", answer);
        let content = self.chat(task, true).await?;
        parse_score(&content)
    }

    async fn draft_followup(&self, topic: &str, history: &[TurnRecord]) -> Option<String> {
        self.triage.as_ref()?.draft(topic, history).await
    }

    async fn freeform(
        &self,
        domain: &str,
        history: &[TurnRecord],
        hint: &str,
    ) -> Result<String, OracleError> {
        let task = prompts::EXPERT
            .replace("{domain}", domain)
            .replace("{history}", &render_history(history))
            .replace("{hint}", hint)
            .replace("{forbidden}", &prompts::forbidden_list());
        Ok(self.chat(task, false).await?.trim().to_string())
    }

    async fn refine(
        &self,
        answer: &str,
        notes: &str,
        draft: &str,
        kind: AnswerKind,
        recent_questions: &[String],
    ) -> Result<String, OracleError> {
        let recent_json =
            serde_json::to_string(recent_questions).unwrap_or_else(|_| "[]".to_string());
        let extra_meta = format!(
            "[ANSWER_TYPE: {}] [RECENT_ASSISTANT_QS: {}]",
            kind.tag(),
            recent_json
        );
        let task = prompts::REFINER
            .replace("{user_answer}", answer)
            .replace("{analysis_notes}", notes)
            .replace("{draft}", draft)
            .replace("{extra_meta}", &extra_meta)
            .replace("{forbidden}", &prompts::forbidden_list());
        Ok(self.chat(task, false).await?.trim().to_string())
    }

    async fn pivot_question(&self, ctx: &PivotContext) -> Result<String, OracleError> {
        let recent_json =
            serde_json::to_string(&ctx.recent_questions).unwrap_or_else(|_| "[]".to_string());
        let task = prompts::PIVOT
            .replace("{topic}", &ctx.new_topic)
            .replace("{user_answer}", &ctx.last_answer)
            .replace("{score}", &format!("{:.1}", ctx.score))
            .replace("{answer_type}", ctx.kind.tag())
            .replace("{analysis_notes}", &ctx.notes)
            .replace("{recent_questions_json}", &recent_json)
            .replace("{forbidden}", &prompts::forbidden_list());
        Ok(self.chat(task, false).await?.trim().to_string())
    }

    async fn subtopics(&self, domain: &str) -> Result<Vec<String>, OracleError> {
        let task = prompts::SYLLABUS.replace("{domain}", domain);
        let content = self.chat(task, true).await?;
        parse_subtopics(&content)
    }
}

fn map_openai_err(err: OpenAIError) -> OracleError {
    OracleError::Unavailable(err.to_string())
}

/// Renders the transcript as Interviewer/Candidate lines for prompts.
fn render_history(history: &[TurnRecord]) -> String {
    history
        .iter()
        .map(|turn| match turn.role {
            Role::Assistant => format!("Interviewer: {}", turn.content),
            Role::User => format!("Candidate: {}", turn.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drops markdown code fences some models wrap JSON in.
fn strip_fences(content: &str) -> &str {
    content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[derive(Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    content_summary: String,
    /// Advisory only; lenient on type since it never drives decisions.
    #[serde(default)]
    answer_quality_score: Value,
    answer_type: String,
    #[serde(default)]
    analysis_notes: String,
    #[serde(default)]
    strategic_question: String,
    #[serde(default)]
    topic_is_complete: Value,
    #[serde(default)]
    safety_violation: Value,
    #[serde(default)]
    terminate_interview: Value,
    #[serde(default)]
    reason_for_termination: Option<String>,
}

fn parse_analysis(content: &str) -> Result<Analysis, OracleError> {
    let raw: RawAnalysis = serde_json::from_str(strip_fences(content))
        .map_err(|e| OracleError::Malformed(format!("analysis JSON: {e}")))?;
    Ok(Analysis {
        summary: raw.content_summary,
        advisory_score: raw.answer_quality_score.as_f64().unwrap_or(0.0),
        kind: AnswerKind::from_tag(&raw.answer_type)?,
        notes: raw.analysis_notes,
        suggested_followup: raw.strategic_question,
        topic_is_complete: parse_flexible_bool(&raw.topic_is_complete)?,
        safety_violation: parse_flexible_bool(&raw.safety_violation)?,
        terminate: parse_flexible_bool(&raw.terminate_interview)?,
        termination_reason: raw.reason_for_termination,
    })
}

#[derive(Deserialize)]
struct RawScore {
    score: f64,
    #[serde(default)]
    score_reason: String,
}

fn parse_score(content: &str) -> Result<ScoreResult, OracleError> {
    let raw: RawScore = serde_json::from_str(strip_fences(content))
        .map_err(|e| OracleError::Malformed(format!("score JSON: {e}")))?;
    if !(0.0..=10.0).contains(&raw.score) {
        return Err(OracleError::Malformed(format!(
            "score out of range: {}",
            raw.score
        )));
    }
    Ok(ScoreResult {
        score: (raw.score * 10.0).round() / 10.0,
        reason: raw.score_reason,
    })
}

/// Accepts either a bare JSON array of strings or an object whose first
/// array value holds the topics.
fn parse_subtopics(content: &str) -> Result<Vec<String>, OracleError> {
    let value: Value = serde_json::from_str(strip_fences(content))
        .map_err(|e| OracleError::Malformed(format!("subtopics JSON: {e}")))?;
    let array = match &value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .values()
            .find_map(|v| v.as_array())
            .ok_or_else(|| OracleError::Malformed("no topic array in response".to_string()))?,
        _ => {
            return Err(OracleError::Malformed(
                "subtopics response was neither array nor object".to_string(),
            ))
        }
    };
    Ok(array
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANALYSIS_JSON: &str = r#"{
        "content_summary": "Talked about TCP handshakes",
        "answer_quality_score": 6.5,
        "answer_type": "Vague",
        "analysis_notes": "On topic but missing the third step.",
        "strategic_question": "What happens after SYN-ACK?",
        "topic_is_complete": "false",
        "safety_violation": false,
        "terminate_interview": "False",
        "reason_for_termination": null
    }"#;

    #[test]
    fn test_parse_analysis_with_string_booleans() {
        let analysis = parse_analysis(ANALYSIS_JSON).unwrap();
        assert_eq!(analysis.kind, AnswerKind::Vague);
        assert!(!analysis.terminate);
        assert!(!analysis.topic_is_complete);
        assert_eq!(analysis.advisory_score, 6.5);
        assert_eq!(analysis.suggested_followup, "What happens after SYN-ACK?");
    }

    #[test]
    fn test_parse_analysis_strips_code_fences() {
        let fenced = format!("```json\n{ANALYSIS_JSON}\n```");
        assert!(parse_analysis(&fenced).is_ok());
    }

    #[test]
    fn test_parse_analysis_rejects_unknown_classification() {
        let bad = ANALYSIS_JSON.replace("Vague", "SOMETHING_ELSE");
        assert!(matches!(
            parse_analysis(&bad),
            Err(OracleError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_analysis_rejects_missing_answer_type() {
        assert!(parse_analysis(r#"{"analysis_notes": "x"}"#).is_err());
    }

    #[test]
    fn test_parse_analysis_rejects_ambiguous_boolean() {
        let bad = ANALYSIS_JSON.replace("\"False\"", "\"maybe\"");
        assert!(parse_analysis(&bad).is_err());
    }

    #[test]
    fn test_parse_score_rounds_to_one_decimal() {
        let result = parse_score(r#"{"score": 7.449, "score_reason": "decent"}"#).unwrap();
        assert_eq!(result.score, 7.4);
        assert_eq!(result.reason, "decent");
    }

    #[test]
    fn test_parse_score_rejects_out_of_range() {
        assert!(parse_score(r#"{"score": 11.0}"#).is_err());
        assert!(parse_score(r#"{"score": -0.5}"#).is_err());
    }

    #[test]
    fn test_parse_score_rejects_non_numeric() {
        assert!(parse_score(r#"{"score": "eight"}"#).is_err());
        assert!(parse_score("not json at all").is_err());
    }

    #[test]
    fn test_parse_subtopics_accepts_array_and_object_shapes() {
        let from_array = parse_subtopics(r#"["Routing", "DNS"]"#).unwrap();
        assert_eq!(from_array, vec!["Routing", "DNS"]);

        let from_object = parse_subtopics(r#"{"topics": ["Routing", "DNS"]}"#).unwrap();
        assert_eq!(from_object, vec!["Routing", "DNS"]);
    }

    #[test]
    fn test_parse_subtopics_rejects_scalar() {
        assert!(parse_subtopics(r#""Routing""#).is_err());
    }

    #[test]
    fn test_render_history_labels_roles() {
        let history = vec![
            TurnRecord::assistant("What is DNS?"),
            TurnRecord::user("A naming system."),
        ];
        assert_eq!(
            render_history(&history),
            "Interviewer: What is DNS?\nCandidate: A naming system."
        );
    }
}

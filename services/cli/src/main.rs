//! Terminal front-end for the interview engine.
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and CLI flags.
//! 2. Wiring the Gemini-backed oracle (plus the optional triage backend).
//! 3. Bootstrapping the syllabus and running the question/answer loop
//!    on stdin until the engine terminates the session.

mod config;

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use clap::Parser;
use config::Config;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use viva_core::{
    engine::{EndReason, Outcome},
    syllabus, Engine, LlmOracle, Oracle, TriageClient,
};

const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

#[derive(Parser, Debug)]
#[command(name = "viva", about = "Adaptive technical interviewer", version)]
struct Args {
    /// Interview domain, e.g. "Computer Networking".
    domain: String,

    /// Chat model name (overrides VIVA_MODEL).
    #[arg(long)]
    model: Option<String>,

    /// Triage backend base URL (overrides VIVA_TRIAGE_ENDPOINT).
    #[arg(long)]
    triage_endpoint: Option<String>,

    /// Skip the triage backend even if one is configured.
    #[arg(long)]
    no_triage: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let model = args.model.unwrap_or_else(|| config.model.clone());
    let triage_endpoint = if args.no_triage {
        None
    } else {
        args.triage_endpoint.or_else(|| config.triage_endpoint.clone())
    };

    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.gemini_api_key)
        .with_api_base(GEMINI_OPENAI_BASE);

    let mut oracle = LlmOracle::new(openai_config, model.clone());
    if let Some(endpoint) = triage_endpoint {
        let triage = TriageClient::new(&endpoint);
        if triage.healthy().await {
            info!(%endpoint, "triage backend online, fusion path enabled");
            oracle = oracle.with_triage(triage);
        } else {
            warn!(%endpoint, "triage backend unreachable, running without it");
        }
    }
    let oracle: Arc<dyn Oracle> = Arc::new(oracle);

    info!(domain = %args.domain, %model, "starting interview");
    // A dead upstream before the first question still gets the graceful
    // closing line, never a raw error trace.
    let mut session = match syllabus::bootstrap(oracle.as_ref(), &args.domain).await {
        Ok(session) => session,
        Err(err) => {
            warn!(%err, "could not generate the interview syllabus");
            println!(
                "\nInterviewer: {}\n",
                EndReason::UpstreamUnavailable.closing_message()
            );
            return Ok(());
        }
    };
    let engine = Engine::new(Arc::clone(&oracle));

    let opening = match engine.open(&mut session).await {
        Ok(opening) => opening,
        Err(err) => {
            warn!(%err, "could not generate the opening question");
            println!(
                "\nInterviewer: {}\n",
                EndReason::UpstreamUnavailable.closing_message()
            );
            return Ok(());
        }
    };
    println!("\nInterviewer: {opening}\n");
    let mut last_question_at = Instant::now();

    let gap = Duration::from_secs(config.question_gap_secs);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("(type your answer, or 'quit' to stop)\n");

    while let Some(line) = lines.next_line().await? {
        let answer = line.trim();
        if answer.is_empty() {
            continue;
        }
        if answer.eq_ignore_ascii_case("quit") || answer.eq_ignore_ascii_case("exit") {
            println!("\nInterviewer: Understood, we can stop here. Thank you for your time!");
            break;
        }

        let outcome = engine.process_answer(&mut session, answer).await;

        // Keep a human cadence between questions even when the model is fast.
        let elapsed = last_question_at.elapsed();
        if elapsed < gap {
            tokio::time::sleep(gap - elapsed).await;
        }

        match outcome {
            Outcome::Continue {
                next_question,
                diagnostics,
            } => {
                debug!(
                    classification = ?diagnostics.classification,
                    score = ?diagnostics.score_used,
                    momentum = ?diagnostics.momentum.as_ref().map(|m| m.signal),
                    topic = %session.current_topic,
                    "turn processed"
                );
                println!("\nInterviewer: {next_question}\n");
                last_question_at = Instant::now();
            }
            Outcome::Terminated { reason, .. } => {
                info!(?reason, "interview ended");
                println!("\nInterviewer: {}\n", reason.closing_message());
                break;
            }
        }
    }

    Ok(())
}

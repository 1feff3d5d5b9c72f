//! Decision core for an adaptive, turn-based technical interview.
//!
//! Each candidate answer flows through one pass of the [`engine::Engine`]:
//! classification, numeric scoring with fallbacks, a momentum signal over
//! recent scores, and a fixed ladder of policy triggers (mercy promotion,
//! knowledge-gap fast path, evasion interceptors, natural completion,
//! grace-windowed momentum pivots, low-score density pivots). All model
//! access goes through the [`oracle::Oracle`] trait so the policy layer can
//! be tested against mocks.

pub mod engine;
pub mod llm_oracle;
pub mod momentum;
pub mod normalize;
pub mod oracle;
pub mod prompts;
pub mod session;
pub mod syllabus;
pub mod triage;

pub use engine::{Diagnostics, EndReason, Engine, Outcome};
pub use llm_oracle::LlmOracle;
pub use momentum::{Momentum, MomentumSignal};
pub use oracle::{Analysis, AnswerKind, Oracle, OracleError, ScoreResult};
pub use session::Session;
pub use triage::TriageClient;

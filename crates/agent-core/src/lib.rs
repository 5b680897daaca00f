//! Remote judgment service contract.
//!
//! The replay engine asks an external reasoning service two kinds of
//! questions: which execution path to prefer, and what alternative code
//! could fix a failing step. Both go through [`JudgmentProvider`], which
//! returns raw text; callers extract and validate the JSON they expect and
//! treat anything else as a recoverable failure.

pub mod errors;
pub mod llm_provider;
pub mod model;
pub mod utils;

pub use errors::AgentError;
pub use llm_provider::{JudgmentProvider, OfflineJudgmentProvider, StaticJudgmentProvider};
pub use model::{ConversationRole, ConversationTurn, JudgmentPurpose, JudgmentRequest};
pub use utils::{extract_json_object, request_json};

//! Judgment service backends.

mod openai;

pub use openai::{OpenAiConfig, OpenAiJudgmentProvider};

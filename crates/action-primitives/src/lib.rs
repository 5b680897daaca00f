//! Capability contracts for the collaborators the replay engine drives.
//!
//! The engine never talks to a browser directly. It hands snippet code to a
//! [`SnippetExecutor`], natural-language instructions to a
//! [`ReasoningExecutor`], and asks a [`PageInspector`] what the page looks
//! like when something fails. Implementations are injected at construction
//! time; expected failures travel back as [`ExecOutcome`] values, not errors.

pub mod errors;
mod primitives;
pub mod types;

pub use errors::*;
pub use primitives::*;
pub use types::*;

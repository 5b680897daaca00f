//! Concrete collaborators behind the executor traits.

mod process;
mod remote;

pub use process::{variable_env_name, ProcessSnippetExecutor};
pub use remote::{RemotePageInspector, RemoteReasoningExecutor};

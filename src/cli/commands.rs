use clap::Subcommand;

use super::classify::ClassifyArgs;
use super::decide::DecideArgs;
use super::run::RunArgs;
use super::solutions::SolutionsArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Replay an intent spec with fallback and recovery
    Run(RunArgs),

    /// Choose an execution path for a set of decision signals
    Decide(DecideArgs),

    /// Classify an error message and list recovery actions
    Classify(ClassifyArgs),

    /// Inspect and move stored solutions
    Solutions(SolutionsArgs),

    /// Show version and configuration summary
    Info,
}

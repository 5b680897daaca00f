use anyhow::Result;
use clap::Args;
use self_heal::ErrorAnalysis;
use soulbrowser_core_types::{ExecutionPath, Step};

use crate::cli::context::CliContext;
use crate::cli::output::{render, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ClassifyArgs {
    /// Error message to analyse
    #[arg(long)]
    pub error: String,

    /// Name of the failing step
    #[arg(long, default_value = "step")]
    pub step: String,

    /// Retries already spent on the step
    #[arg(long)]
    pub retries: Option<u32>,

    /// Treat the step as optional (continue on failure)
    #[arg(long)]
    pub optional: bool,
}

pub async fn cmd_classify(args: ClassifyArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let step = Step::new(args.step, ExecutionPath::Snippet).continue_on_failure(args.optional);
    let session = ctx.session().await?;
    let analysis = session
        .classify(&step, &args.error, Some(args.retries.unwrap_or(0)))
        .await;
    render(output, &analysis, print_analysis)
}

fn print_analysis(analysis: &ErrorAnalysis) {
    println!("Step: {}", analysis.step_name);
    println!("Type: {}", analysis.error_type);
    println!("Severity: {}", analysis.severity);
    println!(
        "Recoverable: {}",
        if analysis.is_recoverable { "yes" } else { "no" }
    );
    println!("Root cause: {}", analysis.root_cause);
    if analysis.suggested_actions.is_empty() {
        return;
    }
    println!("Recovery actions:");
    for action in &analysis.suggested_actions {
        println!(
            "  - {} ({:.2}): {}",
            action.kind.as_str(),
            action.confidence,
            action.description
        );
    }
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use path_judge::{DecisionSignals, PathDecision};
use tokio::fs;

use crate::cli::context::CliContext;
use crate::cli::output::{render, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct DecideArgs {
    /// Decision signals (JSON, or YAML by extension); omitted fields use neutral defaults
    #[arg(long, value_name = "FILE")]
    pub signals: PathBuf,

    /// Skip the judgment service and use the scoring table only
    #[arg(long)]
    pub offline: bool,
}

pub async fn cmd_decide(args: DecideArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let data = fs::read_to_string(&args.signals)
        .await
        .with_context(|| format!("reading signals {}", args.signals.display()))?;
    let yaml = args
        .signals
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext, "yaml" | "yml"));
    let signals: DecisionSignals = if yaml {
        serde_yaml::from_str(&data)?
    } else {
        serde_json::from_str(&data)?
    };

    let session = ctx.session().await?;
    let judge = session.judge();
    let decision = if args.offline {
        judge.decide_offline(&signals)
    } else {
        judge.decide(&signals, None).await
    };
    render(output, &decision, print_decision)
}

fn print_decision(decision: &PathDecision) {
    println!("Path: {}", decision.choice);
    println!("Confidence: {:.2}", decision.confidence);
    println!("Source: {:?}", decision.source);
    if let Some(score) = decision.score {
        println!("Score: {score}");
    }
    println!("Rationale: {}", decision.rationale);
}

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use soulbrowser_core_types::{ExecutionReport, IntentSpec, Variables};
use tokio::fs;

use crate::cli::context::CliContext;
use crate::cli::output::{render, OutputFormat};
use crate::metrics::MetricsListener;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Intent spec to replay (JSON, or YAML by extension)
    #[arg(long, value_name = "FILE")]
    pub spec: PathBuf,

    /// Run-time variable (key=value), repeatable
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_variable)]
    pub vars: Vec<(String, String)>,

    /// Write the execution report as JSON
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    pub metrics: bool,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let spec = load_spec(&args.spec).await?;
    let variables: Variables = args.vars.into_iter().collect();
    let session = ctx.session().await?;
    let mut listener = MetricsListener::new(session.subscribe());

    let report = session.run(&spec, &variables).await?;

    if let Some(path) = args.report.as_ref() {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json)
            .await
            .with_context(|| format!("writing report {}", path.display()))?;
    }
    render(output, &report, print_report)?;
    if args.metrics {
        listener.drain();
        print!("{}", listener.metrics().render());
    }

    if !report.overall_success {
        bail!("execution of '{}' did not succeed", report.spec_name);
    }
    Ok(())
}

pub async fn load_spec(path: &Path) -> Result<IntentSpec> {
    let data = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading intent spec {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    let spec: IntentSpec = if is_yaml {
        serde_yaml::from_str(&data).with_context(|| format!("parsing intent spec {}", path.display()))?
    } else {
        serde_json::from_str(&data).with_context(|| format!("parsing intent spec {}", path.display()))?
    };
    Ok(spec)
}

fn parse_variable(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("variable name missing in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn print_report(report: &ExecutionReport) {
    println!("Execution: {} ({})", report.spec_name, report.execution_id);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for step in &report.steps {
        let mark = if step.success { "✓" } else { "✗" };
        let mut notes = vec![step.path_used.to_string()];
        if step.fallback_occurred {
            notes.push("fallback".to_string());
        }
        if step.attempts > 1 {
            notes.push(format!("{} attempts", step.attempts));
        }
        if let Some(by) = step.recovered_by.as_ref() {
            notes.push(format!("recovered by {by}"));
        }
        println!(
            "{mark} [{}] {} ({}) {}ms",
            step.index,
            step.name,
            notes.join(", "),
            step.duration_ms
        );
        if let Some(error) = step.error.as_ref() {
            println!("    error: {error}");
        }
    }
    println!();
    println!(
        "Result: {}{}",
        if report.overall_success { "success" } else { "failure" },
        if report.cancelled { " (cancelled)" } else { "" }
    );
    println!(
        "Paths: snippet={} reasoning={} fallbacks={}",
        report.snippet_usage_count, report.ai_usage_count, report.fallback_count
    );
    println!("Duration: {}ms", report.total_duration_ms);
    if !report.suggestions.is_empty() {
        println!("Suggestions:");
        for suggestion in &report.suggestions {
            println!("  - {suggestion}");
        }
    }
}

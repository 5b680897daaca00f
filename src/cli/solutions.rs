use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use solution_store::{ImportSummary, Solution, SolutionSnapshot, SolutionStatistics};
use tokio::fs;

use crate::cli::context::CliContext;
use crate::cli::output::{render, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct SolutionsArgs {
    #[command(subcommand)]
    pub command: SolutionsCommand,
}

#[derive(Subcommand, Clone, Debug)]
pub enum SolutionsCommand {
    /// List stored solutions, newest first
    List {
        /// Include deprecated solutions
        #[arg(long)]
        all: bool,
    },
    /// Aggregate usage statistics
    Stats,
    /// Show one solution
    Show {
        #[arg(value_name = "SOLUTION_ID")]
        id: String,
    },
    /// Write a versioned snapshot of every solution
    Export {
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
    /// Merge a snapshot; ids already present are skipped
    Import {
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
}

pub async fn cmd_solutions(args: SolutionsArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let session = ctx.session().await?;
    let store = session.store();
    match args.command {
        SolutionsCommand::List { all } => {
            let solutions: Vec<Solution> = store
                .list()
                .into_iter()
                .filter(|solution| all || !solution.deprecated)
                .collect();
            render(output, &solutions, print_list)
        }
        SolutionsCommand::Stats => render(output, &store.statistics(), print_stats),
        SolutionsCommand::Show { id } => {
            let solution = store
                .get(&id)
                .with_context(|| format!("no solution with id '{id}'"))?;
            render(output, &solution, print_solution)
        }
        SolutionsCommand::Export { out } => {
            let snapshot = store.export_snapshot();
            let json = serde_json::to_string_pretty(&snapshot)?;
            fs::write(&out, json)
                .await
                .with_context(|| format!("writing snapshot {}", out.display()))?;
            render(output, &snapshot.metadata, |metadata| {
                println!(
                    "Exported {} solutions ({} deprecated) to {}",
                    metadata.solution_count,
                    metadata.deprecated_count,
                    out.display()
                );
            })
        }
        SolutionsCommand::Import { file } => {
            let data = fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading snapshot {}", file.display()))?;
            let snapshot: SolutionSnapshot = serde_json::from_str(&data)
                .with_context(|| format!("parsing snapshot {}", file.display()))?;
            let summary = store.import_snapshot(snapshot)?;
            render(output, &summary, |summary: &ImportSummary| {
                println!(
                    "Imported {} solutions, skipped {} already present",
                    summary.imported, summary.skipped
                );
            })
        }
    }
}

fn print_list(solutions: &Vec<Solution>) {
    if solutions.is_empty() {
        println!("No solutions stored");
        return;
    }
    println!(
        "{:<36}  {:<10}  {:<16}  {:>5}  {:>6}  {}",
        "ID", "CATEGORY", "STRATEGY", "USES", "RATE", "STATUS"
    );
    for solution in solutions {
        println!(
            "{:<36}  {:<10}  {:<16}  {:>5}  {:>6.2}  {}",
            solution.id,
            solution.category.as_str(),
            solution.strategy,
            solution.usage_statistics.total_uses,
            solution.actual_success_rate,
            if solution.deprecated { "deprecated" } else { "active" }
        );
    }
}

fn print_stats(stats: &SolutionStatistics) {
    println!(
        "Solutions: {} total, {} active, {} deprecated",
        stats.total_solutions, stats.active_solutions, stats.deprecated_solutions
    );
    println!(
        "Uses: {} ({} successful, rate {:.2})",
        stats.total_uses, stats.total_successes, stats.overall_success_rate
    );
    println!(
        "Lookups: {} ({} hits, rate {:.2})",
        stats.lookups, stats.lookup_hits, stats.hit_rate
    );
    for (category, count) in &stats.by_category {
        println!("  {category}: {count}");
    }
}

fn print_solution(solution: &Solution) {
    println!("Solution {}", solution.id);
    println!("- Category: {}", solution.category);
    println!("- Strategy: {}", solution.strategy);
    println!("- Signature: {}", solution.error_signature);
    println!("- Pattern: {}", solution.error_pattern);
    println!(
        "- Confidence: {:.2} (observed success {:.2})",
        solution.confidence, solution.actual_success_rate
    );
    println!(
        "- Uses: {} ({} ok, {} failed)",
        solution.usage_statistics.total_uses,
        solution.usage_statistics.success_count,
        solution.usage_statistics.failure_count
    );
    println!("- Generation: {}", solution.generation);
    if let Some(parent) = solution.parent_id.as_ref() {
        println!("- Evolved from: {parent}");
    }
    if let Some(child) = solution.evolved_into.as_ref() {
        println!("- Evolved into: {child}");
    }
    if solution.deprecated {
        println!("- Deprecated");
    }
    if !solution.tags.is_empty() {
        println!("- Tags: {}", solution.tags.join(", "));
    }
    println!("- Code:");
    for line in solution.code.lines() {
        println!("    {line}");
    }
}

use anyhow::Result;

use super::classify::cmd_classify;
use super::decide::cmd_decide;
use super::env::CliArgs;
use super::info::cmd_info;
use super::run::cmd_run;
use super::solutions::cmd_solutions;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    let output = cli.output;
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, ctx, output).await,
        Commands::Decide(args) => cmd_decide(args, ctx, output).await,
        Commands::Classify(args) => cmd_classify(args, ctx, output).await,
        Commands::Solutions(args) => cmd_solutions(args, ctx, output).await,
        Commands::Info => cmd_info(ctx),
    }
}

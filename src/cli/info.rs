use anyhow::Result;

use crate::cli::context::CliContext;

pub fn cmd_info(ctx: &CliContext) -> Result<()> {
    let config = ctx.config();

    println!("SoulBrowser Replay Information");
    println!("==============================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", env!("BUILD_DATE"));
    println!("Git Commit: {} ({})", env!("GIT_HASH"), env!("GIT_BRANCH"));
    println!();

    println!("Configuration:");
    println!("- Config File: {}", ctx.config_path().display());
    println!(
        "- Timeouts: snippet={}ms reasoning={}ms decision={}ms",
        config.execution.snippet_timeout_ms,
        config.execution.reasoning_timeout_ms,
        config.decision.timeout_ms
    );
    println!(
        "- Recovery: max_step_retries={} history_capacity={}",
        config.recovery.max_step_retries, config.recovery.history_capacity
    );
    match config.solutions.path.as_ref() {
        Some(path) => println!("- Solution Store: {}", path.display()),
        None => println!("- Solution Store: in-memory"),
    }
    if config.llm.is_configured() {
        println!(
            "- Judgment Service: {} via {} ({} key(s))",
            config.llm.model,
            config.llm.api_base,
            config.llm.api_keys.len()
        );
    } else {
        println!("- Judgment Service: disabled (rule-based decisions only)");
    }
    if config.executors.snippet.command.is_empty() {
        println!("- Snippet Runner: not configured");
    } else {
        println!("- Snippet Runner: {}", config.executors.snippet.command.join(" "));
    }
    match config.executors.reasoning.endpoint.as_ref() {
        Some(endpoint) => println!("- Reasoning Agent: {endpoint}"),
        None => println!("- Reasoning Agent: not configured"),
    }
    println!(
        "- CI Environment: {}",
        if config.ci_environment() { "yes" } else { "no" }
    );

    Ok(())
}

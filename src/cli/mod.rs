pub mod app;
mod classify;
mod commands;
mod context;
mod decide;
mod dispatch;
mod env;
mod info;
mod output;
mod run;
pub mod runtime;
mod solutions;

pub use env::CliArgs;
pub use output::OutputFormat;

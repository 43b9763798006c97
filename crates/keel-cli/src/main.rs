//! keel CLI Application
//!
//! Command-line interface and MCP server for the keel task runner.

mod args;
mod cli;
mod mcp;
mod renderer;

use anyhow::{Context, Result};
use args::{Args, Commands};
use clap::{CommandFactory, Parser};
use cli::Cli;
use keel_core::{PlannerBuilder, Settings};
use log::info;
use mcp::{run_stdio_server, KeelMcpServer};
use renderer::TerminalRenderer;
use Commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        config,
        scratch_dir,
        no_color,
        command,
    } = Args::parse();

    let Some(command) = command else {
        Args::command().print_help()?;
        return Ok(());
    };

    let settings = Settings::load(config.as_deref()).context("Failed to load settings")?;
    let mut builder = PlannerBuilder::new().with_settings(settings);
    if let Some(dir) = scratch_dir {
        builder = builder.with_scratch_dir(dir);
    }
    let planner = builder
        .build()
        .await
        .context("Failed to initialize planner")?;

    let renderer = TerminalRenderer::new(!no_color);

    info!("keel started");

    match command {
        Plan { command } => {
            Cli::new(planner, renderer)
                .handle_plan_command(command)
                .await
        }
        Check(args) => Cli::new(planner, renderer).check(args),
        CheckOp(args) => Cli::new(planner, renderer).check_operation(args),
        Whitelist => Cli::new(planner, renderer).list_whitelist(),
        Patterns => Cli::new(planner, renderer).list_danger_patterns(),
        Report => Cli::new(planner, renderer).security_report(),
        Exec(args) => Cli::new(planner, renderer).exec(args).await,
        Code(args) => Cli::new(planner, renderer).code(args).await,
        Install(args) => Cli::new(planner, renderer).install(args).await,
        Serve => {
            info!("Starting keel MCP server");
            run_stdio_server(KeelMcpServer::new(planner))
                .await
                .context("MCP server failed")
        }
    }
}

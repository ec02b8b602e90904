//! Asistan Control - replay and inspection CLI for the assistant core
//!
//! Drives the turn pipeline offline: scripted conversations, router output
//! repair and tier decisions, all without a model or Google account.

mod replay;

use anyhow::{bail, Context, Result};
use asistan_core::decision::{Route, RouterEnum};
use asistan_core::router_validator::repair_text;
use asistan_core::tier::TierDecisionEngine;
use asistan_core::CoreConfig;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "asistanctl")]
#[command(about = "Asistan - Turkish assistant core, offline tools", long_about = None)]
#[command(version = asistan_core::VERSION)]
struct Cli {
    /// Config file (TOML); defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging (overridden by ASISTAN_LOG / RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scripted conversation through the full pipeline
    Replay {
        /// Script file (JSON): router/finalizer replies, tool fixtures, user turns
        script: PathBuf,
    },

    /// Repair and validate one raw router output
    Repair {
        /// File holding the raw router text, '-' for stdin
        file: PathBuf,
    },

    /// Show the finalizer tier chosen for an utterance
    Tier {
        /// User utterance
        text: String,

        /// Router route
        #[arg(long, default_value = "chat")]
        route: String,

        /// Planned tool (repeatable)
        #[arg(long = "tool")]
        tools: Vec<String>,

        /// Plan requires confirmation
        #[arg(long)]
        confirm: bool,
    },
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("ASISTAN_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = CoreConfig::load_or_default(cli.config.as_deref())?;
    debug!(config = ?cli.config, "config loaded");

    match cli.command {
        Commands::Replay { script } => replay::run(&script, config, cli.json),
        Commands::Repair { file } => repair(&file, cli.json),
        Commands::Tier {
            text,
            route,
            tools,
            confirm,
        } => tier(&text, &route, &tools, confirm, config, cli.json),
    }
}

fn read_input(file: &Path) -> Result<String> {
    if file.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("Failed to read stdin");
    }
    fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn repair(file: &Path, json: bool) -> Result<()> {
    let raw = read_input(file)?;
    match repair_text(&raw) {
        Ok((decision, report)) => {
            if json {
                let out = serde_json::json!({ "decision": decision, "report": report });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("route:        {}", decision.route);
                println!("intent:       {}", decision.intent_label());
                println!("tool_plan:    {}", decision.tool_plan.join(", "));
                println!("confidence:   {:.2}", decision.confidence);
                println!("valid before: {}", report.is_valid_before);
                if !report.fields_repaired.is_empty() {
                    println!("repaired:     {}", report.fields_repaired.join(", "));
                }
                if !report.missing_required.is_empty() {
                    println!("missing:      {}", report.missing_required.join(", "));
                }
            }
            Ok(())
        }
        Err(err) => bail!("Router output unusable ({}): {}", err.kind(), err),
    }
}

fn tier(
    text: &str,
    route: &str,
    tools: &[String],
    confirm: bool,
    config: CoreConfig,
    json: bool,
) -> Result<()> {
    let Some(route) = Route::from_label(route) else {
        let known: Vec<&str> = Route::ALL.iter().map(|r| r.as_str()).collect();
        bail!("Unknown route '{}' (expected one of: {})", route, known.join(", "));
    };

    let mut engine = TierDecisionEngine::new(config.tier);
    let decision = engine.decide(route, text, tools, confirm);

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        let tier = if decision.use_quality { "quality" } else { "fast" };
        println!("{} ({}, score {})", tier, decision.reason, decision.score);
    }
    Ok(())
}

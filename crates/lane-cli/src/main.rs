//! CLI binary for running and inspecting Fastfile lanes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use lane_actions::{default_registry, ActionRegistry, LocalExecutionEnvironment};
use lane_runner::LaneRunner;
use lane_script::ParsedProgram;
use lane_types::LaneError;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lane", version, about = "Runs lanes declared in a Fastfile")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the Fastfile (default: fastlane/Fastfile or Fastfile in the working directory)
    #[arg(short, long, global = true)]
    fastfile: Option<PathBuf>,

    /// Working directory for actions
    #[arg(short, long, global = true)]
    workdir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a lane
    Run {
        /// Name of the lane
        lane: String,

        /// Platform the lane runs for
        #[arg(short, long, env = "LANE_PLATFORM", default_value = "ios")]
        platform: String,

        /// Extra lane argument as key=value; the value is read as JSON when it parses
        #[arg(short, long = "arg", value_parser = parse_arg)]
        args: Vec<(String, Value)>,
    },

    /// List the lanes and hooks a Fastfile declares
    Lanes,

    /// List registered actions
    Actions,

    /// Show the options of an action
    Action {
        /// Action name
        name: String,
    },

    /// Compile the Fastfile without running anything
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let workdir = match cli.workdir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine the working directory")?,
    };
    let registry = default_registry();

    match cli.command {
        Commands::Run {
            lane,
            platform,
            args,
        } => {
            let program = load_program(cli.fastfile.as_deref(), &workdir)?;
            let ok = cmd_run(registry, &program, &workdir, &lane, &platform, args).await?;
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Lanes => {
            let program = load_program(cli.fastfile.as_deref(), &workdir)?;
            cmd_lanes(&program);
        }
        Commands::Actions => cmd_actions(&registry),
        Commands::Action { name } => cmd_action(&registry, &name)?,
        Commands::Check => {
            let program = load_program(cli.fastfile.as_deref(), &workdir)?;
            println!("Fastfile is valid ({} lanes)", program.lanes.len());
        }
    }

    Ok(())
}

/// `key=value`; the value is JSON if it parses, otherwise a plain string.
fn parse_arg(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn load_program(fastfile: Option<&Path>, workdir: &Path) -> anyhow::Result<ParsedProgram> {
    let path = match fastfile {
        Some(path) => path.to_path_buf(),
        None => lane_script::find_fastfile(workdir).ok_or_else(|| LaneError::ScriptNotFound {
            path: workdir.join(lane_script::FASTFILE_LOCATIONS[0]).display().to_string(),
        })?,
    };
    tracing::debug!(path = %path.display(), "loading Fastfile");
    Ok(lane_script::load(&path)?)
}

async fn cmd_run(
    registry: ActionRegistry,
    program: &ParsedProgram,
    workdir: &Path,
    lane: &str,
    platform: &str,
    args: Vec<(String, Value)>,
) -> anyhow::Result<bool> {
    let runner = LaneRunner::new(Arc::new(registry))
        .with_host(Arc::new(LocalExecutionEnvironment::new(workdir)));
    let args: HashMap<String, Value> = args.into_iter().collect();

    let result = runner.run_lane(program, lane, platform, args).await?;

    if result.success {
        println!("Lane '{}' finished successfully", result.lane);
        let mut keys: Vec<_> = result.shared_values.keys().collect();
        keys.sort();
        for key in keys {
            println!("  {key} = {}", result.shared_values[key]);
        }
        return Ok(true);
    }

    if let Some(error) = &result.error {
        eprintln!("Lane '{}' failed: {error}", result.lane);
    }
    if let Some(error) = &result.handler_error {
        eprintln!("The error handler also failed: {error}");
    }
    Ok(false)
}

fn cmd_lanes(program: &ParsedProgram) {
    for lane in &program.lanes {
        if lane.params.is_empty() {
            println!("{} ({} steps)", lane.name, lane.steps.len());
        } else {
            println!("{} |{}| ({} steps)", lane.name, lane.params.join(", "), lane.steps.len());
        }
    }
    let hooks = [
        ("before_all", program.before_all.is_some()),
        ("after_all", program.after_all.is_some()),
        ("error", program.error_handler.is_some()),
    ];
    let declared: Vec<_> = hooks.iter().filter(|(_, set)| *set).map(|(n, _)| *n).collect();
    if !declared.is_empty() {
        println!("\nHooks: {}", declared.join(", "));
    }
}

fn cmd_actions(registry: &ActionRegistry) {
    for descriptor in registry.iter() {
        println!("{:<20} {}", descriptor.name(), descriptor.description());
    }
}

fn cmd_action(registry: &ActionRegistry, name: &str) -> anyhow::Result<()> {
    let descriptor = registry.lookup(name)?;
    println!("{}: {}", descriptor.name(), descriptor.description());
    if !descriptor.authors().is_empty() {
        println!("Authors: {}", descriptor.authors().join(", "));
    }

    println!("\nOptions:");
    for item in descriptor.options() {
        let mut notes = Vec::new();
        if let Some(env) = &item.env_name {
            notes.push(format!("env {env}"));
        }
        if let Some(default) = &item.default_value {
            notes.push(format!("default {default}"));
        }
        if item.is_required() && item.default_value.is_none() {
            notes.push("required".to_string());
        }
        if !item.conflicting_options.is_empty() {
            notes.push(format!("conflicts with {}", item.conflicting_options.join(", ")));
        }
        println!("  {:<16} {}", item.key, item.description);
        if !notes.is_empty() {
            println!("  {:<16} ({})", "", notes.join("; "));
        }
    }

    if !descriptor.output_keys().is_empty() {
        println!("\nOutput:");
        for output in descriptor.output_keys() {
            println!("  {:<16} {}", output.key, output.description);
        }
    }
    Ok(())
}

// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod property;
pub mod types;
pub mod walk;

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{PlanOptions, plan_build};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - concurrent dependency discovery over every task's properties
/// - scheduling into a dispatch plan, printed to stdout
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let options = PlanOptions {
        targets: args.tasks,
        skip: args.skip,
        order_override: args.order,
    };
    info!(config = %config_path.display(), ?options, "planning");

    let plan = plan_build(&cfg, &options).await?;
    print!("{plan}");
    Ok(())
}

/// Simple dry-run output: print tasks, explicit deps and property keys.
fn print_dry_run(cfg: &ConfigFile) {
    println!("buildplan dry-run");
    println!("  config.dispatch_order = {:?}", cfg.config.dispatch_order);
    println!(
        "  config.fail_on_diagnostics = {}",
        cfg.config.fail_on_diagnostics
    );
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        if let Some(ref description) = task.description {
            println!("      description: {description}");
        }
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if !task.properties.is_empty() {
            let keys: Vec<&str> = task.properties.keys().map(String::as_str).collect();
            println!("      properties: {:?}", keys);
        }
    }

    debug!("dry-run complete (nothing walked or planned)");
}

//! `honey`: honey dispenser controller.
#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod error_fmt;
mod hw;
mod intake;
mod logging;
mod report;
mod run;
mod store;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use honey_core::DispenserError;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn load_config(path: &Path) -> eyre::Result<honey_config::Config> {
    let cfg = honey_config::load_file(path)
        .map_err(|e| eyre::Report::new(DispenserError::Config(e.to_string())))?;
    cfg.validate()
        .map_err(|e| eyre::Report::new(DispenserError::Config(e.to_string())))?;
    Ok(cfg)
}

fn real_main(cli: &Cli) -> eyre::Result<()> {
    let cfg = match load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            logging::init(cli, None);
            return Err(e);
        }
    };
    logging::init(cli, Some(&cfg.logging));
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match &cli.cmd {
        Commands::Run {
            max_runtime_ms,
            script,
            telemetry_ms,
            stats,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "Ctrl-C handler not installed");
            }
            run::run(
                cfg,
                run::RunArgs {
                    max_runtime_ms: *max_runtime_ms,
                    script: script.clone(),
                    telemetry_ms: *telemetry_ms,
                    stats: *stats,
                },
                cli.json,
                shutdown,
            )
        }
        Commands::SelfCheck => {
            let raw = hw::self_check(&cfg)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "type": "self_check", "status": "ok", "raw": raw })
                );
            } else {
                println!("self-check ok (raw reading {raw})");
            }
            Ok(())
        }
    }
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let code = match real_main(&cli) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "exiting with error");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    std::process::exit(code);
}

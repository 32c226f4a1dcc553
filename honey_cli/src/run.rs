//! `honey run`: assemble the dispenser and drive the control loop.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::WrapErr;
use honey_core::{Dispenser, DispenserError, RunOptions, Settings, runner};

use crate::store::TomlSettingsStore;
use crate::{hw, intake, report};

#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub max_runtime_ms: Option<u64>,
    pub script: Option<PathBuf>,
    pub telemetry_ms: u64,
    pub stats: bool,
}

/// Overlay settings saved by a previous run on top of `cfg`.
pub fn merge_persisted(cfg: &mut honey_config::Config) -> eyre::Result<()> {
    let Some(path) = cfg.persistence.settings_file.as_deref() else {
        return Ok(());
    };
    let path = Path::new(path);
    if !path.exists() {
        return Ok(());
    }
    let saved = honey_config::load_file(path)
        .and_then(|c| c.validate().map(|()| c))
        .map_err(|e| eyre::Report::new(DispenserError::Config(e.to_string())))
        .wrap_err_with(|| format!("load saved settings {}", path.display()))?;
    cfg.dosing = saved.dosing;
    cfg.gains = saved.gains;
    if saved.calibration.is_some() {
        cfg.calibration = saved.calibration;
    }
    tracing::info!(path = %path.display(), "loaded saved settings");
    Ok(())
}

fn operator_input(script: Option<&Path>) -> eyre::Result<Box<dyn BufRead + Send>> {
    Ok(match script {
        Some(p) => Box::new(BufReader::new(
            File::open(p).wrap_err_with(|| format!("open script {}", p.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    })
}

pub fn run(
    mut cfg: honey_config::Config,
    args: RunArgs,
    json: bool,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    merge_persisted(&mut cfg)?;
    let hw = hw::open(&cfg)?;

    let (frames_tx, frames_rx) = crossbeam_channel::bounded(256);
    let mut builder = Dispenser::builder()
        .with_load_cell(hw.load_cell)
        .with_valve(hw.valve)
        .with_control((&cfg.control).into())
        .with_timeouts((&cfg.hardware).into())
        .with_persistence((&cfg.persistence).into())
        .with_settings(Settings::from(&cfg))
        .with_cal_factor(cfg.calibration.map(|c| c.cal_factor))
        .with_telemetry(frames_tx);
    if let Some(path) = cfg.persistence.settings_file.as_deref() {
        builder = builder.with_store(TomlSettingsStore::new(PathBuf::from(path), cfg.clone()));
    }
    let mut dispenser = builder.build().wrap_err("assemble dispenser")?;

    let input = operator_input(args.script.as_deref())?;
    // Left detached: a blocking stdin read cannot be interrupted.
    intake::spawn(
        input,
        dispenser.command_sender(),
        hw.sim.clone(),
        Arc::clone(&shutdown),
    )
    .wrap_err("spawn input thread")?;
    let printer = report::spawn_printer(
        frames_rx,
        json,
        Duration::from_millis(args.telemetry_ms),
    )
    .wrap_err("spawn telemetry thread")?;

    let clock = dispenser.clock();
    let result = runner::run(
        &mut dispenser,
        &*clock,
        &shutdown,
        RunOptions {
            max_runtime: args.max_runtime_ms.map(Duration::from_millis),
        },
    );
    let done = dispenser.stats();
    drop(dispenser);
    if printer.join().is_err() {
        tracing::warn!("telemetry thread panicked");
    }

    let stats = result?;
    tracing::info!(
        completed = done.completed,
        total_dispensed_g = done.total_dispensed_g,
        ticks = stats.ticks,
        "stopped"
    );
    if args.stats {
        println!("{}", report::stats_line(&stats, json));
    }
    Ok(())
}

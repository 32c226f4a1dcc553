//! Tracing setup: console layer on stderr plus an optional JSON log file.

use std::path::Path;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, FILE_GUARD};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// `RUST_LOG` wins over `--log-level`, which wins over `[logging].level`.
fn filter(cli: &Cli, file_cfg: Option<&honey_config::Logging>) -> EnvFilter {
    if let Ok(f) = EnvFilter::try_from_default_env() {
        return f;
    }
    let level = cli
        .log_level
        .as_deref()
        .or_else(|| file_cfg.and_then(|l| l.level.as_deref()))
        .unwrap_or("info");
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn file_layer(cfg: &honey_config::Logging) -> Option<BoxedLayer> {
    let path = Path::new(cfg.file.as_deref()?);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path.file_name()?;
    let appender = match cfg.rotation.as_deref() {
        Some("daily") => tracing_appender::rolling::daily(dir, name),
        Some("hourly") => tracing_appender::rolling::hourly(dir, name),
        _ => tracing_appender::rolling::never(dir, name),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Only the first init keeps its guard; later calls are no-ops anyway.
    let _ = FILE_GUARD.set(guard);
    Some(
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .boxed(),
    )
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(cli: &Cli, file_cfg: Option<&honey_config::Logging>) {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(if cli.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    });
    if let Some(layer) = file_cfg.and_then(file_layer) {
        layers.push(layer);
    }

    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter(cli, file_cfg))
        .try_init();
}

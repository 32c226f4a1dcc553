//! Operator input: stdin or a script file, one command per line.

use std::io::BufRead;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;
use honey_core::{Command, SettingsError};
use honey_hardware::sim::SimHandle;

/// One parsed input line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatorInput {
    Command(Command),
    /// Put an empty jar on the simulated scale
    PlaceJar,
    /// Take the jar off the simulated scale
    RemoveJar,
    /// Pause the script
    Wait(Duration),
    Quit,
}

impl FromStr for OperatorInput {
    type Err = SettingsError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        match parts.next().map(str::to_ascii_lowercase).as_deref() {
            Some("place") => Ok(Self::PlaceJar),
            Some("remove") => Ok(Self::RemoveJar),
            Some("quit" | "exit") => Ok(Self::Quit),
            Some("wait") => {
                let ms = parts
                    .next()
                    .ok_or_else(|| SettingsError::MissingValue("wait".into()))?;
                ms.parse::<u64>()
                    .map(|ms| Self::Wait(Duration::from_millis(ms)))
                    .map_err(|_| SettingsError::InvalidValue {
                        name: "wait",
                        value: ms.to_string(),
                    })
            }
            _ => line.parse::<Command>().map(Self::Command),
        }
    }
}

fn with_bench(
    sim: Option<&SimHandle>,
    what: &str,
    f: impl FnOnce(&mut honey_hardware::SimBench),
) {
    let Some(sim) = sim else {
        tracing::warn!(what, "only available on the simulated bench");
        return;
    };
    match sim.lock() {
        Ok(mut bench) => f(&mut bench),
        Err(e) => tracing::warn!(error = %e, what, "bench unavailable"),
    }
}

/// Forward lines from `reader` until EOF, `quit`, or shutdown.
pub fn spawn<R>(
    reader: R,
    commands: Sender<Command>,
    sim: Option<SimHandle>,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    std::thread::Builder::new()
        .name("intake".into())
        .spawn(move || {
            for line in reader.lines() {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        tracing::warn!(error = %e, "reading operator input failed");
                        break;
                    }
                };
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                match line.parse::<OperatorInput>() {
                    Ok(OperatorInput::Command(cmd)) => {
                        if commands.send(cmd).is_err() {
                            break;
                        }
                    }
                    Ok(OperatorInput::PlaceJar) => {
                        with_bench(sim.as_ref(), "place", |b| b.place_jar());
                    }
                    Ok(OperatorInput::RemoveJar) => {
                        with_bench(sim.as_ref(), "remove", |b| b.remove_jar());
                    }
                    Ok(OperatorInput::Wait(d)) => std::thread::sleep(d),
                    Ok(OperatorInput::Quit) => {
                        shutdown.store(true, Ordering::Relaxed);
                        break;
                    }
                    Err(e) => tracing::warn!(error = %e, line, "ignoring input"),
                }
            }
            tracing::debug!("operator input closed");
        })
}

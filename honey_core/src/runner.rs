//! Fixed-period scheduler around `Dispenser::tick`.
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use eyre::WrapErr;
use honey_traits::Clock;

use crate::dispenser::Dispenser;
use crate::error::Result;
use crate::util::millis;

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    /// Ticks that started a full period or more behind schedule
    pub late_ticks: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Exit after this much wall time (None: run until shutdown)
    pub max_runtime: Option<Duration>,
}

/// Drive the dispenser at its configured period until `shutdown` is set or
/// `max_runtime` elapses.
///
/// The valve is closed on every exit path. On a tick error a best-effort
/// emergency stop runs before the error is returned.
pub fn run(
    dispenser: &mut Dispenser,
    clock: &dyn Clock,
    shutdown: &AtomicBool,
    opts: RunOptions,
) -> Result<LoopStats> {
    let period = dispenser.control().period;
    let started = clock.now();
    let mut next_due: Option<Instant> = None;
    let mut stats = LoopStats::default();
    tracing::info!(period_ms = millis(period), "control loop started");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }
        if let Some(limit) = opts.max_runtime
            && clock.is_due(started, limit)
        {
            tracing::info!(max_runtime_ms = millis(limit), "max runtime reached");
            break;
        }

        let now = clock.now();
        if let Some(due) = next_due
            && now < due
        {
            clock.sleep(due - now);
            continue;
        }

        if let Some(due) = next_due
            && now.saturating_duration_since(due) >= period
        {
            stats.late_ticks += 1;
            tracing::debug!(
                behind_ms = millis(now.saturating_duration_since(due)),
                "tick late"
            );
        }
        // Reschedule from now when behind so missed periods are not replayed
        next_due = Some(match next_due {
            Some(due) if now.saturating_duration_since(due) < period => due + period,
            _ => now + period,
        });

        if let Err(e) = dispenser.tick() {
            if let Err(stop_err) = dispenser.emergency_stop() {
                tracing::error!(error = %stop_err, "emergency stop failed after tick error");
            }
            return Err(e).wrap_err("control tick failed");
        }
        stats.ticks += 1;
    }

    dispenser.shutdown().wrap_err("closing valve on exit")?;
    tracing::info!(
        ticks = stats.ticks,
        late = stats.late_ticks,
        elapsed_ms = clock.ms_since(started),
        "control loop stopped"
    );
    Ok(stats)
}

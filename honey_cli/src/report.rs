//! Operator-facing telemetry output on stdout.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use honey_core::{LoopStats, TelemetryFrame};
use serde_json::json;

pub fn dosing_state_name(code: u8) -> &'static str {
    match code {
        1 => "detect_glass",
        2 => "start_fill",
        3 => "filling",
        _ => "idle",
    }
}

pub fn calibration_state_name(code: u8) -> &'static str {
    match code {
        1 => "await_start",
        2 => "taring",
        3 => "await_reference",
        4 => "sampling",
        _ => "ready",
    }
}

pub fn frame_line(f: &TelemetryFrame, json: bool) -> String {
    if json {
        json!({
            "type": "telemetry",
            "tick": f.tick,
            "dosing_state": dosing_state_name(f.dosing_state),
            "calibration_state": calibration_state_name(f.calibration_state),
            "actual_weight_g": f.actual_weight,
            "adjusted_weight_g": f.adjusted_weight,
            "controller_output": f.controller_output,
            "valve_position": f.valve_position,
            "completed": f.completed,
            "total_dispensed_g": f.total_dispensed_g,
        })
        .to_string()
    } else {
        format!(
            "[{:<12}] cal={:<15} scale={:>7.1} g  glass={:>6.1} g  out={:.2}  valve={:>5.1}  done={}",
            dosing_state_name(f.dosing_state),
            calibration_state_name(f.calibration_state),
            f.actual_weight,
            f.adjusted_weight,
            f.controller_output,
            f.valve_position,
            f.completed,
        )
    }
}

pub fn dose_line(f: &TelemetryFrame, dose_g: f32, json: bool) -> String {
    if json {
        json!({
            "type": "dose_complete",
            "completed": f.completed,
            "dose_g": dose_g,
            "total_dispensed_g": f.total_dispensed_g,
        })
        .to_string()
    } else {
        format!(
            "dose #{} complete: {:.1} g (total {:.1} g)",
            f.completed, dose_g, f.total_dispensed_g
        )
    }
}

pub fn stats_line(stats: &LoopStats, json: bool) -> String {
    if json {
        json!({
            "type": "loop_stats",
            "ticks": stats.ticks,
            "late_ticks": stats.late_ticks,
        })
        .to_string()
    } else {
        format!("loop: {} ticks, {} late", stats.ticks, stats.late_ticks)
    }
}

/// Print frames until every sender is gone. A frame is printed when a state
/// changes or `interval` has passed since the last line.
pub fn spawn_printer(
    frames: Receiver<TelemetryFrame>,
    json: bool,
    interval: Duration,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("telemetry".into())
        .spawn(move || {
            let mut last: Option<(TelemetryFrame, Instant)> = None;
            for frame in frames.iter() {
                let now = Instant::now();
                let print = match &last {
                    None => true,
                    Some((prev, at)) => {
                        prev.dosing_state != frame.dosing_state
                            || prev.calibration_state != frame.calibration_state
                            || now.duration_since(*at) >= interval
                    }
                };
                if let Some((prev, _)) = &last
                    && frame.completed > prev.completed
                {
                    let dose = frame.total_dispensed_g - prev.total_dispensed_g;
                    println!("{}", dose_line(&frame, dose, json));
                }
                if print {
                    println!("{}", frame_line(&frame, json));
                    last = Some((frame, now));
                } else if let Some((prev, _)) = last.as_mut() {
                    *prev = frame;
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_frame_names_states() {
        let frame = TelemetryFrame {
            tick: 7,
            dosing_state: 3,
            calibration_state: 0,
            adjusted_weight: 12.5,
            ..TelemetryFrame::default()
        };
        let v: serde_json::Value = serde_json::from_str(&frame_line(&frame, true)).unwrap();
        assert_eq!(v["type"], "telemetry");
        assert_eq!(v["dosing_state"], "filling");
        assert_eq!(v["calibration_state"], "ready");
        assert_eq!(v["tick"], 7);
        assert_eq!(v["adjusted_weight_g"], 12.5);
    }

    #[test]
    fn text_lines_are_readable() {
        let frame = TelemetryFrame {
            completed: 2,
            total_dispensed_g: 500.0,
            ..TelemetryFrame::default()
        };
        assert!(frame_line(&frame, false).starts_with("[idle"));
        assert_eq!(
            dose_line(&frame, 250.0, false),
            "dose #2 complete: 250.0 g (total 500.0 g)"
        );
        let stats = LoopStats {
            ticks: 10,
            late_ticks: 1,
        };
        assert_eq!(stats_line(&stats, false), "loop: 10 ticks, 1 late");
    }
}

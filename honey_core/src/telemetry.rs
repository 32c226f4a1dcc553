//! Per-tick telemetry frames.
use crossbeam_channel::{Sender, TrySendError};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetryFrame {
    pub tick: u64,
    pub dosing_state: u8,
    pub calibration_state: u8,
    /// Stable weight on the platform (grams)
    pub actual_weight: f32,
    /// Honey in the current glass (grams)
    pub adjusted_weight: f32,
    /// Normalized controller output
    pub controller_output: f32,
    /// Commanded servo position
    pub valve_position: f32,
    pub completed: u32,
    pub total_dispensed_g: f32,
}

/// Fire-and-forget consumer; must never block the loop.
pub trait TelemetrySink {
    fn publish(&mut self, frame: &TelemetryFrame);
}

impl TelemetrySink for Sender<TelemetryFrame> {
    fn publish(&mut self, frame: &TelemetryFrame) {
        match self.try_send(*frame) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                tracing::trace!("telemetry receiver gone");
            }
        }
    }
}

/// Discards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn publish(&mut self, _frame: &TelemetryFrame) {}
}

//! Test doubles shared by unit tests, integration tests and benches.
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use honey_traits::{HwResult, LoadCell, ValveActuator};

use crate::settings::{Settings, SettingsStore};

/// Load cell whose reading is set from the outside. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SharedLoadCell {
    raw: Arc<AtomicI32>,
    failing: Arc<AtomicBool>,
    tares: Arc<AtomicU32>,
}

impl SharedLoadCell {
    pub fn set_raw(&self, raw: i32) {
        self.raw.store(raw, Ordering::Relaxed);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn tare_count(&self) -> u32 {
        self.tares.load(Ordering::Relaxed)
    }
}

impl LoadCell for SharedLoadCell {
    fn read_raw(&mut self, _timeout: Duration) -> HwResult<i32> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(Box::new(std::io::Error::other("sensor timeout")));
        }
        Ok(self.raw.load(Ordering::Relaxed))
    }

    fn tare(&mut self) -> HwResult<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(Box::new(std::io::Error::other("sensor timeout")));
        }
        self.tares.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Valve that records every commanded position. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct RecordingValve {
    positions: Arc<Mutex<Vec<f32>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingValve {
    pub fn positions(&self) -> Vec<f32> {
        self.positions.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<f32> {
        self.positions.lock().ok().and_then(|p| p.last().copied())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

impl ValveActuator for RecordingValve {
    fn set_position(&mut self, position: f32) -> HwResult<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(Box::new(std::io::Error::other("servo not responding")));
        }
        if let Ok(mut p) = self.positions.lock() {
            p.push(position);
        }
        Ok(())
    }
}

/// Store that keeps what it was asked to persist; can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<Vec<(Settings, Option<f32>)>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn saves(&self) -> usize {
        self.saved.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn last(&self) -> Option<(Settings, Option<f32>)> {
        self.saved.lock().ok().and_then(|s| s.last().cloned())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

impl SettingsStore for MemoryStore {
    fn persist(
        &mut self,
        settings: &Settings,
        cal_factor: Option<f32>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(Box::new(std::io::Error::other("disk full")));
        }
        if let Ok(mut s) = self.saved.lock() {
            s.push((settings.clone(), cal_factor));
        }
        Ok(())
    }
}

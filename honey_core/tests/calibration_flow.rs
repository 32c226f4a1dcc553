use std::sync::Arc;

use honey_core::mocks::{MemoryStore, RecordingValve, SharedLoadCell};
use honey_core::{Calibration, Command, Dispenser, DosingState, Settings};
use honey_traits::clock::test_clock::TestClock;

const REFERENCE_G: f32 = 200.0;
const RAW0: i32 = 42_000;

struct Rig {
    d: Dispenser,
    cell: SharedLoadCell,
    valve: RecordingValve,
    clock: TestClock,
    store: MemoryStore,
}

fn rig(cal_factor: Option<f32>) -> Rig {
    rig_with(cal_factor, Settings::default())
}

fn rig_with(cal_factor: Option<f32>, settings: Settings) -> Rig {
    let cell = SharedLoadCell::default();
    let valve = RecordingValve::default();
    let clock = TestClock::new();
    let store = MemoryStore::default();
    let d = Dispenser::builder()
        .with_load_cell(cell.clone())
        .with_valve(valve.clone())
        .with_clock(Arc::new(clock.clone()))
        .with_store(store.clone())
        .with_settings(settings)
        .with_cal_factor(cal_factor)
        .build()
        .expect("build dispenser");
    Rig {
        d,
        cell,
        valve,
        clock,
        store,
    }
}

impl Rig {
    fn tick(&mut self) {
        self.clock.advance_ms(20);
        self.d.tick().expect("tick");
    }

    fn send(&self, cmd: Command) {
        self.d.command_sender().send(cmd).expect("queue command");
    }

    fn tick_until(&mut self, state: DosingState, max: usize) {
        for _ in 0..max {
            if self.d.dosing_state() == state {
                return;
            }
            self.tick();
        }
        assert_eq!(self.d.dosing_state(), state);
    }

    fn code(&self) -> u8 {
        self.d.calibration_state().code()
    }

    /// Run the routine up to `AwaitReference`.
    fn tare_and_settle(&mut self) {
        self.send(Command::Calibrate);
        self.tick();
        assert_eq!(self.code(), 2, "taring");
        // settle time is measured from the tick that started taring
        for _ in 0..49 {
            self.tick();
        }
        assert_eq!(self.code(), 2, "still settling");
        self.tick();
        assert_eq!(self.code(), 3, "awaiting reference");
    }
}

#[test]
fn calibration_round_trip_yields_reference_weight() {
    let mut r = rig(None);
    assert_eq!(r.code(), 1, "boots awaiting start without a factor");

    r.tare_and_settle();
    assert_eq!(r.cell.tare_count(), 1);

    r.cell.set_raw(RAW0);
    r.send(Command::Calibrate);
    r.tick();
    assert_eq!(r.code(), 4, "sampling");
    for _ in 0..99 {
        r.tick();
    }
    assert_eq!(r.code(), 0);

    let factor = r.d.cal_factor().expect("factor applied");
    assert!((factor - RAW0 as f32 / REFERENCE_G).abs() < 1e-3);
    let cal = Calibration::new(factor).expect("usable factor");
    assert!((cal.to_grams(RAW0) - REFERENCE_G as i32).abs() <= 1);

    // persisted immediately
    assert_eq!(r.store.last().and_then(|(_, f)| f), Some(factor));

    // live conversion uses the new factor
    r.tick();
    assert!((r.d.last_frame().actual_weight - REFERENCE_G).abs() <= 1.0);
}

#[test]
fn start_is_ignored_until_calibrated() {
    let mut r = rig(None);
    r.send(Command::Start);
    r.tick();
    assert_eq!(r.d.dosing_state(), DosingState::Idle);
}

#[test]
fn interrupted_calibration_keeps_prior_factor() {
    let mut r = rig(Some(300.0));
    assert_eq!(r.code(), 0);
    r.tare_and_settle();
    r.send(Command::Stop);
    r.tick();
    assert_eq!(r.code(), 0);
    assert_eq!(r.d.cal_factor(), Some(300.0));
    assert_eq!(r.store.saves(), 0);
}

#[test]
fn empty_reference_reading_is_rejected() {
    let mut r = rig(Some(300.0));
    r.tare_and_settle();
    // nothing placed: raw stays 0 and the factor would be 0
    r.send(Command::Calibrate);
    for _ in 0..100 {
        r.tick();
    }
    assert_eq!(r.code(), 0);
    assert_eq!(r.d.cal_factor(), Some(300.0));
}

#[test]
fn failed_tare_aborts_routine() {
    let mut r = rig(Some(300.0));
    r.cell.set_failing(true);
    r.send(Command::Calibrate);
    r.tick();
    assert_eq!(r.code(), 0);
}

#[test]
fn calibrate_is_ignored_while_dosing() {
    let mut r = rig(Some(1.0));
    r.send(Command::Start);
    r.tick();
    assert_eq!(r.d.dosing_state(), DosingState::DetectGlass);
    r.send(Command::Calibrate);
    r.tick();
    assert_eq!(r.code(), 0);
    assert_eq!(r.cell.tare_count(), 0);
}

#[test]
fn calibrate_after_auto_dose_keeps_valve_closed() {
    let mut r = rig_with(
        Some(1.0),
        Settings {
            auto_mode: true,
            ..Settings::default()
        },
    );
    // one dose to completion: 100 g glass, then 250 g of honey
    r.cell.set_raw(100);
    r.send(Command::Start);
    r.tick_until(DosingState::Filling, 30);
    r.cell.set_raw(350);
    r.tick_until(DosingState::Complete, 30);

    // empty the platform and start calibrating
    r.cell.set_raw(0);
    r.tare_and_settle();
    assert_eq!(r.d.dosing_state(), DosingState::Idle);
    for _ in 0..60 {
        r.tick();
    }
    assert_eq!(r.code(), 3);
    assert_eq!(r.d.dosing_state(), DosingState::Idle, "no auto re-arm");

    // the reference mass must not be taken for a glass
    r.cell.set_raw(200);
    r.send(Command::Calibrate);
    r.tick();
    assert_eq!(r.code(), 4);
    let before = r.valve.positions().len();
    for _ in 0..99 {
        r.tick();
    }
    assert_eq!(r.code(), 0);
    assert!(r.valve.positions()[before..].iter().all(|&p| p == 0.0));
    assert_eq!(r.d.dosing_state(), DosingState::Idle);
    assert!((r.d.cal_factor().expect("factor") - 1.0).abs() < 1e-3);
    assert_eq!(r.d.stats().completed, 1);
}

#[test]
fn stop_during_first_calibration_keeps_dosing_locked() {
    let mut r = rig(None);
    r.send(Command::Calibrate);
    r.tick();
    assert_eq!(r.code(), 2);
    r.send(Command::Stop);
    r.tick();
    assert_eq!(r.code(), 1, "back to awaiting start");

    r.send(Command::Start);
    r.tick();
    assert_eq!(r.d.dosing_state(), DosingState::Idle);
    assert_eq!(r.d.cal_factor(), None);
}

#[test]
fn rejected_first_calibration_keeps_dosing_locked() {
    let mut r = rig(None);
    r.tare_and_settle();
    // nothing placed: the derived factor would be 0
    r.send(Command::Calibrate);
    for _ in 0..100 {
        r.tick();
    }
    assert_eq!(r.code(), 1);
    assert_eq!(r.d.cal_factor(), None);

    r.send(Command::Start);
    r.tick();
    assert_eq!(r.d.dosing_state(), DosingState::Idle);
    assert_eq!(r.valve.last(), Some(0.0));
}

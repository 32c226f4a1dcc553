use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use honey_hardware::error::HwError;
use honey_hardware::util::{servo_pulse_us, wait_while};
use rstest::rstest;

#[test]
fn wait_while_returns_once_line_drops() {
    let busy = Arc::new(AtomicBool::new(true));
    let busy_bg = busy.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        busy_bg.store(false, Ordering::Relaxed);
    });

    let res = wait_while(
        || busy.load(Ordering::Relaxed),
        Duration::from_millis(200),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn wait_while_times_out_as_data_ready_timeout() {
    let err = wait_while(
        || true,
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout error");

    match err {
        HwError::DataReadyTimeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[rstest]
#[case(0.0, 500)]
#[case(90.0, 1500)]
#[case(180.0, 2500)]
#[case(-10.0, 500)]
#[case(400.0, 2500)]
#[case(f32::NAN, 500)]
fn servo_pulse_maps_degrees(#[case] deg: f32, #[case] us: u64) {
    assert_eq!(servo_pulse_us(deg), us);
}

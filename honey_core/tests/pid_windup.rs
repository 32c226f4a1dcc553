use honey_core::{Gains, PidController, PidLimits};
use proptest::prelude::*;

const DT: f32 = 0.02;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn integral_stays_in_band_while_saturated_open(
        kp in 0.1f32..5.0,
        ti in 0.05f32..20.0,
        input in -2.0f32..0.0,
    ) {
        let mut pid = PidController::new(Gains::new(kp, ti, 0.0), DT, PidLimits::default());
        pid.start();
        for _ in 0..10_000 {
            let out = pid.compute(input);
            prop_assert!((0.0..=1.0).contains(&out));
            prop_assert!((0.0..=0.5).contains(&pid.integral_term()));
        }
        prop_assert_eq!(pid.integral_term(), 0.5);
    }

    #[test]
    fn integral_stays_in_band_while_overshooting(
        kp in 0.1f32..5.0,
        ti in 0.05f32..20.0,
        input in 1.0f32..3.0,
    ) {
        let mut pid = PidController::new(Gains::new(kp, ti, 0.0), DT, PidLimits::default());
        pid.start();
        for _ in 0..10_000 {
            let out = pid.compute(input);
            prop_assert!((0.0..=1.0).contains(&out));
            prop_assert!((0.0..=0.5).contains(&pid.integral_term()));
        }
    }
}

#[test]
fn zero_ti_is_proportional_plus_derivative() {
    let mut pid = PidController::new(Gains::new(0.8, 0.0, 0.002), DT, PidLimits::default());
    pid.start();
    // e = 0.5, no derivative on first sample
    assert!((pid.compute(0.5) - 0.4).abs() < 1e-6);
    assert!((pid.compute(0.5) - 0.4).abs() < 1e-6);
    // e = 0.4: p = 0.32, d = 0.002 * (-0.1) / 0.02 = -0.01
    assert!((pid.compute(0.6) - 0.31).abs() < 1e-5);
    assert_eq!(pid.integral_term(), 0.0);
    for _ in 0..1_000 {
        assert!(pid.compute(0.6).is_finite());
    }
}

#[test]
fn restart_is_a_cold_start() {
    let mut pid = PidController::new(Gains::new(1.0, 2.0, 0.5), DT, PidLimits::default());
    pid.start();
    for _ in 0..500 {
        pid.compute(0.2);
    }
    pid.stop();
    assert_eq!(pid.output(), 0.0);
    pid.start();
    // Fresh integral and no derivative kick: p plus one integral step
    let out = pid.compute(0.9);
    let expected = 0.1 + 1.0 / 2.0 * 0.1 * DT;
    assert!((out - expected).abs() < 1e-6, "{out} vs {expected}");
}

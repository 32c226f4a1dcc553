use honey_config::{Viscosity, load_file, load_toml};
use rstest::rstest;

const MINIMAL: &str = r#"
[pins]
hx711_dt = 5
hx711_sck = 6
servo_pwm = 18
"#;

#[test]
fn minimal_config_uses_defaults_and_validates() {
    let cfg = load_toml(MINIMAL).expect("parse TOML");
    cfg.validate().expect("defaults must be valid");
    assert_eq!(cfg.control.period_ms, 20);
    assert_eq!(cfg.control.glass_debounce_ticks, 10);
    assert_eq!(cfg.control.fill_confirm_ticks, 3);
    assert_eq!(cfg.control.calibration_samples, 100);
    assert_eq!(cfg.dosing.viscosity, Viscosity::Medium);
    assert!(cfg.calibration.is_none());
}

#[test]
fn missing_pins_is_a_parse_error() {
    let err = load_toml("[dosing]\ntarget_amount_g = 100.0\n").expect_err("pins are required");
    assert!(format!("{err}").contains("pins"));
}

#[rstest]
#[case("[dosing]\ncal_reference_weight_g = 0.0", "cal_reference_weight_g must be > 0")]
#[case("[dosing]\nmin_target_g = 0.0", "min_target_g must be > 0")]
#[case("[dosing]\ntarget_amount_g = 5.0\nmin_target_g = 10.0", "target_amount_g must be within")]
#[case("[dosing]\nactuator_min = 45.0\nactuator_max = 45.0", "must differ")]
#[case("[dosing]\nactuator_max = 270.0", "actuator_max must be in [0, 180]")]
#[case("[control]\nperiod_ms = 0", "period_ms must be in [1, 1000]")]
#[case("[control]\nintegral_min = 0.6\nintegral_max = 0.5", "integral_min must be <=")]
#[case("[control]\nfill_confirm_ticks = 0", "fill_confirm_ticks must be >= 1")]
#[case("[gains]\nti = -1.0", "gains.ti must be")]
#[case("[calibration]\ncal_factor = 0.0", "cal_factor must be finite and non-zero")]
fn rejects_invalid_values(#[case] section: &str, #[case] needle: &str) {
    let toml = format!("{MINIMAL}\n{section}\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "error `{err}` does not mention `{needle}`"
    );
}

#[test]
fn viscosity_parses_snake_case() {
    let toml = format!("{MINIMAL}\n[dosing]\nviscosity = \"user_defined\"\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    assert_eq!(cfg.dosing.viscosity, Viscosity::UserDefined);
}

#[test]
fn save_then_load_keeps_calibration_and_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("honey.toml");

    let mut cfg = load_toml(MINIMAL).unwrap();
    cfg.dosing.target_amount_g = 420.0;
    cfg.dosing.auto_mode = true;
    cfg.calibration = Some(honey_config::PersistedCalibration { cal_factor: 212.5 });
    cfg.save(&path).expect("save");

    let back = load_file(&path).expect("reload");
    back.validate().expect("valid after reload");
    assert_eq!(back.dosing.target_amount_g, 420.0);
    assert!(back.dosing.auto_mode);
    assert_eq!(back.calibration.map(|c| c.cal_factor), Some(212.5));
}

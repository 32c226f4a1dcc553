#![no_main]
use libfuzzer_sys::fuzz_target;

// Operator lines come straight from stdin; parsing and applying must never panic.
fuzz_target!(|line: &str| {
    if let Ok(honey_core::Command::Set(param)) = line.parse::<honey_core::Command>() {
        let mut settings = honey_core::Settings::default();
        let _ = settings.apply(param);
    }
});

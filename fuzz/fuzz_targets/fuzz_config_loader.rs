#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    let Ok(cfg) = toml::from_str::<drive_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    // A validated config must map onto a consistent runtime config
    let control: drive_core::ControlCfg = (&cfg).into();
    let safety: drive_core::SafetyCfg = (&cfg.safety).into();
    assert!(control.drive_limit <= control.power_limit);
    assert!(safety.max_run_ms >= 1);
});

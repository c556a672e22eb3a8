#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    let Ok(cfg) = toml::from_str::<trot_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        // A valid config must resolve limits and a probe for every actuator.
        for a in &cfg.actuators {
            let (lo, hi) = cfg.limits_for(a.id).unwrap_or((0.0, 0.0));
            assert!(lo < hi, "validated limits must be ordered");
        }
        assert!(cfg.voltage_probe().is_some());
    }
});

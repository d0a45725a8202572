#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject anything, but must never panic.
    let Ok(cfg) = thermocal_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    // A config that validates must describe a usable instrument.
    let sizes = &cfg.sampling.buffer_sizes;
    assert!(!sizes.is_empty());
    assert!(sizes.iter().all(|n| n % 2 == 1));
    assert!(cfg.sampling.data_interval_ms > cfg.probe.conversion_ms);
});

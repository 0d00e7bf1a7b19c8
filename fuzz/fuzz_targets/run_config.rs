#![no_main]

use libfuzzer_sys::fuzz_target;
use regla::config::RunConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Accepted configurations must always yield trial bounds
        if let Ok(config) = RunConfig::from_toml_str(input) {
            let min = config.min_trials();
            let max = config.max_trials();
            if let (Ok(min), Ok(max)) = (min, max) {
                assert!(min <= max);
            }
        }
    }
});

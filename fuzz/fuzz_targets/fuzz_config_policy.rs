//! Fuzz target for policy.json parsing and validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rc_config::policy::Policy;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = Policy::from_json(text);
    }
    let _ = serde_json::from_slice::<Policy>(data);
});

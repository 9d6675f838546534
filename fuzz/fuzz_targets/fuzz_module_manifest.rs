//! Fuzz target for reconcile.toml module manifests.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rc_core::manifest::Manifest;

fuzz_target!(|data: &str| {
    let _ = Manifest::from_toml(data);
});

//! Fuzz target for compat.json parsing.
//!
//! Version ranges inside the table go through the Maven range parser, so
//! this also covers `VersionRange::from_str`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rc_config::compat::CompatTable;

fuzz_target!(|data: &str| {
    let _ = CompatTable::from_json(data);
    let _ = data.parse::<rc_common::VersionRange>();
});

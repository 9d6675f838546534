//! Fuzz target for build script parsing.
//!
//! `parse_document` must reject malformed scripts with an error, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = rc_parse::parse_document("fuzz.gradle.kts", data);
});

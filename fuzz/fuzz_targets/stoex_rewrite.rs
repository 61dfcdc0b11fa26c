#![no_main]

use libfuzzer_sys::fuzz_target;
use pardep::stoex;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = stoex::replace_underscores_with_dots(&stoex::replace_fractions_with_pmf(input));
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use sigtriage::pattern::matches;

fuzz_target!(|data: &[u8]| {
    // First NUL splits candidate from pattern
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let (candidate, pattern) = input.split_once('\0').unwrap_or((input, "#"));
    let _ = matches(candidate, pattern);
    assert!(matches(candidate, "#"));
    if !candidate.contains('#') {
        assert!(matches(candidate, candidate));
    }
});

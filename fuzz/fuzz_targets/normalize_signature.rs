#![no_main]

use libfuzzer_sys::fuzz_target;
use sigtriage::signature::normalize;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let once = normalize(&raw);
    // Normalizing an already normalized signature must not change it
    assert_eq!(normalize(&once), once);
});

#![no_main]

use annotest_core::extract_expected_output;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Test sources are read as UTF-8; anything else is rejected before extraction
    if let Ok(source) = std::str::from_utf8(data) {
        let expected = extract_expected_output(source);
        let annotated = source.split('\n').filter(|line| line.contains("# ")).count();
        assert_eq!(expected.matches('\n').count(), annotated);
    }
});

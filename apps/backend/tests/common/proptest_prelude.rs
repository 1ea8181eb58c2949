//! Proptest configuration shared by the property suites.
//!
//! `PROPTEST_CASES` sets the case count (default 32) and
//! `PROPTEST_MAX_SHRINK_MS` caps shrinking time.

use proptest::prelude::ProptestConfig;

pub fn proptest_prelude_config() -> ProptestConfig {
    let base = ProptestConfig::default();

    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(32)
        .max(1);
    let max_shrink_time = std::env::var("PROPTEST_MAX_SHRINK_MS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(base.max_shrink_time);

    ProptestConfig {
        // no regression files from integration binaries
        failure_persistence: None,
        cases,
        max_shrink_time,
        ..base
    }
}

#![cfg(test)]

//! Logging for unit tests.
//!
//! Unit and integration tests share one subscriber configuration, so this
//! forwards to the test-support crate. Raise the level with `TEST_LOG=debug`
//! (falls back to `RUST_LOG`, then `warn`).

pub fn init() {
    backend_test_support::logging::init();
}

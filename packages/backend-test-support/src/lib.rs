//! Shared helpers for the table service's integration tests: one-time
//! logging setup and problem-details assertions.

pub mod logging;
pub mod problem_details;

//! One-time setup shared by the crate's unit tests.

pub mod logging;

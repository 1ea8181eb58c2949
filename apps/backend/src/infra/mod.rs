//! Infrastructure layer: database bootstrap, state assembly, the stage
//! pipeline and error translation.

pub mod db;
pub mod db_errors;
pub mod pipeline;
pub mod state;

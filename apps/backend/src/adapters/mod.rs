//! SeaORM adapters. Functions return `DbErr`; the repos layer maps them.

pub mod deals_sea;
pub mod participants_sea;
pub mod players_sea;
pub mod rounds_sea;
pub mod sessions_sea;
pub mod tables_sea;

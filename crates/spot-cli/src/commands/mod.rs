//! CLI command implementations

pub mod analyze;
pub mod batch;
pub mod families;
pub mod forecast;
pub mod zones;

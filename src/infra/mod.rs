//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub(crate) mod lock;
pub mod memory;
pub mod overlay;
pub mod telemetry;

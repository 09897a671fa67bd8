//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod key;
pub mod types;
pub mod value;

//! Application services: the settings store and its collaborators.

pub mod error;
pub mod overlay;
pub mod repos;
pub mod site;
pub mod store;

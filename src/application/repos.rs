//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::SettingRecord;
use crate::domain::types::SettingFormat;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertSettingParams {
    pub name: String,
    pub value: Option<String>,
    pub format: SettingFormat,
}

#[async_trait]
pub trait SettingsRepo: Send + Sync {
    async fn list_settings(&self) -> Result<Vec<SettingRecord>, RepoError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<SettingRecord>, RepoError>;

    /// Create the record, or replace its value and format when `name` already exists.
    async fn upsert_setting(&self, params: UpsertSettingParams)
    -> Result<SettingRecord, RepoError>;

    /// Returns whether a record was removed.
    async fn delete_by_name(&self, name: &str) -> Result<bool, RepoError>;
}

//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::types::SettingFormat;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingRecord {
    pub id: i64,
    pub name: String,
    pub value: Option<String>,
    pub format: SettingFormat,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

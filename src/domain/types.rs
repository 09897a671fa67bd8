use std::fmt;

use serde::{Deserialize, Serialize};

/// How the stored payload of a setting must be decoded.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "setting_format", rename_all = "snake_case")]
pub enum SettingFormat {
    #[default]
    String,
    Json,
}

impl SettingFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingFormat::String => "string",
            SettingFormat::Json => "json",
        }
    }
}

impl fmt::Display for SettingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use thiserror::Error;

use super::key::KeyError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    InvalidKey(#[from] KeyError),
    #[error("stored value of setting `{name}` is not valid json: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DomainError {
    pub fn decode(name: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            name: name.into(),
            source,
        }
    }
}

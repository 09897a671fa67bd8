//! Namespaced key resolution.
//!
//! Keys take the form `[namespace::]group[.item]`. The namespace and group
//! together address a collection in the in-memory cache; the item addresses a
//! value inside it. An absent item refers to the group itself.

use std::fmt;

use thiserror::Error;

pub const NAMESPACE_SEPARATOR: &str = "::";
pub const ITEM_SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("setting key `{key}` has an empty group segment")]
    EmptyGroup { key: String },
}

/// A key split into its namespace, group and item segments.
///
/// Borrows from the key it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedKey<'a> {
    namespace: Option<&'a str>,
    group: &'a str,
    item: Option<&'a str>,
}

impl<'a> ResolvedKey<'a> {
    pub fn parse(key: &'a str) -> Result<Self, KeyError> {
        let (namespace, remainder) = match key.split_once(NAMESPACE_SEPARATOR) {
            Some((namespace, remainder)) => (non_empty(namespace), remainder),
            None => (None, key),
        };

        let (group, item) = match remainder.split_once(ITEM_SEPARATOR) {
            Some((group, item)) => (group, non_empty(item)),
            None => (remainder, None),
        };

        if group.is_empty() {
            return Err(KeyError::EmptyGroup {
                key: key.to_string(),
            });
        }

        Ok(Self {
            namespace,
            group,
            item,
        })
    }

    pub fn namespace(&self) -> Option<&'a str> {
        self.namespace
    }

    pub fn group(&self) -> &'a str {
        self.group
    }

    pub fn item(&self) -> Option<&'a str> {
        self.item
    }

    /// Slot name inside the collection; the empty string stands for the group itself.
    pub fn item_slot(&self) -> &'a str {
        self.item.unwrap_or("")
    }

    /// Name of the in-memory collection this key routes to.
    pub fn collection(&self) -> String {
        collection_name(self.namespace, self.group)
    }
}

impl fmt::Display for ResolvedKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(namespace) = self.namespace {
            write!(f, "{namespace}{NAMESPACE_SEPARATOR}")?;
        }
        f.write_str(self.group)?;
        if let Some(item) = self.item {
            write!(f, "{ITEM_SEPARATOR}{item}")?;
        }
        Ok(())
    }
}

pub fn collection_name(namespace: Option<&str>, group: &str) -> String {
    match namespace {
        Some(namespace) => format!("{namespace}{NAMESPACE_SEPARATOR}{group}"),
        None => group.to_string(),
    }
}

/// Splits a collection name back into its namespace and group.
pub fn split_collection(collection: &str) -> (Option<&str>, &str) {
    match collection.split_once(NAMESPACE_SEPARATOR) {
        Some((namespace, group)) => (non_empty(namespace), group),
        None => (None, collection),
    }
}

fn non_empty(segment: &str) -> Option<&str> {
    (!segment.is_empty()).then_some(segment)
}

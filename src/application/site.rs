//! Site-scoped settings: one namespace of the store plus named macros.
//!
//! Everything written through [`SiteSettings`] is temporary; it lives in the
//! store's cache for the lifetime of the store and is never persisted.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::application::store::{Collection, SettingsStore, StoreError};
use crate::domain::key::ResolvedKey;

pub const DEFAULT_SITE_NAMESPACE: &str = "site";

const PAGE_TITLE_KEY: &str = "page_title";
const SECTION_KEY: &str = "section";

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("no site macro named `{0}` is registered")]
    UnknownMacro(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type SiteMacro = Arc<dyn Fn(&SiteView) -> Value + Send + Sync>;

/// Snapshot of the site namespace handed to macros.
#[derive(Debug, Clone, Default)]
pub struct SiteView {
    collections: BTreeMap<String, Collection>,
}

impl SiteView {
    pub fn new(collections: BTreeMap<String, Collection>) -> Self {
        Self { collections }
    }

    /// Resolve a `group[.item]` key inside the namespace.
    pub fn get(&self, key: &str) -> Option<Value> {
        let resolved = ResolvedKey::parse(key).ok()?;
        let collection = self.collections.get(resolved.group())?;
        match resolved.item() {
            Some(item) => collection.get(item).cloned(),
            None => collection.get("").cloned(),
        }
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|value| value.as_str().map(str::to_string))
    }
}

pub struct SiteSettings {
    store: Arc<SettingsStore>,
    namespace: String,
    macros: HashMap<String, SiteMacro>,
}

impl SiteSettings {
    pub fn new(store: Arc<SettingsStore>) -> Self {
        Self::with_namespace(store, DEFAULT_SITE_NAMESPACE)
    }

    pub fn with_namespace(store: Arc<SettingsStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            macros: HashMap::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn get(&self, key: &str, default: impl Into<Value>) -> Result<Value, SiteError> {
        if key.is_empty() {
            return Ok(default.into());
        }
        Ok(self.store.get(&self.scoped(key), default).await?)
    }

    /// Empty keys are ignored.
    pub async fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), SiteError> {
        if key.is_empty() {
            return Ok(());
        }
        Ok(self.store.set_temp(&self.scoped(key), value).await?)
    }

    pub async fn set_multiple<I, K, V>(&self, pairs: I) -> Result<(), SiteError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in pairs {
            self.set(key.as_ref(), value).await?;
        }
        Ok(())
    }

    pub async fn page_title(&self) -> Result<Option<String>, SiteError> {
        self.get_string(PAGE_TITLE_KEY).await
    }

    pub async fn set_page_title(&self, title: impl Into<String>) -> Result<(), SiteError> {
        self.set(PAGE_TITLE_KEY, title.into()).await
    }

    pub async fn section(&self) -> Result<Option<String>, SiteError> {
        self.get_string(SECTION_KEY).await
    }

    pub async fn set_section(&self, section: impl Into<String>) -> Result<(), SiteError> {
        self.set(SECTION_KEY, section.into()).await
    }

    /// Register `callback` under `name`, replacing any previous macro of that name.
    pub fn register_macro<F>(&mut self, name: impl Into<String>, callback: F)
    where
        F: Fn(&SiteView) -> Value + Send + Sync + 'static,
    {
        self.macros.insert(name.into(), Arc::new(callback));
    }

    pub fn has_macro(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub async fn call_macro(&self, name: &str) -> Result<Value, SiteError> {
        let callback = self
            .macros
            .get(name)
            .cloned()
            .ok_or_else(|| SiteError::UnknownMacro(name.to_string()))?;
        let view = self.view().await?;
        Ok(callback(&view))
    }

    pub async fn view(&self) -> Result<SiteView, SiteError> {
        Ok(SiteView::new(self.store.namespace(&self.namespace).await?))
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>, SiteError> {
        Ok(self.store.get_as::<String>(&self.scoped(key)).await?)
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}::{key}", self.namespace)
    }
}

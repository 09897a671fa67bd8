//! Namespaced settings cache with write-through persistence.
//!
//! The store keeps every persisted setting in memory, grouped into
//! collections addressed by `namespace::group`. The first operation on a store
//! fills the cache from the repository; reads are then served from memory and
//! writes go to the repository before the cache is refreshed from the stored
//! record. Every value the store caches is mirrored into a [`ConfigOverlay`],
//! which also serves as the fallback for keys the cache does not hold.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use metrics::counter;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::application::overlay::ConfigOverlay;
use crate::application::repos::{RepoError, SettingsRepo, UpsertSettingParams};
use crate::domain::entities::SettingRecord;
use crate::domain::error::DomainError;
use crate::domain::key::{KeyError, ResolvedKey, split_collection};
use crate::domain::value::{self, is_blank};

pub const METRIC_CACHE_HIT: &str = "tessera_settings_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "tessera_settings_cache_miss_total";
pub const METRIC_OVERLAY_HIT: &str = "tessera_settings_overlay_hit_total";
pub const METRIC_LOAD: &str = "tessera_settings_load_total";
pub const METRIC_REJECTED: &str = "tessera_settings_rejected_total";

/// Items of one `namespace::group`, keyed by item name. The empty item holds a
/// value stored at group level.
pub type Collection = BTreeMap<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("setting `{key}` could not be converted: {source}")]
    Conversion {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<KeyError> for StoreError {
    fn from(err: KeyError) -> Self {
        Self::Domain(DomainError::InvalidKey(err))
    }
}

/// Outcome of a cache fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// The cache was already filled; the repository was not queried.
    pub already_loaded: bool,
    pub fetched: usize,
    /// Records skipped because their name or payload could not be read.
    pub rejected: usize,
}

#[derive(Debug, Default)]
struct StoreState {
    items: HashMap<String, Collection>,
    /// Overlay keys each cached slot was mirrored under, keyed by `(collection, item)`.
    mirrors: HashMap<(String, String), BTreeSet<String>>,
    loaded: bool,
}

pub struct SettingsStore {
    repo: Arc<dyn SettingsRepo>,
    overlay: Arc<dyn ConfigOverlay>,
    state: Mutex<StoreState>,
}

impl SettingsStore {
    /// Create an empty store; the cache fills on first use.
    pub fn new(repo: Arc<dyn SettingsRepo>, overlay: Arc<dyn ConfigOverlay>) -> Self {
        Self {
            repo,
            overlay,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Create a store and fill its cache immediately.
    pub async fn open(
        repo: Arc<dyn SettingsRepo>,
        overlay: Arc<dyn ConfigOverlay>,
    ) -> Result<Self, StoreError> {
        let store = Self::new(repo, overlay);
        store.load().await?;
        Ok(store)
    }

    /// Fill the cache from the repository unless a previous fill succeeded.
    ///
    /// A fill that fetched no records does not count as done: the next call
    /// queries the repository again.
    pub async fn load(&self) -> Result<LoadReport, StoreError> {
        let mut state = self.state.lock().await;
        self.load_locked(&mut state).await
    }

    /// Drop every cached entry, temporary ones included, and fill again.
    pub async fn refresh(&self) -> Result<LoadReport, StoreError> {
        let mut state = self.state.lock().await;
        state.items.clear();
        for (_, keys) in state.mirrors.drain() {
            for key in keys {
                self.overlay.remove(&key);
            }
        }
        state.loaded = false;
        self.load_locked(&mut state).await
    }

    /// Resolve `key`, falling back to the overlay and then to `default`.
    pub async fn get(&self, key: &str, default: impl Into<Value>) -> Result<Value, StoreError> {
        Ok(self.lookup(key).await?.unwrap_or_else(|| default.into()))
    }

    /// Resolve `key` without a default.
    pub async fn lookup(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut state = self.state.lock().await;
        self.load_locked(&mut state).await?;
        Ok(self.resolve(&state, key))
    }

    /// Resolve `key` and deserialize it into `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.lookup(key)
            .await?
            .map(|value| {
                serde_json::from_value(value).map_err(|source| StoreError::Conversion {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    pub async fn has(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lookup(key).await?.is_some())
    }

    /// Persist `value` under `key`, then refresh the cache from the stored record.
    pub async fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), StoreError> {
        ResolvedKey::parse(key)?;
        let encoded = value::encode(&value.into());

        let mut state = self.state.lock().await;
        self.load_locked(&mut state).await?;

        let record = self
            .repo
            .upsert_setting(UpsertSettingParams {
                name: key.to_string(),
                value: encoded.value,
                format: encoded.format,
            })
            .await?;
        self.cache_record(&mut state, &record)?;

        debug!(setting = key, format = %record.format, "Setting persisted");
        Ok(())
    }

    /// Cache `value` under `key` for the lifetime of this store without persisting it.
    pub async fn set_temp(&self, key: &str, value: impl Into<Value>) -> Result<(), StoreError> {
        let resolved = ResolvedKey::parse(key)?;
        let value = value.into();

        let mut state = self.state.lock().await;
        self.load_locked(&mut state).await?;
        self.insert(&mut state, key, resolved, value);

        debug!(setting = key, "Temporary setting cached");
        Ok(())
    }

    /// Remove `key` from the cache, the overlay and the repository.
    ///
    /// The delete is sent even when the key is not cached, so a record that
    /// was skipped at load because its payload could not be decoded can still
    /// be removed. Returns whether anything was removed.
    pub async fn forget(&self, key: &str) -> Result<bool, StoreError> {
        let resolved = ResolvedKey::parse(key)?;

        let mut state = self.state.lock().await;
        self.load_locked(&mut state).await?;

        let deleted = self.repo.delete_by_name(key).await?;

        let collection_name = resolved.collection();
        let slot = (collection_name.clone(), resolved.item_slot().to_string());
        let mut evicted = false;
        if let Some(collection) = state.items.get_mut(&collection_name) {
            evicted = collection.remove(resolved.item_slot()).is_some();
            if collection.is_empty() {
                state.items.remove(&collection_name);
            }
        }
        self.overlay.remove(key);
        for alias in state.mirrors.remove(&slot).unwrap_or_default() {
            self.overlay.remove(&alias);
        }

        debug!(setting = key, deleted, evicted, "Setting forgotten");
        Ok(deleted || evicted)
    }

    /// Snapshot of every cached collection.
    pub async fn all(&self) -> Result<BTreeMap<String, Collection>, StoreError> {
        let mut state = self.state.lock().await;
        self.load_locked(&mut state).await?;
        Ok(state
            .items
            .iter()
            .map(|(name, items)| (name.clone(), items.clone()))
            .collect())
    }

    /// Snapshot of the collections under `namespace`, keyed by group.
    pub async fn namespace(
        &self,
        namespace: &str,
    ) -> Result<BTreeMap<String, Collection>, StoreError> {
        let mut state = self.state.lock().await;
        self.load_locked(&mut state).await?;
        Ok(state
            .items
            .iter()
            .filter_map(|(name, items)| match split_collection(name) {
                (Some(owner), group) if owner == namespace => {
                    Some((group.to_string(), items.clone()))
                }
                _ => None,
            })
            .collect())
    }

    /// Read a record straight from the repository, bypassing the cache.
    pub async fn persisted(&self, name: &str) -> Result<Option<SettingRecord>, StoreError> {
        Ok(self.repo.find_by_name(name).await?)
    }

    async fn load_locked(&self, state: &mut StoreState) -> Result<LoadReport, StoreError> {
        if state.loaded {
            return Ok(LoadReport {
                already_loaded: true,
                ..LoadReport::default()
            });
        }

        let records = self.repo.list_settings().await?;
        counter!(METRIC_LOAD).increment(1);

        let mut report = LoadReport {
            fetched: records.len(),
            ..LoadReport::default()
        };

        for record in &records {
            if let Err(err) = self.cache_record(state, record) {
                report.rejected += 1;
                counter!(METRIC_REJECTED).increment(1);
                warn!(
                    setting = %record.name,
                    format = %record.format,
                    error = %err,
                    "Skipping unreadable setting"
                );
            }
        }

        if records.is_empty() {
            debug!("No settings stored; the next access will query again");
        } else {
            state.loaded = true;
            info!(
                fetched = report.fetched,
                rejected = report.rejected,
                collections = state.items.len(),
                "Settings cache loaded"
            );
        }

        Ok(report)
    }

    fn cache_record(
        &self,
        state: &mut StoreState,
        record: &SettingRecord,
    ) -> Result<(), DomainError> {
        let resolved = ResolvedKey::parse(&record.name)?;
        let value = value::decode(&record.name, record.value.as_deref(), record.format)?;
        self.insert(state, &record.name, resolved, value);
        Ok(())
    }

    fn insert(&self, state: &mut StoreState, key: &str, resolved: ResolvedKey<'_>, value: Value) {
        self.overlay.set(key, value.clone());
        state
            .mirrors
            .entry((resolved.collection(), resolved.item_slot().to_string()))
            .or_default()
            .insert(key.to_string());
        state
            .items
            .entry(resolved.collection())
            .or_default()
            .insert(resolved.item_slot().to_string(), value);
    }

    fn resolve(&self, state: &StoreState, key: &str) -> Option<Value> {
        if let Some(value) = Self::resolve_cached(state, key) {
            counter!(METRIC_CACHE_HIT).increment(1);
            return Some(value);
        }
        counter!(METRIC_CACHE_MISS).increment(1);

        let value = self.overlay.get(key).filter(|value| !is_blank(value))?;
        counter!(METRIC_OVERLAY_HIT).increment(1);
        Some(value)
    }

    fn resolve_cached(state: &StoreState, key: &str) -> Option<Value> {
        let resolved = ResolvedKey::parse(key).ok()?;
        let collection = state.items.get(&resolved.collection())?;
        match resolved.item() {
            Some(item) => collection.get(item).cloned(),
            None => Some(
                collection
                    .get("")
                    .cloned()
                    .unwrap_or_else(|| collection_value(collection)),
            ),
        }
    }
}

fn collection_value(collection: &Collection) -> Value {
    Value::Object(
        collection
            .iter()
            .map(|(item, value)| (item.clone(), value.clone()))
            .collect::<Map<String, Value>>(),
    )
}

//! In-memory `SettingsRepo` for embedding without a database and for tests.

use std::collections::BTreeMap;
use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{RepoError, SettingsRepo, UpsertSettingParams};
use crate::domain::entities::SettingRecord;
use crate::domain::types::SettingFormat;

use super::lock::mutex_lock;

const SOURCE: &str = "infra::memory";

/// Records keyed by unique name, mirroring the `settings` table.
#[derive(Debug, Default)]
pub struct InMemorySettingsRepo {
    records: Mutex<BTreeMap<String, SettingRecord>>,
    next_id: AtomicI64,
    list_calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemorySettingsRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw row, bypassing value encoding.
    pub fn seed(&self, name: &str, value: Option<&str>, format: SettingFormat) -> SettingRecord {
        self.write(UpsertSettingParams {
            name: name.to_string(),
            value: value.map(str::to_string),
            format,
        })
    }

    /// Number of times the full table has been fetched.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.records, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent call fail with a persistence error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), RepoError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("settings storage unavailable"));
        }
        Ok(())
    }

    fn write(&self, params: UpsertSettingParams) -> SettingRecord {
        let now = OffsetDateTime::now_utc();
        let mut records = mutex_lock(&self.records, SOURCE, "write");
        let record = records
            .entry(params.name.clone())
            .and_modify(|existing| {
                existing.value = params.value.clone();
                existing.format = params.format;
                existing.updated_at = now;
            })
            .or_insert_with(|| SettingRecord {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                name: params.name.clone(),
                value: params.value.clone(),
                format: params.format,
                created_at: now,
                updated_at: now,
            });
        record.clone()
    }
}

#[async_trait]
impl SettingsRepo for InMemorySettingsRepo {
    async fn list_settings(&self) -> Result<Vec<SettingRecord>, RepoError> {
        self.ensure_available()?;
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut records: Vec<SettingRecord> = mutex_lock(&self.records, SOURCE, "list_settings")
            .values()
            .cloned()
            .collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<SettingRecord>, RepoError> {
        self.ensure_available()?;
        Ok(mutex_lock(&self.records, SOURCE, "find_by_name")
            .get(name)
            .cloned())
    }

    async fn upsert_setting(
        &self,
        params: UpsertSettingParams,
    ) -> Result<SettingRecord, RepoError> {
        self.ensure_available()?;
        Ok(self.write(params))
    }

    async fn delete_by_name(&self, name: &str) -> Result<bool, RepoError> {
        self.ensure_available()?;
        Ok(mutex_lock(&self.records, SOURCE, "delete_by_name")
            .remove(name)
            .is_some())
    }
}

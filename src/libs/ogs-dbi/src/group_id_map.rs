//! External/Internal Group ID Map
//!
//! The `subscriptionData.extintGroupIDMap` collection pairs a caller-facing
//! external group identifier with the internal group identifier the UDM
//! allocated for it. Both fields are unique; an entry is created in a single
//! insert and only ever deleted as a whole.

use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, UpdateOptions};
use mongodb::{Collection, IndexModel};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::mongoc::{DbiResult, OgsMongoc};

/// Collection name
pub const EXT_INT_GROUP_ID_MAP: &str = "subscriptionData.extintGroupIDMap";

/// MongoDB duplicate key error code
const DUPLICATE_KEY: i32 = 11000;

/// One mapping document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupIdMapping {
    #[serde(rename = "externalGroupId")]
    pub external_group_id: String,
    #[serde(rename = "internalGroupId")]
    pub internal_group_id: String,
}

impl GroupIdMapping {
    pub fn new(external_group_id: impl Into<String>, internal_group_id: impl Into<String>) -> Self {
        Self {
            external_group_id: external_group_id.into(),
            internal_group_id: internal_group_id.into(),
        }
    }
}

/// Result of an insert-if-absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The mapping was stored
    Inserted,
    /// Another mapping already uses the internal id
    InternalIdTaken,
    /// Another mapping already uses the external id
    ExternalIdTaken,
}

/// Storage of the external/internal group id pairs.
///
/// `insert_if_absent` is atomic over both keys: of two concurrent inserts
/// sharing either id, exactly one reports `Inserted`.
#[async_trait]
pub trait GroupIdMapStore: Send + Sync {
    async fn find_by_external_id(&self, external_group_id: &str) -> DbiResult<Option<GroupIdMapping>>;

    async fn find_by_internal_id(&self, internal_group_id: &str) -> DbiResult<Option<GroupIdMapping>>;

    async fn insert_if_absent(&self, mapping: &GroupIdMapping) -> DbiResult<InsertOutcome>;

    /// Returns whether an entry was removed
    async fn delete_by_internal_id(&self, internal_group_id: &str) -> DbiResult<bool>;

    /// Returns whether an entry was removed
    async fn delete_by_external_id(&self, external_group_id: &str) -> DbiResult<bool>;
}

/// MongoDB-backed mapping store
pub struct MongoGroupIdMapStore {
    collection: Collection<GroupIdMapping>,
}

impl MongoGroupIdMapStore {
    pub fn new(mongoc: &OgsMongoc) -> Self {
        Self {
            collection: mongoc.collection::<GroupIdMapping>(EXT_INT_GROUP_ID_MAP),
        }
    }

    /// Create the unique indexes the insert protocol relies on
    pub async fn ensure_indexes(&self) -> DbiResult<()> {
        for key in ["externalGroupId", "internalGroupId"] {
            let mut keys = Document::new();
            keys.insert(key, 1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.collection.create_index(index, None).await?;
        }
        log::debug!("[{}] unique indexes ensured", EXT_INT_GROUP_ID_MAP);
        Ok(())
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match &*e.kind {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY,
        ErrorKind::Command(ce) => ce.code == DUPLICATE_KEY,
        _ => false,
    }
}

#[async_trait]
impl GroupIdMapStore for MongoGroupIdMapStore {
    async fn find_by_external_id(&self, external_group_id: &str) -> DbiResult<Option<GroupIdMapping>> {
        let found = self
            .collection
            .find_one(doc! { "externalGroupId": external_group_id }, None)
            .await?;
        Ok(found)
    }

    async fn find_by_internal_id(&self, internal_group_id: &str) -> DbiResult<Option<GroupIdMapping>> {
        let found = self
            .collection
            .find_one(doc! { "internalGroupId": internal_group_id }, None)
            .await?;
        Ok(found)
    }

    async fn insert_if_absent(&self, mapping: &GroupIdMapping) -> DbiResult<InsertOutcome> {
        let filter = doc! { "internalGroupId": mapping.internal_group_id.as_str() };
        let update = doc! {
            "$setOnInsert": {
                "externalGroupId": mapping.external_group_id.as_str(),
                "internalGroupId": mapping.internal_group_id.as_str(),
            }
        };
        let options = UpdateOptions::builder().upsert(true).build();

        match self.collection.update_one(filter, update, options).await {
            Ok(result) if result.upserted_id.is_some() => Ok(InsertOutcome::Inserted),
            Ok(_) => Ok(InsertOutcome::InternalIdTaken),
            Err(e) if is_duplicate_key(&e) => {
                // Either unique index may have fired; find out which
                if self
                    .find_by_external_id(&mapping.external_group_id)
                    .await?
                    .is_some()
                {
                    Ok(InsertOutcome::ExternalIdTaken)
                } else {
                    Ok(InsertOutcome::InternalIdTaken)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_by_internal_id(&self, internal_group_id: &str) -> DbiResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "internalGroupId": internal_group_id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_by_external_id(&self, external_group_id: &str) -> DbiResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "externalGroupId": external_group_id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }
}

#[derive(Debug, Default)]
struct MemoryIndexes {
    by_external: HashMap<String, String>,
    by_internal: HashMap<String, String>,
}

/// Process-local mapping store, used when no database is configured
#[derive(Debug, Default)]
pub struct MemoryGroupIdMapStore {
    inner: Mutex<MemoryIndexes>,
}

impl MemoryGroupIdMapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.by_internal.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl GroupIdMapStore for MemoryGroupIdMapStore {
    async fn find_by_external_id(&self, external_group_id: &str) -> DbiResult<Option<GroupIdMapping>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .by_external
            .get(external_group_id)
            .map(|internal| GroupIdMapping::new(external_group_id, internal.clone())))
    }

    async fn find_by_internal_id(&self, internal_group_id: &str) -> DbiResult<Option<GroupIdMapping>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .by_internal
            .get(internal_group_id)
            .map(|external| GroupIdMapping::new(external.clone(), internal_group_id)))
    }

    async fn insert_if_absent(&self, mapping: &GroupIdMapping) -> DbiResult<InsertOutcome> {
        let mut inner = self.inner.lock().await;
        if inner.by_internal.contains_key(&mapping.internal_group_id) {
            return Ok(InsertOutcome::InternalIdTaken);
        }
        if inner.by_external.contains_key(&mapping.external_group_id) {
            return Ok(InsertOutcome::ExternalIdTaken);
        }
        inner.by_internal.insert(
            mapping.internal_group_id.clone(),
            mapping.external_group_id.clone(),
        );
        inner.by_external.insert(
            mapping.external_group_id.clone(),
            mapping.internal_group_id.clone(),
        );
        Ok(InsertOutcome::Inserted)
    }

    async fn delete_by_internal_id(&self, internal_group_id: &str) -> DbiResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.by_internal.remove(internal_group_id) {
            Some(external) => {
                inner.by_external.remove(&external);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_external_id(&self, external_group_id: &str) -> DbiResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.by_external.remove(external_group_id) {
            Some(internal) => {
                inner.by_internal.remove(&internal);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_memory_insert_and_lookup() {
        let store = MemoryGroupIdMapStore::new();
        let mapping = GroupIdMapping::new("ext-1", "AAA00001-208-93-aB01cD23eF");

        assert_eq!(store.insert_if_absent(&mapping).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            store.find_by_external_id("ext-1").await.unwrap(),
            Some(mapping.clone())
        );
        assert_eq!(
            store
                .find_by_internal_id("AAA00001-208-93-aB01cD23eF")
                .await
                .unwrap(),
            Some(mapping)
        );
        assert_eq!(store.find_by_external_id("ext-2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_insert_reports_taken_key() {
        let store = MemoryGroupIdMapStore::new();
        store
            .insert_if_absent(&GroupIdMapping::new("ext-1", "int-1"))
            .await
            .unwrap();

        assert_eq!(
            store
                .insert_if_absent(&GroupIdMapping::new("ext-2", "int-1"))
                .await
                .unwrap(),
            InsertOutcome::InternalIdTaken
        );
        assert_eq!(
            store
                .insert_if_absent(&GroupIdMapping::new("ext-1", "int-2"))
                .await
                .unwrap(),
            InsertOutcome::ExternalIdTaken
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_delete_removes_both_keys() {
        let store = MemoryGroupIdMapStore::new();
        store
            .insert_if_absent(&GroupIdMapping::new("ext-1", "int-1"))
            .await
            .unwrap();

        assert!(store.delete_by_internal_id("int-1").await.unwrap());
        assert!(!store.delete_by_internal_id("int-1").await.unwrap());
        assert_eq!(store.find_by_external_id("ext-1").await.unwrap(), None);
        assert!(store.is_empty().await);

        store
            .insert_if_absent(&GroupIdMapping::new("ext-1", "int-9"))
            .await
            .unwrap();
        assert!(store.delete_by_external_id("ext-1").await.unwrap());
        assert_eq!(store.find_by_internal_id("int-9").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_memory_concurrent_same_external_id() {
        let store = Arc::new(MemoryGroupIdMapStore::new());
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..16 {
            let store = store.clone();
            tasks.spawn(async move {
                store
                    .insert_if_absent(&GroupIdMapping::new("ext-race", format!("int-{i}")))
                    .await
                    .unwrap()
            });
        }

        let mut inserted = 0;
        while let Some(outcome) = tasks.join_next().await {
            if outcome.unwrap() == InsertOutcome::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn test_mapping_document_field_names() {
        let bson = mongodb::bson::to_document(&GroupIdMapping::new("ext-1", "int-1")).unwrap();
        assert_eq!(bson.get_str("externalGroupId").unwrap(), "ext-1");
        assert_eq!(bson.get_str("internalGroupId").unwrap(), "int-1");
    }
}

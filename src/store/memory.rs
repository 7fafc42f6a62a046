use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tokio::sync::RwLock;

use super::{
    CollectionPath, Document, DocumentPath, DocumentStore, Fields, Query, StoreError, StoreResult,
};
#[cfg(test)]
use super::ErrorCode;

/// In-process document store.
///
/// Collection-group queries only succeed for collection ids registered as
/// group indexes; anything else fails with `failed-precondition`, the way a
/// freshly deployed hosted store behaves before its indexes are built.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<DocumentPath, Fields>>,
    group_indexes: HashSet<String>,
    #[cfg(test)]
    faults: std::sync::Mutex<Faults>,
}

#[cfg(test)]
#[derive(Default)]
struct Faults {
    collections: std::collections::HashMap<CollectionPath, ErrorCode>,
    groups: std::collections::HashMap<String, ErrorCode>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group_indexes<I, S>(indexes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group_indexes: indexes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Makes every query against `collection` fail with `code`.
    #[cfg(test)]
    pub fn fail_collection(&self, collection: CollectionPath, code: ErrorCode) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.collections.insert(collection, code);
        }
    }

    /// Makes every group query on `collection_id` fail with `code`.
    #[cfg(test)]
    pub fn fail_group(&self, collection_id: &str, code: ErrorCode) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.groups.insert(collection_id.to_string(), code);
        }
    }

    #[cfg(test)]
    fn injected_collection_fault(&self, collection: &CollectionPath) -> StoreResult<()> {
        let faults = self.faults.lock().map_err(|_| {
            StoreError::new(ErrorCode::Internal, "fault table poisoned")
        })?;
        match faults.collections.get(collection) {
            Some(code) => Err(StoreError::new(*code, format!("injected failure on {collection}"))),
            None => Ok(()),
        }
    }

    #[cfg(not(test))]
    fn injected_collection_fault(&self, _collection: &CollectionPath) -> StoreResult<()> {
        Ok(())
    }

    #[cfg(test)]
    fn injected_group_fault(&self, collection_id: &str) -> StoreResult<()> {
        let faults = self.faults.lock().map_err(|_| {
            StoreError::new(ErrorCode::Internal, "fault table poisoned")
        })?;
        match faults.groups.get(collection_id) {
            Some(code) => Err(StoreError::new(
                *code,
                format!("injected failure on group {collection_id}"),
            )),
            None => Ok(()),
        }
    }

    #[cfg(not(test))]
    fn injected_group_fault(&self, _collection_id: &str) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn put(&self, path: &DocumentPath, fields: Fields) -> StoreResult<()> {
        self.documents.write().await.insert(path.clone(), fields);
        Ok(())
    }

    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents.get(path).map(|fields| Document {
            path: path.clone(),
            fields: fields.clone(),
        }))
    }

    async fn query(&self, collection: &CollectionPath, query: &Query) -> StoreResult<Vec<Document>> {
        self.injected_collection_fault(collection)?;

        let documents = self.documents.read().await;
        let candidates = documents
            .iter()
            .filter(|(path, _)| &path.parent() == collection)
            .map(|(path, fields)| Document {
                path: path.clone(),
                fields: fields.clone(),
            })
            .collect();
        Ok(query.apply(candidates))
    }

    async fn query_group(
        &self,
        collection_id: &str,
        under: &DocumentPath,
        query: &Query,
    ) -> StoreResult<Vec<Document>> {
        self.injected_group_fault(collection_id)?;
        if !self.group_indexes.contains(collection_id) {
            return Err(StoreError::missing_index(collection_id));
        }

        let documents = self.documents.read().await;
        let candidates = documents
            .iter()
            .filter(|(path, _)| path.parent().id() == collection_id && path.is_descendant_of(under))
            .map(|(path, fields)| Document {
                path: path.clone(),
                fields: fields.clone(),
            })
            .collect();
        Ok(query.apply(candidates))
    }

    async fn list_documents(&self, collection: &CollectionPath) -> StoreResult<Vec<DocumentPath>> {
        self.injected_collection_fault(collection)?;

        let documents = self.documents.read().await;
        let children: BTreeSet<DocumentPath> = documents
            .keys()
            .filter_map(|path| path.child_of(collection))
            .collect();
        Ok(children.into_iter().collect())
    }

    async fn delete(&self, path: &DocumentPath) -> StoreResult<()> {
        match self.documents.write().await.remove(path) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(path)),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use mongoperf_core::prelude::{DelegatedShutdownListener, OperationError};
use parking_lot::{Mutex, RwLock};
use serde_json::{Number, Value};

use crate::store::{
    Collection, Document, DynCollection, FindOneOptions, FindOptions, Store, UpdateOptions,
};

const ID_FIELD: &str = "_id";

/// A process local store for dry runs and tests.
///
/// Filters match on top level field equality only. Updates support `$set`, `$inc` and `$unset`.
/// Sort and projection options are accepted and ignored.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: Mutex<HashMap<(String, String), Arc<InMemoryCollection>>>,
    latency: Duration,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`. The delay is aborted if the run is cancelled meanwhile.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The number of documents currently held in a collection.
    pub fn document_count(&self, database: &str, collection: &str) -> usize {
        self.collections
            .lock()
            .get(&(database.to_string(), collection.to_string()))
            .map(|c| c.documents.read().items.len())
            .unwrap_or_default()
    }
}

impl Store for InMemoryStore {
    fn connection_target(&self) -> String {
        "in-memory".to_string()
    }

    fn collection(&self, database: &str, collection: &str) -> DynCollection {
        self.collections
            .lock()
            .entry((database.to_string(), collection.to_string()))
            .or_insert_with(|| Arc::new(InMemoryCollection::new(self.latency)))
            .clone()
    }
}

#[derive(Debug)]
struct InMemoryCollection {
    documents: RwLock<Documents>,
    next_id: AtomicU64,
    latency: Duration,
}

/// Stored documents in insertion order, with the serialised `_id` of each one.
#[derive(Debug, Default)]
struct Documents {
    items: Vec<Document>,
    ids: HashSet<String>,
}

impl Documents {
    fn insert(&mut self, document: Document) -> Result<(), OperationError> {
        let id = document.get(ID_FIELD).cloned().unwrap_or(Value::Null);
        if !self.ids.insert(id.to_string()) {
            return Err(OperationError::Rejected(format!("duplicate key {}", id)));
        }
        self.items.push(document);
        Ok(())
    }

    fn matching<'a>(&'a self, filter: &'a Document) -> impl Iterator<Item = &'a Document> + 'a {
        self.items.iter().filter(move |d| matches(d, filter))
    }
}

impl InMemoryCollection {
    fn new(latency: Duration) -> Self {
        Self {
            documents: RwLock::new(Documents::default()),
            next_id: AtomicU64::new(1),
            latency,
        }
    }

    async fn simulate_latency(
        &self,
        shutdown: &DelegatedShutdownListener,
    ) -> Result<(), OperationError> {
        if !self.latency.is_zero() {
            shutdown
                .run_cancellable(tokio::time::sleep(self.latency))
                .await?;
        }

        Ok(())
    }

    fn with_id(&self, document: &Document) -> Document {
        let mut document = document.clone();
        if !document.contains_key(ID_FIELD) {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            document.insert(ID_FIELD.to_string(), Value::from(id));
        }
        document
    }
}

impl Collection for InMemoryCollection {
    fn insert_one<'a>(
        &'a self,
        document: &'a Document,
        shutdown: &'a DelegatedShutdownListener,
    ) -> BoxFuture<'a, Result<u64, OperationError>> {
        Box::pin(async move {
            self.simulate_latency(shutdown).await?;

            let document = self.with_id(document);
            self.documents.write().insert(document)?;
            Ok(1)
        })
    }

    fn insert_many<'a>(
        &'a self,
        documents: &'a [Document],
        shutdown: &'a DelegatedShutdownListener,
    ) -> BoxFuture<'a, Result<u64, OperationError>> {
        Box::pin(async move {
            self.simulate_latency(shutdown).await?;

            let mut stored = self.documents.write();
            for document in documents {
                stored.insert(self.with_id(document))?;
            }
            Ok(documents.len() as u64)
        })
    }

    fn update_one<'a>(
        &'a self,
        filter: &'a Document,
        update: &'a Document,
        options: &'a UpdateOptions,
        shutdown: &'a DelegatedShutdownListener,
    ) -> BoxFuture<'a, Result<u64, OperationError>> {
        Box::pin(async move {
            self.simulate_latency(shutdown).await?;
            check_update(update)?;

            let mut stored = self.documents.write();
            if let Some(document) = stored.items.iter_mut().find(|d| matches(d, filter)) {
                // Applied to a copy so that a rejected update leaves the document untouched.
                let mut updated = document.clone();
                apply_update(&mut updated, update)?;
                if updated.get(ID_FIELD) != document.get(ID_FIELD) {
                    return Err(OperationError::Rejected(
                        "update would modify the immutable field _id".to_string(),
                    ));
                }
                let modified = updated != *document;
                *document = updated;
                return Ok(u64::from(modified));
            }

            if options.upsert.unwrap_or_default() {
                let mut document = filter
                    .iter()
                    .filter(|(k, _)| !k.starts_with('$'))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<Document>();
                apply_update(&mut document, update)?;
                stored.insert(self.with_id(&document))?;
            }

            Ok(0)
        })
    }

    fn find_one<'a>(
        &'a self,
        filter: &'a Document,
        options: &'a FindOneOptions,
        shutdown: &'a DelegatedShutdownListener,
    ) -> BoxFuture<'a, Result<Option<Document>, OperationError>> {
        Box::pin(async move {
            self.simulate_latency(shutdown).await?;

            Ok(self
                .documents
                .read()
                .matching(filter)
                .nth(options.skip.unwrap_or_default() as usize)
                .cloned())
        })
    }

    fn find<'a>(
        &'a self,
        filter: &'a Document,
        options: &'a FindOptions,
        shutdown: &'a DelegatedShutdownListener,
    ) -> BoxFuture<'a, Result<u64, OperationError>> {
        Box::pin(async move {
            self.simulate_latency(shutdown).await?;

            // A negative limit behaves like its absolute value, zero means no limit.
            let limit = match options.limit.map(i64::unsigned_abs) {
                None | Some(0) => usize::MAX,
                Some(limit) => limit as usize,
            };
            let found = self
                .documents
                .read()
                .matching(filter)
                .skip(options.skip.unwrap_or_default() as usize)
                .take(limit)
                .count();

            Ok(found as u64)
        })
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key) == Some(expected))
}

fn check_update(update: &Document) -> Result<(), OperationError> {
    if update.is_empty() {
        return Err(OperationError::Rejected("update document is empty".to_string()));
    }
    if let Some(key) = update.keys().find(|k| !k.starts_with('$')) {
        return Err(OperationError::Rejected(format!(
            "update document requires atomic operators, found `{}`",
            key
        )));
    }

    Ok(())
}

fn apply_update(document: &mut Document, update: &Document) -> Result<(), OperationError> {
    for (operator, fields) in update {
        let fields = fields.as_object().ok_or_else(|| {
            OperationError::Rejected(format!("argument to {} must be a document", operator))
        })?;

        match operator.as_str() {
            "$set" => {
                for (key, value) in fields {
                    document.insert(key.clone(), value.clone());
                }
            }
            "$unset" => {
                for key in fields.keys() {
                    document.remove(key);
                }
            }
            "$inc" => {
                for (key, by) in fields {
                    let current = document.get(key).cloned().unwrap_or(Value::from(0));
                    document.insert(key.clone(), increment(key, &current, by)?);
                }
            }
            other => {
                return Err(OperationError::Rejected(format!(
                    "unsupported update operator {}",
                    other
                )))
            }
        }
    }

    Ok(())
}

fn increment(key: &str, current: &Value, by: &Value) -> Result<Value, OperationError> {
    let not_numeric = || OperationError::Rejected(format!("cannot increment non-numeric field {}", key));
    let (Value::Number(current), Value::Number(by)) = (current, by) else {
        return Err(not_numeric());
    };

    if let (Some(a), Some(b)) = (current.as_i64(), by.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Ok(Value::from(sum));
        }
    }

    let sum = current.as_f64().zip(by.as_f64()).map(|(a, b)| a + b);
    sum.and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(not_numeric)
}

#[cfg(test)]
mod tests {
    use mongoperf_core::prelude::ShutdownHandle;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn collection() -> (InMemoryStore, DynCollection) {
        let store = InMemoryStore::new();
        let collection = store.collection("perf", "items");
        (store, collection)
    }

    #[tokio::test]
    async fn insert_and_find() {
        let (store, collection) = collection();
        let shutdown = ShutdownHandle::new().new_listener();

        let inserted = collection
            .insert_many(
                &[doc(json!({"name": "Ash"})), doc(json!({"name": "Ash"})), doc(json!({"name": "Elm"}))],
                &shutdown,
            )
            .await
            .unwrap();
        assert_eq!(3, inserted);
        assert_eq!(3, store.document_count("perf", "items"));

        let filter = doc(json!({"name": "Ash"}));
        let found = collection
            .find(&filter, &FindOptions::default(), &shutdown)
            .await
            .unwrap();
        assert_eq!(2, found);

        let limited = FindOptions {
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(1, collection.find(&filter, &limited, &shutdown).await.unwrap());

        let all = collection
            .find(&Document::new(), &FindOptions::default(), &shutdown)
            .await
            .unwrap();
        assert_eq!(3, all);
    }

    #[tokio::test]
    async fn collections_are_shared_by_name() {
        let store = InMemoryStore::new();
        let shutdown = ShutdownHandle::new().new_listener();

        store
            .collection("perf", "items")
            .insert_one(&doc(json!({"a": 1})), &shutdown)
            .await
            .unwrap();

        assert_eq!(1, store.document_count("perf", "items"));
        assert_eq!(0, store.document_count("perf", "other"));
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let (_store, collection) = collection();
        let shutdown = ShutdownHandle::new().new_listener();
        let document = doc(json!({"_id": "one"}));

        collection.insert_one(&document, &shutdown).await.unwrap();
        let err = collection.insert_one(&document, &shutdown).await.unwrap_err();
        assert!(matches!(err, OperationError::Rejected(_)));

        // Ids of different types do not collide.
        collection
            .insert_one(&doc(json!({"_id": 1})), &shutdown)
            .await
            .unwrap();
        collection
            .insert_one(&doc(json!({"_id": "1"})), &shutdown)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn find_one_returns_none_without_match() {
        let (_store, collection) = collection();
        let shutdown = ShutdownHandle::new().new_listener();

        let found = collection
            .find_one(&doc(json!({"name": "nobody"})), &FindOneOptions::default(), &shutdown)
            .await
            .unwrap();
        assert_eq!(None, found);
    }

    #[tokio::test]
    async fn update_one_applies_operators() {
        let (_store, collection) = collection();
        let shutdown = ShutdownHandle::new().new_listener();
        collection
            .insert_one(&doc(json!({"_id": 1, "name": "Ash", "age": 10, "tmp": true})), &shutdown)
            .await
            .unwrap();

        let filter = doc(json!({"name": "Ash"}));
        let update = doc(json!({"$set": {"city": "Oslo"}, "$inc": {"age": 2}, "$unset": {"tmp": ""}}));
        let modified = collection
            .update_one(&filter, &update, &UpdateOptions::default(), &shutdown)
            .await
            .unwrap();
        assert_eq!(1, modified);

        let found = collection
            .find_one(&filter, &FindOneOptions::default(), &shutdown)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc(json!({"_id": 1, "name": "Ash", "age": 12, "city": "Oslo"})), found);
    }

    #[tokio::test]
    async fn rejected_update_leaves_the_document_untouched() {
        let (_store, collection) = collection();
        let shutdown = ShutdownHandle::new().new_listener();
        collection
            .insert_one(&doc(json!({"_id": 1, "age": 10})), &shutdown)
            .await
            .unwrap();

        let filter = doc(json!({"_id": 1}));
        let update = doc(json!({"$inc": {"age": 1}, "$rename": {"age": "years"}}));
        let err = collection
            .update_one(&filter, &update, &UpdateOptions::default(), &shutdown)
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::Rejected(_)));

        let found = collection
            .find_one(&filter, &FindOneOptions::default(), &shutdown)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc(json!({"_id": 1, "age": 10})), found);
    }

    #[tokio::test]
    async fn update_cannot_change_the_id() {
        let (store, collection) = collection();
        let shutdown = ShutdownHandle::new().new_listener();
        collection
            .insert_one(&doc(json!({"_id": 1, "name": "Ash"})), &shutdown)
            .await
            .unwrap();

        let err = collection
            .update_one(
                &doc(json!({"name": "Ash"})),
                &doc(json!({"$set": {"_id": 2}})),
                &UpdateOptions::default(),
                &shutdown,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::Rejected(_)));

        // The id is still taken.
        let err = collection
            .insert_one(&doc(json!({"_id": 1})), &shutdown)
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::Rejected(_)));
        assert_eq!(1, store.document_count("perf", "items"));
    }

    #[tokio::test]
    async fn update_without_change_modifies_nothing() {
        let (_store, collection) = collection();
        let shutdown = ShutdownHandle::new().new_listener();
        collection
            .insert_one(&doc(json!({"name": "Ash"})), &shutdown)
            .await
            .unwrap();

        let modified = collection
            .update_one(
                &doc(json!({"name": "Ash"})),
                &doc(json!({"$set": {"name": "Ash"}})),
                &UpdateOptions::default(),
                &shutdown,
            )
            .await
            .unwrap();
        assert_eq!(0, modified);
    }

    #[tokio::test]
    async fn upsert_inserts_from_filter() {
        let (store, collection) = collection();
        let shutdown = ShutdownHandle::new().new_listener();
        let options = UpdateOptions { upsert: Some(true) };

        let modified = collection
            .update_one(
                &doc(json!({"name": "Elm"})),
                &doc(json!({"$set": {"age": 3}})),
                &options,
                &shutdown,
            )
            .await
            .unwrap();
        assert_eq!(0, modified);
        assert_eq!(1, store.document_count("perf", "items"));
    }

    #[tokio::test]
    async fn replacement_update_is_rejected() {
        let (_store, collection) = collection();
        let shutdown = ShutdownHandle::new().new_listener();

        let err = collection
            .update_one(
                &Document::new(),
                &doc(json!({"name": "Elm"})),
                &UpdateOptions::default(),
                &shutdown,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::Rejected(_)));
    }

    #[tokio::test]
    async fn latency_is_cut_short_by_shutdown() {
        let store = InMemoryStore::new().with_latency(Duration::from_secs(30));
        let collection = store.collection("perf", "items");
        let handle = ShutdownHandle::new();
        let shutdown = handle.new_listener();

        let firing = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            firing.shutdown();
        });

        let err = collection
            .insert_one(&doc(json!({"a": 1})), &shutdown)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(0, store.document_count("perf", "items"));
    }

    #[test]
    fn increment_mixes_integers_and_floats() {
        assert_eq!(json!(3), increment("n", &json!(1), &json!(2)).unwrap());
        assert_eq!(json!(1.5), increment("n", &json!(1), &json!(0.5)).unwrap());
        assert!(increment("n", &json!("x"), &json!(1)).is_err());
    }
}

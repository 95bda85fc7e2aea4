//! The seam between the runner and the data store under test.
//!
//! A [Store] hands out [Collection] handles. Every call on a collection returns a boxed future so
//! that both traits stay object safe and can be shared between workers as [DynStore] and
//! [DynCollection].

mod in_memory;

use std::fmt::Debug;
use std::sync::Arc;

use futures::future::BoxFuture;
use mongoperf_core::prelude::{DelegatedShutdownListener, OperationError};
use serde::Deserialize;
use serde_json::{Map, Value};

pub use in_memory::InMemoryStore;

/// A document as read from a scenario file.
pub type Document = Map<String, Value>;

pub type DynStore = Arc<dyn Store>;
pub type DynCollection = Arc<dyn Collection>;

pub trait Store: Debug + Send + Sync {
    /// A printable description of where the store lives. Must not contain credentials.
    fn connection_target(&self) -> String;

    fn collection(&self, database: &str, collection: &str) -> DynCollection;
}

/// One call per supported action.
///
/// The shutdown listener is advisory. An implementation may abort a call that is in flight when
/// the run is cancelled and return [OperationError::Cancelled].
pub trait Collection: Debug + Send + Sync {
    /// Returns the number of documents inserted.
    fn insert_one<'a>(
        &'a self,
        document: &'a Document,
        shutdown: &'a DelegatedShutdownListener,
    ) -> BoxFuture<'a, Result<u64, OperationError>>;

    /// Returns the number of documents inserted.
    fn insert_many<'a>(
        &'a self,
        documents: &'a [Document],
        shutdown: &'a DelegatedShutdownListener,
    ) -> BoxFuture<'a, Result<u64, OperationError>>;

    /// Returns the number of documents modified. An upserted document is not counted as modified.
    fn update_one<'a>(
        &'a self,
        filter: &'a Document,
        update: &'a Document,
        options: &'a UpdateOptions,
        shutdown: &'a DelegatedShutdownListener,
    ) -> BoxFuture<'a, Result<u64, OperationError>>;

    fn find_one<'a>(
        &'a self,
        filter: &'a Document,
        options: &'a FindOneOptions,
        shutdown: &'a DelegatedShutdownListener,
    ) -> BoxFuture<'a, Result<Option<Document>, OperationError>>;

    /// Returns the number of documents read from the result cursor.
    fn find<'a>(
        &'a self,
        filter: &'a Document,
        options: &'a FindOptions,
        shutdown: &'a DelegatedShutdownListener,
    ) -> BoxFuture<'a, Result<u64, OperationError>>;
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct FindOptions {
    pub limit: Option<i64>,
    pub skip: Option<u64>,
    pub sort: Option<Document>,
    pub projection: Option<Document>,
    pub batch_size: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct FindOneOptions {
    pub skip: Option<u64>,
    pub sort: Option<Document>,
    pub projection: Option<Document>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct UpdateOptions {
    pub upsert: Option<bool>,
}

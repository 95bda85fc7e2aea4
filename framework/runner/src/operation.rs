use std::sync::Arc;

use mongoperf_core::prelude::{ActionKind, DelegatedShutdownListener, OperationError};
use mongoperf_instruments::prelude::{OperationOutcome, OperationRecord};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::definition::{OperationDefinition, Params};
use crate::error::ConfigError;
use crate::store::{Collection, Document, FindOneOptions, FindOptions, UpdateOptions};

const DATA: &str = "Data";
const UPDATE: &str = "Update";
const FILTER: &str = "Filter";
const OPTIONS: &str = "Options";

/// An operation bound to its parameters, ready to be executed any number of times.
#[derive(Debug)]
pub struct Operation {
    name: Arc<str>,
    kind: OperationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    InsertOne {
        document: Document,
    },
    InsertMany {
        documents: Vec<Document>,
    },
    UpdateOne {
        filter: Document,
        update: Document,
        options: UpdateOptions,
    },
    FindOne {
        filter: Document,
        options: FindOneOptions,
    },
    Find {
        filter: Document,
        options: FindOptions,
    },
}

impl Operation {
    /// Build an operation from its definition.
    ///
    /// Fails if the action is not supported or a parameter the action needs is missing or does not
    /// have the expected shape. Performs no I/O.
    pub fn from_definition(definition: &OperationDefinition) -> Result<Self, ConfigError> {
        let name = definition.name.as_str();
        let action = definition
            .action
            .parse::<ActionKind>()
            .map_err(|e| ConfigError::UnsupportedAction {
                name: name.to_string(),
                action: e.action,
            })?;
        let params = Meta {
            name,
            params: &definition.params,
        };

        let kind = match action {
            ActionKind::InsertOne => {
                let document = params
                    .document(DATA)?
                    .filter(|d| !d.is_empty())
                    .ok_or_else(|| params.empty_payload())?;
                OperationKind::InsertOne { document }
            }
            ActionKind::InsertMany => {
                let documents = params
                    .documents(DATA)?
                    .filter(|d| !d.is_empty())
                    .ok_or_else(|| params.empty_payload())?;
                OperationKind::InsertMany { documents }
            }
            ActionKind::UpdateOne => {
                let filter = params.required_document(FILTER)?;
                let update = match params.document(UPDATE)? {
                    Some(update) => update,
                    None => params.document(DATA)?.ok_or(ConfigError::MissingField {
                        name: name.to_string(),
                        field: DATA,
                    })?,
                };
                if update.is_empty() {
                    return Err(params.empty_payload());
                }
                OperationKind::UpdateOne {
                    filter,
                    update,
                    options: params.options()?,
                }
            }
            ActionKind::FindOne => OperationKind::FindOne {
                filter: params.required_document(FILTER)?,
                options: params.options()?,
            },
            ActionKind::Find => OperationKind::Find {
                filter: params.required_document(FILTER)?,
                options: params.options()?,
            },
        };

        Ok(Self {
            name: definition.name.as_str().into(),
            kind,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    pub fn action(&self) -> ActionKind {
        match self.kind {
            OperationKind::InsertOne { .. } => ActionKind::InsertOne,
            OperationKind::InsertMany { .. } => ActionKind::InsertMany,
            OperationKind::UpdateOne { .. } => ActionKind::UpdateOne,
            OperationKind::FindOne { .. } => ActionKind::FindOne,
            OperationKind::Find { .. } => ActionKind::Find,
        }
    }

    /// Issue one request against `collection` and time it.
    ///
    /// Never fails, a failed request is captured on the returned outcome.
    pub async fn execute(
        &self,
        collection: &dyn Collection,
        shutdown: &DelegatedShutdownListener,
    ) -> OperationOutcome {
        let record = OperationRecord::new(self.name.clone(), self.action());

        let result = match &self.kind {
            OperationKind::InsertOne { document } => collection.insert_one(document, shutdown).await,
            OperationKind::InsertMany { documents } => {
                collection.insert_many(documents, shutdown).await
            }
            OperationKind::UpdateOne {
                filter,
                update,
                options,
            } => collection.update_one(filter, update, options, shutdown).await,
            OperationKind::FindOne { filter, options } => collection
                .find_one(filter, options, shutdown)
                .await
                .and_then(|found| found.map(|_| 1).ok_or(OperationError::NotFound)),
            OperationKind::Find { filter, options } => {
                collection.find(filter, options, shutdown).await
            }
        };

        record.finish(result)
    }
}

/// Typed access to the parameters of one operation, producing errors that name the operation.
struct Meta<'a> {
    name: &'a str,
    params: &'a Params,
}

impl Meta<'_> {
    fn malformed(&self, field: &'static str, reason: impl ToString) -> ConfigError {
        ConfigError::MalformedField {
            name: self.name.to_string(),
            field,
            reason: reason.to_string(),
        }
    }

    fn empty_payload(&self) -> ConfigError {
        ConfigError::EmptyPayload {
            name: self.name.to_string(),
        }
    }

    fn document(&self, field: &'static str) -> Result<Option<Document>, ConfigError> {
        match self.params.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(document)) => Ok(Some(document.clone())),
            Some(_) => Err(self.malformed(field, "expected a document")),
        }
    }

    fn required_document(&self, field: &'static str) -> Result<Document, ConfigError> {
        self.document(field)?.ok_or_else(|| ConfigError::MissingField {
            name: self.name.to_string(),
            field,
        })
    }

    fn documents(&self, field: &'static str) -> Result<Option<Vec<Document>>, ConfigError> {
        match self.params.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_object()
                        .cloned()
                        .ok_or_else(|| self.malformed(field, "expected a list of documents"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(self.malformed(field, "expected a list of documents")),
        }
    }

    fn options<T: DeserializeOwned + Default>(&self) -> Result<T, ConfigError> {
        match self.params.get(OPTIONS) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(options) => {
                serde_json::from_value(options.clone()).map_err(|e| self.malformed(OPTIONS, e))
            }
        }
    }
}

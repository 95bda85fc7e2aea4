use std::future::IntoFuture;

use futures::future::BoxFuture;
use mongodb::bson::{self, Document as BsonDocument};
use mongodb::options;
use mongoperf_core::prelude::{DelegatedShutdownListener, OperationError};
use mongoperf_runner::prelude::{
    Collection, Document, FindOneOptions, FindOptions, UpdateOptions,
};

use crate::error::handle_driver_err;

/// Adapts a driver collection to the runner's [Collection].
///
/// Every request is raced against the shutdown signal and abandoned if the run is cancelled while
/// it is in flight.
#[derive(Debug)]
pub(crate) struct MongoCollection(mongodb::Collection<BsonDocument>);

impl MongoCollection {
    pub(crate) fn new(collection: mongodb::Collection<BsonDocument>) -> Self {
        Self(collection)
    }
}

fn to_bson(document: &Document) -> Result<BsonDocument, OperationError> {
    bson::to_document(document).map_err(|e| OperationError::Encoding(e.to_string()))
}

fn to_bson_opt(document: &Option<Document>) -> Result<Option<BsonDocument>, OperationError> {
    document.as_ref().map(to_bson).transpose()
}

fn find_options(options: &FindOptions) -> Result<options::FindOptions, OperationError> {
    let mut find_options = options::FindOptions::default();
    find_options.limit = options.limit;
    find_options.skip = options.skip;
    find_options.batch_size = options.batch_size;
    find_options.sort = to_bson_opt(&options.sort)?;
    find_options.projection = to_bson_opt(&options.projection)?;
    Ok(find_options)
}

fn find_one_options(options: &FindOneOptions) -> Result<options::FindOneOptions, OperationError> {
    let mut find_one_options = options::FindOneOptions::default();
    find_one_options.skip = options.skip;
    find_one_options.sort = to_bson_opt(&options.sort)?;
    find_one_options.projection = to_bson_opt(&options.projection)?;
    Ok(find_one_options)
}

fn update_options(options: &UpdateOptions) -> options::UpdateOptions {
    let mut update_options = options::UpdateOptions::default();
    update_options.upsert = options.upsert;
    update_options
}

impl Collection for MongoCollection {
    fn insert_one<'a>(
        &'a self,
        document: &'a Document,
        shutdown: &'a DelegatedShutdownListener,
    ) -> BoxFuture<'a, Result<u64, OperationError>> {
        Box::pin(async move {
            let document = to_bson(document)?;
            shutdown
                .run_cancellable(self.0.insert_one(document).into_future())
                .await?
                .map_err(handle_driver_err)?;

            Ok(1)
        })
    }

    fn insert_many<'a>(
        &'a self,
        documents: &'a [Document],
        shutdown: &'a DelegatedShutdownListener,
    ) -> BoxFuture<'a, Result<u64, OperationError>> {
        Box::pin(async move {
            let documents = documents
                .iter()
                .map(to_bson)
                .collect::<Result<Vec<_>, _>>()?;
            let result = shutdown
                .run_cancellable(self.0.insert_many(documents).into_future())
                .await?
                .map_err(handle_driver_err)?;

            Ok(result.inserted_ids.len() as u64)
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
            let filter = to_bson(filter)?;
            let update = to_bson(update)?;
            let result = shutdown
                .run_cancellable(
                    self.0
                        .update_one(filter, update)
                        .with_options(update_options(options))
                        .into_future(),
                )
                .await?
                .map_err(handle_driver_err)?;

            Ok(result.modified_count)
        })
    }

    fn find_one<'a>(
        &'a self,
        filter: &'a Document,
        options: &'a FindOneOptions,
        shutdown: &'a DelegatedShutdownListener,
    ) -> BoxFuture<'a, Result<Option<Document>, OperationError>> {
        Box::pin(async move {
            let filter = to_bson(filter)?;
            let found = shutdown
                .run_cancellable(
                    self.0
                        .find_one(filter)
                        .with_options(find_one_options(options)?)
                        .into_future(),
                )
                .await?
                .map_err(handle_driver_err)?;

            found
                .map(|document| {
                    match bson::Bson::Document(document).into_relaxed_extjson() {
                        serde_json::Value::Object(document) => Ok(document),
                        _ => Err(OperationError::Encoding(
                            "document did not convert to a JSON object".to_string(),
                        )),
                    }
                })
                .transpose()
        })
    }

    fn find<'a>(
        &'a self,
        filter: &'a Document,
        options: &'a FindOptions,
        shutdown: &'a DelegatedShutdownListener,
    ) -> BoxFuture<'a, Result<u64, OperationError>> {
        Box::pin(async move {
            let filter = to_bson(filter)?;
            let find = self.0.find(filter).with_options(find_options(options)?);

            // The whole cursor is read so that the measured time covers every batch.
            shutdown
                .run_cancellable(async move {
                    let mut cursor = find.await?;
                    let mut count = 0;
                    while cursor.advance().await? {
                        count += 1;
                    }
                    Ok::<_, mongodb::error::Error>(count)
                })
                .await?
                .map_err(handle_driver_err)
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn find_options_are_translated() {
        let options = FindOptions {
            limit: Some(10),
            skip: Some(5),
            sort: Some(doc(json!({"age": -1}))),
            projection: None,
            batch_size: Some(100),
        };

        let translated = find_options(&options).unwrap();
        assert_eq!(Some(10), translated.limit);
        assert_eq!(Some(5), translated.skip);
        assert_eq!(Some(100), translated.batch_size);
        assert_eq!(Some(bson::doc! {"age": -1_i64}), translated.sort);
        assert_eq!(None, translated.projection);
    }

    #[test]
    fn upsert_is_translated() {
        let translated = update_options(&UpdateOptions { upsert: Some(true) });
        assert_eq!(Some(true), translated.upsert);
    }

    #[test]
    fn json_documents_convert_to_bson() {
        let converted = to_bson(&doc(json!({"name": "Ash", "age": 10, "tags": ["a"]}))).unwrap();
        assert_eq!("Ash", converted.get_str("name").unwrap());
        assert_eq!(10, converted.get_i64("age").unwrap());
    }
}

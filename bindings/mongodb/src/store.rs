use std::sync::Arc;

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;
use mongoperf_runner::prelude::{ConnectionError, DynCollection, DynStore, Store};

use crate::collection::MongoCollection;

/// A connected MongoDB deployment.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    target: String,
}

impl MongoStore {
    /// Connect to the deployment at `uri` and check that it answers a ping.
    ///
    /// The driver connects lazily, so the ping is what surfaces an unreachable deployment or bad
    /// credentials before a run starts.
    pub async fn connect(uri: &str) -> Result<Self, ConnectionError> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|e| ConnectionError {
                target: "the configured URI".to_string(),
                reason: e.to_string(),
            })?;
        let target = connection_target(&options);

        let client = Client::with_options(options).map_err(|e| ConnectionError {
            target: target.clone(),
            reason: e.to_string(),
        })?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ConnectionError {
                target: target.clone(),
                reason: e.to_string(),
            })?;

        log::debug!("Ping to {} succeeded", target);

        Ok(Self { client, target })
    }

    /// Connect and erase the type, for handing to the runner.
    pub async fn connect_dyn(uri: String) -> Result<DynStore, ConnectionError> {
        Ok(Arc::new(Self::connect(&uri).await?))
    }
}

impl Store for MongoStore {
    fn connection_target(&self) -> String {
        self.target.clone()
    }

    fn collection(&self, database: &str, collection: &str) -> DynCollection {
        Arc::new(MongoCollection::new(
            self.client.database(database).collection(collection),
        ))
    }
}

/// The hosts of the deployment. Credentials are never part of the result.
fn connection_target(options: &ClientOptions) -> String {
    let hosts = options
        .hosts
        .iter()
        .map(|host| host.to_string())
        .collect::<Vec<_>>()
        .join(",");

    format!("mongodb://{}", hosts)
}

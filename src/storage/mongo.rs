//! MongoDB store

use super::{PersistenceGateway, StorageError, StorageResult};
use crate::config::StorageSettings;
use crate::types::LogRecord;
use async_trait::async_trait;
use mongodb::bson::{doc, DateTime, Document};
use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, Collection};
use tracing::info;

/// Writes records into `<database>.<collection>`
pub struct MongoStore {
    client: Client,
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connect with the configured URI and credential, then ping the server
    pub async fn connect(settings: &StorageSettings) -> StorageResult<Self> {
        let mut options = ClientOptions::parse(&settings.uri)
            .await
            .map_err(|e| StorageError::Connect(e.to_string()))?;
        options.credential = Some(
            Credential::builder()
                .username(Some(settings.username.clone()))
                .password(Some(settings.password.clone()))
                .build(),
        );

        let client = Client::with_options(options)
            .map_err(|e| StorageError::Connect(e.to_string()))?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StorageError::Connect(e.to_string()))?;

        info!("Connected to mongo at {}", settings.uri);

        let collection = client
            .database(&settings.database)
            .collection::<Document>(&settings.collection);
        Ok(Self { client, collection })
    }
}

#[async_trait]
impl PersistenceGateway for MongoStore {
    async fn insert(&self, record: LogRecord) -> StorageResult<()> {
        let now = DateTime::now();
        let (name, data) = record.into_parts();
        self.collection
            .insert_one(doc! {
                "name": name,
                "data": data,
                "created_at": now,
                "updated_at": now,
            })
            .await
            .map_err(|e| StorageError::Write(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mongo"
    }
}

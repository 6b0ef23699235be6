//! MongoDB client and collection wrapper

use bson::{doc, Document};
use mongodb::{
    gridfs::GridFsBucket,
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::types::CountersignError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify the server answers a ping
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, CountersignError> {
        info!("Connecting to MongoDB database '{}'", db_name);

        // Bound server selection so an unreachable cluster fails startup quickly
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=5000&connectTimeoutMS=5000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=5000&connectTimeoutMS=5000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri).await.map_err(|e| {
            CountersignError::Persistence(format!("Failed to connect to MongoDB: {}", e))
        })?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CountersignError::Persistence(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection, creating its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, CountersignError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// The default GridFS bucket of the database
    pub fn gridfs(&self) -> GridFsBucket {
        self.client.database(&self.db_name).gridfs_bucket(None)
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, CountersignError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<(), CountersignError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| CountersignError::Persistence(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, CountersignError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| CountersignError::Persistence(format!("Find failed: {}", e)))
    }

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, CountersignError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| CountersignError::Persistence(format!("Update failed: {}", e)))
    }
}

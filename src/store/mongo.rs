//! MongoDB document store
//!
//! Quotes live in the `quotes` collection, PDFs in the default GridFS bucket
//! tagged with `metadata.{type, quote_id, role}`.

use bson::{doc, Bson, DateTime as BsonDateTime, Document};
use bytes::Bytes;
use futures_util::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use super::{DocumentStore, SignatureRecord};
use crate::db::{MongoClient, MongoCollection, QuoteDoc, QUOTE_COLLECTION};
use crate::types::{BlobKind, BlobRef, CountersignError, QuoteStatus, Result, Role};

/// MongoDB + GridFS backed store
pub struct MongoDocumentStore {
    mongo: MongoClient,
    quotes: MongoCollection<QuoteDoc>,
}

impl MongoDocumentStore {
    /// Open the quotes collection (creating its indexes) on a connected client
    pub async fn new(mongo: MongoClient) -> Result<Self> {
        let quotes = mongo.collection::<QuoteDoc>(QUOTE_COLLECTION).await?;
        Ok(Self { mongo, quotes })
    }

    fn blob_filter(kind: BlobKind, quote_id: &str, role: Option<Role>) -> Document {
        let mut filter = doc! {
            "metadata.type": kind.as_str(),
            "metadata.quote_id": quote_id,
        };
        if let Some(role) = role {
            filter.insert("metadata.role", role.as_str());
        }
        filter
    }

    async fn download(&self, id: Bson) -> Result<Bytes> {
        let mut stream = self
            .mongo
            .gridfs()
            .open_download_stream(id)
            .await
            .map_err(|e| CountersignError::Persistence(format!("GridFS open failed: {}", e)))?;

        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .await
            .map_err(|e| CountersignError::Persistence(format!("GridFS read failed: {}", e)))?;
        Ok(Bytes::from(buf))
    }
}

/// `status` computed server-side from both flags after they are set
fn status_stage() -> Document {
    let buyer = doc! { "$eq": ["$buyer.signed", true] };
    let seller = doc! { "$eq": ["$seller.signed", true] };
    doc! {
        "$set": {
            "status": {
                "$switch": {
                    "branches": [
                        { "case": { "$and": [buyer.clone(), seller.clone()] }, "then": QuoteStatus::FullySigned.as_str() },
                        { "case": buyer, "then": QuoteStatus::BuyerSigned.as_str() },
                        { "case": seller, "then": QuoteStatus::SellerSigned.as_str() },
                    ],
                    "default": QuoteStatus::Pending.as_str(),
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn find_by_token_identifier(&self, identifier: &str) -> Result<Option<QuoteDoc>> {
        self.quotes
            .find_one(doc! {
                "$or": [
                    { "buyer.token_hash": identifier },
                    { "seller.token_hash": identifier },
                ]
            })
            .await
    }

    async fn find_quote(&self, quote_id: &str) -> Result<Option<QuoteDoc>> {
        self.quotes.find_one(doc! { "quote_id": quote_id }).await
    }

    async fn get_blob(
        &self,
        kind: BlobKind,
        quote_id: &str,
        role: Option<Role>,
    ) -> Result<Option<Bytes>> {
        let file = self
            .mongo
            .gridfs()
            .find_one(Self::blob_filter(kind, quote_id, role))
            .sort(doc! { "uploadDate": -1 })
            .await?;

        match file {
            Some(file) => Ok(Some(self.download(file.id).await?)),
            None => Ok(None),
        }
    }

    async fn get_blob_by_ref(&self, blob_ref: BlobRef) -> Result<Option<Bytes>> {
        let id = Bson::ObjectId(blob_ref.object_id());
        let file = self
            .mongo
            .gridfs()
            .find_one(doc! { "_id": id.clone() })
            .await?;

        match file {
            Some(_) => Ok(Some(self.download(id).await?)),
            None => Ok(None),
        }
    }

    async fn put_blob(
        &self,
        bytes: Bytes,
        kind: BlobKind,
        quote_id: &str,
        role: Option<Role>,
    ) -> Result<BlobRef> {
        let blob_ref = BlobRef::new();
        let (filename, metadata) = match role {
            Some(role) => (
                format!("{}-{}-signed.pdf", quote_id, role),
                doc! { "type": kind.as_str(), "quote_id": quote_id, "role": role.as_str() },
            ),
            None => (
                format!("{}.pdf", quote_id),
                doc! { "type": kind.as_str(), "quote_id": quote_id },
            ),
        };

        let mut upload = self
            .mongo
            .gridfs()
            .open_upload_stream(&filename)
            .id(Bson::ObjectId(blob_ref.object_id()))
            .metadata(metadata)
            .await?;

        upload
            .write_all(&bytes)
            .await
            .map_err(|e| CountersignError::Persistence(format!("GridFS write failed: {}", e)))?;
        upload
            .close()
            .await
            .map_err(|e| CountersignError::Persistence(format!("GridFS close failed: {}", e)))?;

        debug!(quote_id = %quote_id, blob = %blob_ref, size = bytes.len(), "Stored {}", filename);
        Ok(blob_ref)
    }

    async fn commit_signature(
        &self,
        quote_id: &str,
        role: Role,
        record: SignatureRecord,
    ) -> Result<bool> {
        let signed_path = format!("{}.signed", role);

        let mut filter = doc! { "quote_id": quote_id };
        filter.insert(signed_path.clone(), doc! { "$ne": true });

        let mut fields = Document::new();
        fields.insert(signed_path, true);
        fields.insert(
            format!("{}.signed_at", role),
            BsonDateTime::from_chrono(record.signed_at),
        );
        fields.insert(format!("{}.file_id", role), record.artifact_ref.object_id());
        fields.insert("metadata.updated_at", BsonDateTime::now());

        let pipeline = vec![doc! { "$set": fields }, status_stage()];

        let result = self.quotes.update_one(filter, pipeline).await?;
        Ok(result.matched_count == 1)
    }
}

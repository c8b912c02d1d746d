// # Digest Store Trait
//
// Persistence for weekly digest documents. The short name
// (`best-of-<week>-<year>`) is the idempotency key: the digest builder
// looks it up before composing anything and saves at most once per bucket.

use async_trait::async_trait;

use crate::model::DigestDocument;

#[async_trait]
pub trait DigestStore: Send + Sync {
    /// Look up a digest by short name
    ///
    /// # Returns
    ///
    /// - `Ok(Some(doc))`: a digest already exists for the bucket
    /// - `Ok(None)`: no digest yet
    /// - `Err(Error)`: storage error
    async fn find_by_short_name(
        &self,
        short_name: &str,
    ) -> Result<Option<DigestDocument>, crate::Error>;

    /// Persist a new digest, returning it with its assigned id
    async fn save(&self, document: DigestDocument) -> Result<DigestDocument, crate::Error>;
}

//! The resource walk a report runs over.

use std::io::Read;

use sha2::{Digest, Sha256};

use crate::error::ServiceResult;

/// One member resource of a calendar collection.
pub trait Resource {
    /// Path the resource is reported under.
    fn href(&self) -> &str;

    fn etag(&self) -> &str;

    /// Opens the resource body for streaming.
    ///
    /// ## Errors
    /// Returns an I/O error if the body cannot be opened.
    fn open(&self) -> std::io::Result<impl Read>;
}

/// An ordered listing of member resources.
///
/// The root and depth of the walk belong to the implementation.
pub trait ResourceWalk {
    type Resource: Resource;

    /// ## Errors
    /// Returns an error if the collection cannot be listed.
    fn resources(&self) -> ServiceResult<Vec<Self::Resource>>;
}

/// ## Summary
/// Generates an `ETag` from canonical bytes using SHA256.
///
/// The `ETag` is the hex-encoded SHA256 hash of the content, wrapped in quotes.
#[must_use]
pub fn generate_etag(canonical_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_bytes);
    let hash = hasher.finalize();
    format!("\"{}\"", hex::encode(hash))
}

/// ## Summary
/// Derives a collection `ETag` from its member etags in walk order.
///
/// Reordering or changing a member changes the result.
///
/// ## Errors
/// Returns an error if the walk fails.
#[tracing::instrument(skip_all)]
pub fn collection_etag<W: ResourceWalk>(walk: &W) -> ServiceResult<String> {
    let mut hasher = Sha256::new();
    let resources = walk.resources()?;
    for resource in &resources {
        hasher.update(resource.etag().as_bytes());
        hasher.update(b"\n");
    }
    tracing::debug!(members = resources.len(), "Computed collection etag");
    Ok(format!("\"{}\"", hex::encode(hasher.finalize())))
}

//! Attachment metadata source.
//!
//! The permitting database is reached through [`MetadataSource`]. Results
//! are raw: blank parcel ids, duplicates, and empty address columns are
//! cleaned up by [`RunContext`](crate::context::RunContext), not here.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AttachmentMetadata, FolderLink, PermitRow, TaxRow};

/// Lookups against the permitting database.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Descriptive record of an attachment, if it exists.
    async fn attachment_metadata(&self, attachment_id: i64) -> Result<Option<AttachmentMetadata>>;

    /// Folder linkage of an attachment, if it belongs to a folder.
    async fn folder_link(&self, attachment_id: i64) -> Result<Option<FolderLink>>;

    /// Parcel ids linked to a folder, in link order.
    async fn parcel_ids(&self, folder_key: i64) -> Result<Vec<String>>;

    /// Permit rows for a folder; the first row is the primary permit.
    async fn permit_rows(&self, link: &FolderLink) -> Result<Vec<PermitRow>>;

    /// Property rows for a parcel; the first row is the primary address.
    async fn tax_rows(&self, parcel_id: &str) -> Result<Vec<TaxRow>>;
}

//! Content-server abstraction.
//!
//! The loader talks to the ECM through the [`ContentServer`] trait. The
//! root package ships an HTTP client; [`memory::InMemoryContentServer`]
//! backs the tests.
//!
//! # Upload protocol
//!
//! ```text
//! create_document_context ─┐
//!                          ├─► context id ─► upload_content ─► object id
//! add_major_version_context┘
//! ```
//!
//! A context carries the metadata for the pending version; the content
//! stream that follows commits it.

pub mod memory;

use async_trait::async_trait;

use crate::category::{Metadata, RemoteTemplate};
use crate::error::Result;
use crate::models::{ContentReader, FileAttributes, FileContent, FolderNode, NodeId};

// ═══════════════════════════════════════════════════════════════════════
// ContentServer Trait
// ═══════════════════════════════════════════════════════════════════════

/// Operations the loader needs from the content server.
///
/// Lookups that find nothing return `Ok(None)`; `Err` is reserved for
/// transport and protocol failures.
#[async_trait]
pub trait ContentServer: Send + Sync {
    /// Fetch the template of a category.
    async fn category_template(&self, category_id: i64) -> Result<RemoteTemplate>;

    /// Fetch a node by id.
    async fn node(&self, node_id: NodeId) -> Result<Option<FolderNode>>;

    /// Walk `segments` down from `root_id`, matching names exactly.
    async fn node_by_path(&self, root_id: NodeId, segments: &[String])
        -> Result<Option<FolderNode>>;

    /// Find the child of `parent_id` named exactly `name`.
    async fn child_by_name(&self, parent_id: NodeId, name: &str) -> Result<Option<FolderNode>>;

    /// Create a folder with the given comment and metadata.
    async fn create_folder(
        &self,
        parent_id: NodeId,
        name: &str,
        comment: &str,
        metadata: &Metadata,
    ) -> Result<FolderNode>;

    /// Open a context for a new document under `parent_id`.
    async fn create_document_context(
        &self,
        parent_id: NodeId,
        name: &str,
        comment: &str,
        advanced_versioning: bool,
        metadata: &Metadata,
    ) -> Result<String>;

    /// Open a context for a new major version of `document_id`.
    async fn add_major_version_context(
        &self,
        document_id: NodeId,
        metadata: &Metadata,
    ) -> Result<String>;

    /// Stream content into an open context in frames of `chunk_size` bytes.
    /// Returns the id of the created object.
    async fn upload_content(
        &self,
        context_id: &str,
        attributes: FileAttributes,
        reader: ContentReader,
        chunk_size: usize,
    ) -> Result<NodeId>;

    /// Download the latest version of a document.
    async fn download_content(&self, document_id: NodeId) -> Result<FileContent>;

    /// End the authenticated session.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

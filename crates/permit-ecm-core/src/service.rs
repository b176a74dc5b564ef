//! Attachment upload orchestration.
//!
//! [`AttachmentService`] sequences one run: metadata lookup, folder
//! resolution, category assembly, then a create-document or add-version
//! request followed by the content stream. Each run gets its own
//! [`RunContext`] and a `run_id` on its tracing span.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::builders::build_document_info;
use crate::category::{AttributeSet, CategoryIds, CategoryTemplates, Metadata};
use crate::context::RunContext;
use crate::ecm::ContentServer;
use crate::error::{Error, Result};
use crate::models::{FileAttributes, FileContent, FolderNode, NodeId};
use crate::resolver::{FolderLayout, FolderPlan, FolderResolver, Labels};
use crate::source::MetadataSource;

/// Upload frame size in bytes.
pub const CHUNK_SIZE: usize = 10_240;

/// Name of a new document: `"{attachment_id}_{file_name}"`.
pub fn document_name(attachment_id: i64, file_name: &str) -> String {
    format!("{}_{}", attachment_id, file_name)
}

/// Everything an upload would send, computed without touching the tree.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentPlan {
    pub attachment_id: i64,
    pub document_info: AttributeSet,
    pub folder: FolderPlan,
    /// Metadata for the document: Tax Account (when present), Permit, then
    /// Document Info.
    pub document_metadata: Metadata,
}

/// Root folders found by [`AttachmentService::check`].
#[derive(Debug, Clone, Serialize)]
pub struct Roots {
    pub tax_account: FolderNode,
    pub no_tax_account: FolderNode,
}

/// Drives attachment runs against one metadata source and one content
/// server.
pub struct AttachmentService {
    source: Arc<dyn MetadataSource>,
    server: Arc<dyn ContentServer>,
    templates: CategoryTemplates,
    layout: FolderLayout,
    labels: Labels,
}

impl AttachmentService {
    /// Load and validate the category templates, then build the service.
    pub async fn start(
        source: Arc<dyn MetadataSource>,
        server: Arc<dyn ContentServer>,
        ids: &CategoryIds,
        layout: FolderLayout,
        labels: Labels,
    ) -> Result<Self> {
        let templates = CategoryTemplates::load(server.as_ref(), ids).await?;
        Ok(Self::with_templates(source, server, templates, layout, labels))
    }

    pub fn with_templates(
        source: Arc<dyn MetadataSource>,
        server: Arc<dyn ContentServer>,
        templates: CategoryTemplates,
        layout: FolderLayout,
        labels: Labels,
    ) -> Self {
        Self {
            source,
            server,
            templates,
            layout,
            labels,
        }
    }

    pub fn templates(&self) -> &CategoryTemplates {
        &self.templates
    }

    fn resolver(&self) -> FolderResolver<'_> {
        FolderResolver::new(
            self.server.as_ref(),
            &self.templates,
            &self.layout,
            &self.labels,
        )
    }

    /// Resolve both configured root paths.
    pub async fn check(&self) -> Result<Roots> {
        let resolver = self.resolver();
        Ok(Roots {
            tax_account: resolver.root(&self.layout.tax_account_path).await?,
            no_tax_account: resolver.root(&self.layout.no_tax_account_path).await?,
        })
    }

    /// Compute the categories and placement for an attachment without
    /// creating anything.
    pub async fn plan(&self, attachment_id: i64) -> Result<AttachmentPlan> {
        let mut ctx = RunContext::new(self.source.clone());
        let metadata = ctx.attachment_metadata(attachment_id).await?;
        let folder = self.resolver().plan(&mut ctx, attachment_id).await?;
        let document_info = build_document_info(&self.templates.document_info, &metadata)?;
        let document_metadata = document_metadata(&folder, &document_info);
        Ok(AttachmentPlan {
            attachment_id,
            document_info,
            folder,
            document_metadata,
        })
    }

    /// Upload `content` for an attachment.
    ///
    /// With no `existing_document_id` (or zero) a new document named
    /// `"{attachment_id}_{file_name}"` is created under the resolved folder;
    /// otherwise a new major version is added to the existing document.
    /// Returns the document id.
    pub async fn put_attachment(
        &self,
        attachment_id: i64,
        existing_document_id: Option<NodeId>,
        content: FileContent,
    ) -> Result<NodeId> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("put_attachment", %run_id, attachment_id);
        self.put_in_run(attachment_id, existing_document_id, content)
            .instrument(span)
            .await
    }

    async fn put_in_run(
        &self,
        attachment_id: i64,
        existing_document_id: Option<NodeId>,
        content: FileContent,
    ) -> Result<NodeId> {
        let started = Instant::now();
        tracing::info!(file = %content.file_name, size = content.size, "put attachment started");

        let mut ctx = RunContext::new(self.source.clone());
        let metadata = ctx.attachment_metadata(attachment_id).await?;

        let resolution = self
            .resolver()
            .resolve(&mut ctx, attachment_id)
            .await
            .map_err(|e| Error::FolderResolution {
                attachment_id,
                source: Box::new(e),
            })?;
        let parent_id = resolution.parent.id;

        let document_info = build_document_info(&self.templates.document_info, &metadata)?;
        let doc_metadata = document_metadata(&resolution.plan, &document_info);

        if content.size == 0 {
            return Err(Error::InvalidInput(format!(
                "file '{}' for attachment {} is empty",
                content.file_name, attachment_id
            )));
        }

        let existing = existing_document_id.filter(|id| *id != 0);
        let context_id = match existing {
            Some(document_id) => {
                self.server
                    .add_major_version_context(document_id, &doc_metadata)
                    .await?
            }
            None => {
                self.server
                    .create_document_context(
                        parent_id,
                        &document_name(attachment_id, &content.file_name),
                        &self.labels.document_comment,
                        true,
                        &doc_metadata,
                    )
                    .await?
            }
        };
        tracing::debug!(%context_id, parent_id, new_version = existing.is_some(), "upload context opened");

        let now = Utc::now();
        let attributes = FileAttributes {
            file_name: content.file_name.clone(),
            size: content.size,
            created: now,
            modified: now,
        };
        let object_id = self
            .server
            .upload_content(&context_id, attributes, content.reader, CHUNK_SIZE)
            .await?;

        let document_id = existing.unwrap_or(object_id);
        tracing::info!(
            document_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "put attachment complete"
        );
        Ok(document_id)
    }

    /// Download the latest version of a document under its node name.
    pub async fn get_attachment(&self, document_id: NodeId) -> Result<FileContent> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("get_attachment", %run_id, document_id);
        self.get_in_run(document_id).instrument(span).await
    }

    async fn get_in_run(&self, document_id: NodeId) -> Result<FileContent> {
        let started = Instant::now();
        let node = self
            .server
            .node(document_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("document {}", document_id)))?;
        let mut content = self.server.download_content(document_id).await?;
        content.file_name = node.name;
        tracing::info!(
            file = %content.file_name,
            size = content.size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "get attachment complete"
        );
        Ok(content)
    }

    /// End the content-server session.
    pub async fn close(&self) -> Result<()> {
        self.server.close().await
    }
}

fn document_metadata(folder: &FolderPlan, document_info: &AttributeSet) -> Metadata {
    let mut metadata = Metadata::new();
    if let Some(tax) = &folder.tax_account {
        metadata.push(tax.clone());
    }
    metadata.push(folder.permit.clone());
    metadata.push(document_info.clone());
    metadata
}

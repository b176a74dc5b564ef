//! In-memory [`ContentServer`] for tests and dry runs.
//!
//! Nodes, templates, and document versions live in `HashMap`s behind a
//! `std::sync::Mutex`. Every mutating call is counted in [`CallCounts`] so
//! tests can assert how many folders were created or chunks uploaded.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use crate::category::{schema_template, CategoryIds, CategoryKind, Metadata, RemoteTemplate};
use crate::error::{Error, Result};
use crate::models::{ContentReader, FileAttributes, FileContent, FolderNode, NodeId};

use super::ContentServer;

/// Counters for calls made against an [`InMemoryContentServer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub template_fetches: usize,
    pub child_lookups: usize,
    pub folder_creates: usize,
    pub document_creates: usize,
    pub version_adds: usize,
    pub uploads: usize,
    /// Frames read across all uploads.
    pub chunks: usize,
    pub downloads: usize,
    pub closes: usize,
}

/// A stored node and what was attached to it on creation.
#[derive(Debug, Clone)]
pub struct StoredNode {
    pub node: FolderNode,
    pub comment: String,
    pub metadata: Metadata,
    pub advanced_versioning: bool,
}

/// One committed document version.
#[derive(Debug, Clone)]
pub struct StoredVersion {
    pub attributes: FileAttributes,
    pub metadata: Metadata,
    pub bytes: Vec<u8>,
}

enum PendingContext {
    NewDocument {
        parent_id: NodeId,
        name: String,
        comment: String,
        advanced_versioning: bool,
        metadata: Metadata,
    },
    NewVersion {
        document_id: NodeId,
        metadata: Metadata,
    },
}

#[derive(Default)]
struct State {
    next_id: NodeId,
    nodes: HashMap<NodeId, StoredNode>,
    templates: HashMap<i64, RemoteTemplate>,
    failing_templates: HashSet<i64>,
    contexts: HashMap<String, PendingContext>,
    versions: HashMap<NodeId, Vec<StoredVersion>>,
    calls: CallCounts,
}

impl State {
    fn allocate_id(&mut self) -> NodeId {
        self.next_id += 1;
        self.next_id
    }

    fn insert_node(&mut self, parent_id: Option<NodeId>, name: &str) -> FolderNode {
        let node = FolderNode {
            id: self.allocate_id(),
            name: name.to_string(),
            parent_id,
        };
        self.nodes.insert(
            node.id,
            StoredNode {
                node: node.clone(),
                comment: String::new(),
                metadata: Metadata::new(),
                advanced_versioning: false,
            },
        );
        node
    }

    fn child(&self, parent_id: NodeId, name: &str) -> Option<FolderNode> {
        let mut matches: Vec<&StoredNode> = self
            .nodes
            .values()
            .filter(|n| n.node.parent_id == Some(parent_id) && n.node.name == name)
            .collect();
        matches.sort_by_key(|n| n.node.id);
        matches.first().map(|n| n.node.clone())
    }
}

/// In-memory content server.
pub struct InMemoryContentServer {
    state: Mutex<State>,
}

impl InMemoryContentServer {
    /// An empty tree. Ids are allocated from 1000 upward.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1000,
                ..State::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register templates matching the named schemas under `ids`.
    pub fn with_schema_templates(self, ids: &CategoryIds) -> Self {
        self.add_template(schema_template(CategoryKind::DocumentInfo, ids.document_info));
        self.add_template(schema_template(CategoryKind::Permit, ids.permit));
        self.add_template(schema_template(CategoryKind::TaxAccount, ids.tax_account));
        self
    }

    pub fn add_template(&self, template: RemoteTemplate) {
        self.state().templates.insert(template.id, template);
    }

    /// Make fetches of `category_id` fail with a transport error.
    pub fn fail_template(&self, category_id: i64) {
        self.state().failing_templates.insert(category_id);
    }

    /// Create a root-level node (no parent).
    pub fn add_root(&self, name: &str) -> FolderNode {
        self.state().insert_node(None, name)
    }

    /// Create each missing segment of `segments` under `root_id`, returning
    /// the last node. Used to seed fixture trees.
    pub fn ensure_path(&self, root_id: NodeId, segments: &[&str]) -> FolderNode {
        let mut state = self.state();
        let mut current = state
            .nodes
            .get(&root_id)
            .map(|n| n.node.clone())
            .unwrap_or(FolderNode {
                id: root_id,
                name: String::new(),
                parent_id: None,
            });
        for segment in segments {
            current = match state.child(current.id, segment) {
                Some(existing) => existing,
                None => state.insert_node(Some(current.id), segment),
            };
        }
        current
    }

    pub fn calls(&self) -> CallCounts {
        self.state().calls.clone()
    }

    pub fn stored_node(&self, node_id: NodeId) -> Option<StoredNode> {
        self.state().nodes.get(&node_id).cloned()
    }

    /// Committed versions of a document, oldest first.
    pub fn versions(&self, document_id: NodeId) -> Vec<StoredVersion> {
        self.state()
            .versions
            .get(&document_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Children of `parent_id` in creation order.
    pub fn children(&self, parent_id: NodeId) -> Vec<FolderNode> {
        let state = self.state();
        let mut children: Vec<FolderNode> = state
            .nodes
            .values()
            .filter(|n| n.node.parent_id == Some(parent_id))
            .map(|n| n.node.clone())
            .collect();
        children.sort_by_key(|n| n.id);
        children
    }
}

impl Default for InMemoryContentServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentServer for InMemoryContentServer {
    async fn category_template(&self, category_id: i64) -> Result<RemoteTemplate> {
        let mut state = self.state();
        state.calls.template_fetches += 1;
        if state.failing_templates.contains(&category_id) {
            return Err(Error::transport(format!(
                "template {} unavailable",
                category_id
            )));
        }
        state
            .templates
            .get(&category_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("category {}", category_id)))
    }

    async fn node(&self, node_id: NodeId) -> Result<Option<FolderNode>> {
        Ok(self.state().nodes.get(&node_id).map(|n| n.node.clone()))
    }

    async fn node_by_path(
        &self,
        root_id: NodeId,
        segments: &[String],
    ) -> Result<Option<FolderNode>> {
        let state = self.state();
        let Some(mut current) = state.nodes.get(&root_id).map(|n| n.node.clone()) else {
            return Ok(None);
        };
        for segment in segments {
            match state.child(current.id, segment) {
                Some(child) => current = child,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    async fn child_by_name(&self, parent_id: NodeId, name: &str) -> Result<Option<FolderNode>> {
        let mut state = self.state();
        state.calls.child_lookups += 1;
        Ok(state.child(parent_id, name))
    }

    async fn create_folder(
        &self,
        parent_id: NodeId,
        name: &str,
        comment: &str,
        metadata: &Metadata,
    ) -> Result<FolderNode> {
        let mut state = self.state();
        if !state.nodes.contains_key(&parent_id) {
            return Err(Error::NotFound(format!("parent node {}", parent_id)));
        }
        state.calls.folder_creates += 1;
        let node = state.insert_node(Some(parent_id), name);
        if let Some(stored) = state.nodes.get_mut(&node.id) {
            stored.comment = comment.to_string();
            stored.metadata = metadata.clone();
        }
        Ok(node)
    }

    async fn create_document_context(
        &self,
        parent_id: NodeId,
        name: &str,
        comment: &str,
        advanced_versioning: bool,
        metadata: &Metadata,
    ) -> Result<String> {
        let mut state = self.state();
        if !state.nodes.contains_key(&parent_id) {
            return Err(Error::NotFound(format!("parent node {}", parent_id)));
        }
        state.calls.document_creates += 1;
        let context_id = format!("ctx-{}", state.allocate_id());
        state.contexts.insert(
            context_id.clone(),
            PendingContext::NewDocument {
                parent_id,
                name: name.to_string(),
                comment: comment.to_string(),
                advanced_versioning,
                metadata: metadata.clone(),
            },
        );
        Ok(context_id)
    }

    async fn add_major_version_context(
        &self,
        document_id: NodeId,
        metadata: &Metadata,
    ) -> Result<String> {
        let mut state = self.state();
        if !state.nodes.contains_key(&document_id) {
            return Err(Error::NotFound(format!("document {}", document_id)));
        }
        state.calls.version_adds += 1;
        let context_id = format!("ctx-{}", state.allocate_id());
        state.contexts.insert(
            context_id.clone(),
            PendingContext::NewVersion {
                document_id,
                metadata: metadata.clone(),
            },
        );
        Ok(context_id)
    }

    async fn upload_content(
        &self,
        context_id: &str,
        attributes: FileAttributes,
        mut reader: ContentReader,
        chunk_size: usize,
    ) -> Result<NodeId> {
        let known = self.state().contexts.contains_key(context_id);
        if !known {
            return Err(Error::NotFound(format!("upload context {}", context_id)));
        }

        let mut bytes = Vec::new();
        let mut frame = vec![0u8; chunk_size.max(1)];
        let mut frames = 0usize;
        loop {
            let n = reader.read(&mut frame).await?;
            if n == 0 {
                break;
            }
            frames += 1;
            bytes.extend_from_slice(&frame[..n]);
        }

        let mut state = self.state();
        state.calls.uploads += 1;
        state.calls.chunks += frames;
        let context = state
            .contexts
            .remove(context_id)
            .ok_or_else(|| Error::NotFound(format!("upload context {}", context_id)))?;
        let (document_id, metadata) = match context {
            PendingContext::NewDocument {
                parent_id,
                name,
                comment,
                advanced_versioning,
                metadata,
            } => {
                let node = state.insert_node(Some(parent_id), &name);
                if let Some(stored) = state.nodes.get_mut(&node.id) {
                    stored.comment = comment;
                    stored.metadata = metadata.clone();
                    stored.advanced_versioning = advanced_versioning;
                }
                (node.id, metadata)
            }
            PendingContext::NewVersion {
                document_id,
                metadata,
            } => (document_id, metadata),
        };
        state
            .versions
            .entry(document_id)
            .or_default()
            .push(StoredVersion {
                attributes,
                metadata,
                bytes,
            });
        Ok(document_id)
    }

    async fn download_content(&self, document_id: NodeId) -> Result<FileContent> {
        let mut state = self.state();
        state.calls.downloads += 1;
        let name = state
            .nodes
            .get(&document_id)
            .map(|n| n.node.name.clone())
            .ok_or_else(|| Error::NotFound(format!("document {}", document_id)))?;
        let bytes = state
            .versions
            .get(&document_id)
            .and_then(|v| v.last())
            .map(|v| v.bytes.clone())
            .ok_or_else(|| Error::NotFound(format!("content of document {}", document_id)))?;
        Ok(FileContent::from_bytes(name, bytes))
    }

    async fn close(&self) -> Result<()> {
        self.state().calls.closes += 1;
        Ok(())
    }
}

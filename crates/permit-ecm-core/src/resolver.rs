//! Folder resolution.
//!
//! Decides where in the ECM tree an attachment is filed and creates the
//! missing folders on the way:
//!
//! ```text
//! START ─┬─ no tax account ─► <no-tax root>/<permit number>
//!        └─ tax account ────► <tax root>/<tax id>/<permit number>
//! ```
//!
//! Root paths are looked up, never created. Every other folder is
//! resolve-or-create: an exact-name child lookup, then a create with the
//! folder comment and metadata when nothing matched. There is no locking;
//! two runs creating the same folder at once may race.

use serde::Serialize;

use crate::builders::{build_document_info, build_permit_category, build_tax_account_category};
use crate::category::{AttributeSet, CategoryTemplates, Metadata};
use crate::context::RunContext;
use crate::ecm::ContentServer;
use crate::error::{Error, Result};
use crate::models::{AttachmentMetadata, FolderNode, NodeId};

/// Default source label written on created folders.
pub const DEFAULT_FOLDER_SOURCE: &str = "AMANDA Folder";
/// Default attachment-type label written on created folders.
pub const DEFAULT_FOLDER_TYPE: &str = "AMANDA-PRISM Loader Created Folder";
/// Default comment for created folders.
pub const DEFAULT_FOLDER_COMMENT: &str = "Folder Loaded by AMANDA-PRISM-Loader";
/// Default comment for created documents.
pub const DEFAULT_DOCUMENT_COMMENT: &str = "Uploaded by AMANDA EDMS Adaptor";

/// Where the two folder branches are rooted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLayout {
    pub workspace_root_id: NodeId,
    pub tax_account_path: Vec<String>,
    pub no_tax_account_path: Vec<String>,
}

/// Fixed labels and comments written by the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub folder_source: String,
    pub folder_type: String,
    pub folder_comment: String,
    pub document_comment: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            folder_source: DEFAULT_FOLDER_SOURCE.to_string(),
            folder_type: DEFAULT_FOLDER_TYPE.to_string(),
            folder_comment: DEFAULT_FOLDER_COMMENT.to_string(),
            document_comment: DEFAULT_DOCUMENT_COMMENT.to_string(),
        }
    }
}

/// Which branch of the tree an attachment lands in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "branch", rename_all = "snake_case")]
pub enum Placement {
    NoTaxAccount {
        root_path: Vec<String>,
        permit_folder: String,
    },
    TaxAccount {
        root_path: Vec<String>,
        tax_folder: String,
        permit_folder: String,
    },
}

impl Placement {
    pub fn root_path(&self) -> &[String] {
        match self {
            Placement::NoTaxAccount { root_path, .. } | Placement::TaxAccount { root_path, .. } => {
                root_path
            }
        }
    }

    /// Folder names below the root, outermost first.
    pub fn folders(&self) -> Vec<&str> {
        match self {
            Placement::NoTaxAccount { permit_folder, .. } => vec![permit_folder.as_str()],
            Placement::TaxAccount {
                tax_folder,
                permit_folder,
                ..
            } => vec![tax_folder.as_str(), permit_folder.as_str()],
        }
    }
}

/// Everything derived for an attachment before the tree is touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderPlan {
    pub permit: AttributeSet,
    pub tax_account: Option<AttributeSet>,
    /// Metadata for created folders: Document Info, Permit, then Tax Account.
    pub folder_metadata: Metadata,
    pub placement: Placement,
}

/// A plan together with the folder it resolved to.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub plan: FolderPlan,
    pub parent: FolderNode,
}

/// Resolves attachment folders against one content server.
pub struct FolderResolver<'a> {
    server: &'a dyn ContentServer,
    templates: &'a CategoryTemplates,
    layout: &'a FolderLayout,
    labels: &'a Labels,
}

impl<'a> FolderResolver<'a> {
    pub fn new(
        server: &'a dyn ContentServer,
        templates: &'a CategoryTemplates,
        layout: &'a FolderLayout,
        labels: &'a Labels,
    ) -> Self {
        Self {
            server,
            templates,
            layout,
            labels,
        }
    }

    /// Derive the categories and the placement without touching the tree.
    pub async fn plan(&self, ctx: &mut RunContext, attachment_id: i64) -> Result<FolderPlan> {
        let link = ctx.folder_link(attachment_id).await?;
        let rows = ctx.permit_rows(&link).await?;
        let permit = build_permit_category(&self.templates.permit, &rows)
            .map_err(|e| match e {
                Error::NotFound(_) => Error::NotFound(format!("permit rows for folder {}", link)),
                other => other,
            })?;
        let primary = &rows[0];
        if primary.permit_number.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "primary permit of folder {} has no number",
                link
            )));
        }

        let folder_info = build_document_info(
            &self.templates.document_info,
            &AttachmentMetadata {
                source: self.labels.folder_source.clone(),
                description: String::new(),
                kind: self.labels.folder_type.clone(),
            },
        )?;

        let parcel_ids = ctx.parcel_ids(&primary.folder_key).await?;
        let parcels = ctx.parcel_tax_rows(&parcel_ids).await?;
        let tax_account = build_tax_account_category(&self.templates.tax_account, &parcels)?;

        let permit_folder = primary.permit_number.clone();
        let placement = match &tax_account {
            Some(_) => Placement::TaxAccount {
                root_path: self.layout.tax_account_path.clone(),
                tax_folder: parcel_ids[0].clone(),
                permit_folder,
            },
            None => Placement::NoTaxAccount {
                root_path: self.layout.no_tax_account_path.clone(),
                permit_folder,
            },
        };
        tracing::debug!(attachment_id, folder = %link, ?placement, "folder placement planned");

        let mut folder_metadata = Metadata::new();
        folder_metadata.push(folder_info);
        folder_metadata.push(permit.clone());
        if let Some(tax) = &tax_account {
            folder_metadata.push(tax.clone());
        }

        Ok(FolderPlan {
            permit,
            tax_account,
            folder_metadata,
            placement,
        })
    }

    /// Plan, then walk the placement, creating missing folders.
    pub async fn resolve(&self, ctx: &mut RunContext, attachment_id: i64) -> Result<Resolution> {
        let plan = self.plan(ctx, attachment_id).await?;
        let mut parent = self.root(plan.placement.root_path()).await?;
        for name in plan.placement.folders() {
            parent = self
                .resolve_or_create(parent.id, name, &plan.folder_metadata)
                .await?;
        }
        Ok(Resolution { plan, parent })
    }

    /// Look up a configured root path under the workspace root.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the path does not exist; roots are never
    /// created.
    pub async fn root(&self, path: &[String]) -> Result<FolderNode> {
        if path.is_empty() {
            return Err(Error::InvalidInput("empty root path".to_string()));
        }
        self.server
            .node_by_path(self.layout.workspace_root_id, path)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "root path '{}' under node {}",
                    path.join("|"),
                    self.layout.workspace_root_id
                ))
            })
    }

    /// Reuse the child named `name` under `parent_id`, or create it.
    pub async fn resolve_or_create(
        &self,
        parent_id: NodeId,
        name: &str,
        metadata: &Metadata,
    ) -> Result<FolderNode> {
        if let Some(existing) = self.server.child_by_name(parent_id, name).await? {
            tracing::debug!(parent_id, name, node_id = existing.id, "folder found");
            return Ok(existing);
        }
        let created = self
            .server
            .create_folder(parent_id, name, &self.labels.folder_comment, metadata)
            .await?;
        tracing::info!(parent_id, name, node_id = created.id, "folder created");
        Ok(created)
    }
}

//! Named-field category schemas and the attribute sets built from them.
//!
//! The content server describes each category as a template: an ordered list
//! of attribute fields. This module pins the three categories the loader
//! writes to a named schema, validates the remote template against it once,
//! and lets the builders address fields by name instead of position.

use serde::{Deserialize, Serialize};

use crate::ecm::ContentServer;
use crate::error::{Error, Result};

/// Field names of the Document Info category, in template order.
pub mod document_info {
    pub const SOURCE: &str = "Document Source";
    pub const DESCRIPTION: &str = "Description";
    pub const ATTACHMENT_TYPE: &str = "Attachment Type";

    pub const FIELDS: &[&str] = &[SOURCE, DESCRIPTION, ATTACHMENT_TYPE];
}

/// Field names of the Permit category, in template order.
pub mod permit {
    pub const PERMIT_TYPE: &str = "Permit Type";
    pub const PERMIT_TYPE_DESCRIPTION: &str = "Permit Type Description";
    pub const PERMIT_NUMBER: &str = "Permit Number";
    pub const FOLDER_NAME: &str = "Folder Name";
    pub const RELATED_PERMITS: &str = "Related Permit Numbers";
    pub const LOCATION: &str = "Location";
    pub const FOLDER_KEY: &str = "Folder Key";
    pub const APPLICATION_TRACKING_NUMBER: &str = "Application Tracking Number";
    pub const SECTION_TOWNSHIP_RANGE: &str = "Section Township Range";
    pub const FOLDER_DESCRIPTION: &str = "Folder Description";
    pub const CONTACTS: &str = "Contacts";

    pub const FIELDS: &[&str] = &[
        PERMIT_TYPE,
        PERMIT_TYPE_DESCRIPTION,
        PERMIT_NUMBER,
        FOLDER_NAME,
        RELATED_PERMITS,
        LOCATION,
        FOLDER_KEY,
        APPLICATION_TRACKING_NUMBER,
        SECTION_TOWNSHIP_RANGE,
        FOLDER_DESCRIPTION,
        CONTACTS,
    ];
}

/// Field names of the Tax Account category, in template order.
pub mod tax_account {
    pub const TAX_ID: &str = "Tax ID";
    pub const ALTERNATE_TAX_ID: &str = "Alternate Tax ID";
    pub const RELATED_TAX_ACCOUNTS: &str = "Related Tax Account";
    pub const PROPERTY_ADDRESS: &str = "Property Address";
    pub const RELATED_PROPERTY_ADDRESSES: &str = "Related Property Address";
    pub const CITY: &str = "City";
    pub const ZIP: &str = "Zip";

    pub const FIELDS: &[&str] = &[
        TAX_ID,
        ALTERNATE_TAX_ID,
        RELATED_TAX_ACCOUNTS,
        PROPERTY_ADDRESS,
        RELATED_PROPERTY_ADDRESSES,
        CITY,
        ZIP,
    ];
}

/// The three categories the loader attaches to folders and documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    DocumentInfo,
    Permit,
    TaxAccount,
}

impl CategoryKind {
    /// Schema field names in template order.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            CategoryKind::DocumentInfo => document_info::FIELDS,
            CategoryKind::Permit => permit::FIELDS,
            CategoryKind::TaxAccount => tax_account::FIELDS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CategoryKind::DocumentInfo => "Document Info",
            CategoryKind::Permit => "Permit",
            CategoryKind::TaxAccount => "Tax Account",
        }
    }
}

/// One attribute slot of a remote category template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateField {
    /// Remote attribute key (e.g. `"31002_2"`).
    pub key: String,
    /// Display name on the content server.
    pub name: String,
}

/// A category template as returned by the content server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTemplate {
    pub id: i64,
    pub name: String,
    pub fields: Vec<TemplateField>,
}

/// A remote template validated against a [`CategoryKind`] schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTemplate {
    kind: CategoryKind,
    remote: RemoteTemplate,
}

impl CategoryTemplate {
    /// Validate `remote` against the schema of `kind`.
    ///
    /// The field count must match exactly. Positions are authoritative: a
    /// remote display name that differs from the schema name is logged and
    /// accepted.
    pub fn validate(kind: CategoryKind, remote: RemoteTemplate) -> Result<Self> {
        let expected = kind.fields();
        if remote.fields.len() != expected.len() {
            return Err(Error::Schema(format!(
                "{} template {} has {} fields, expected {}",
                kind.label(),
                remote.id,
                remote.fields.len(),
                expected.len()
            )));
        }
        for (field, name) in remote.fields.iter().zip(expected) {
            if !field.name.eq_ignore_ascii_case(name) {
                tracing::warn!(
                    category = kind.label(),
                    template_id = remote.id,
                    remote_name = %field.name,
                    schema_name = name,
                    "category field name differs from schema; using position"
                );
            }
        }
        Ok(Self { kind, remote })
    }

    pub fn kind(&self) -> CategoryKind {
        self.kind
    }

    pub fn id(&self) -> i64 {
        self.remote.id
    }

    /// A fresh attribute set with every field present and empty.
    pub fn instantiate(&self) -> AttributeSet {
        AttributeSet {
            category_id: self.remote.id,
            category_name: self.remote.name.clone(),
            kind: self.kind,
            fields: self
                .remote
                .fields
                .iter()
                .zip(self.kind.fields())
                .map(|(field, name)| AttributeField {
                    key: field.key.clone(),
                    name: (*name).to_string(),
                    values: Vec::new(),
                })
                .collect(),
        }
    }
}

/// One multi-value attribute of an [`AttributeSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeField {
    pub key: String,
    pub name: String,
    pub values: Vec<String>,
}

/// A flattened, ECM-ready category record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSet {
    pub category_id: i64,
    pub category_name: String,
    pub kind: CategoryKind,
    pub fields: Vec<AttributeField>,
}

impl AttributeSet {
    /// Replace the values of the named field.
    pub fn set(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        let kind = self.kind;
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| {
                Error::Schema(format!("{} has no field '{}'", kind.label(), name))
            })?;
        field.values = values;
        Ok(())
    }

    /// Values of the named field, if the field exists.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.values.as_slice())
    }

    /// First value of the named field.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }
}

/// Metadata payload attached to a folder or document: an ordered list of
/// attribute sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub groups: Vec<AttributeSet>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, set: AttributeSet) {
        self.groups.push(set);
    }

    pub fn group(&self, kind: CategoryKind) -> Option<&AttributeSet> {
        self.groups.iter().find(|g| g.kind == kind)
    }
}

/// Configured category ids on the content server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryIds {
    pub document_info: i64,
    pub permit: i64,
    pub tax_account: i64,
}

/// The three validated templates, fetched once when a service starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTemplates {
    pub document_info: CategoryTemplate,
    pub permit: CategoryTemplate,
    pub tax_account: CategoryTemplate,
}

impl CategoryTemplates {
    /// Fetch and validate all three templates.
    pub async fn load(server: &dyn ContentServer, ids: &CategoryIds) -> Result<Self> {
        let document_info = fetch(server, CategoryKind::DocumentInfo, ids.document_info).await?;
        let permit = fetch(server, CategoryKind::Permit, ids.permit).await?;
        let tax_account = fetch(server, CategoryKind::TaxAccount, ids.tax_account).await?;
        tracing::debug!(
            document_info = ids.document_info,
            permit = ids.permit,
            tax_account = ids.tax_account,
            "category templates loaded"
        );
        Ok(Self {
            document_info,
            permit,
            tax_account,
        })
    }
}

async fn fetch(
    server: &dyn ContentServer,
    kind: CategoryKind,
    category_id: i64,
) -> Result<CategoryTemplate> {
    let remote = match server.category_template(category_id).await {
        Ok(t) => t,
        Err(e @ Error::Template { .. }) => return Err(e),
        Err(e) => {
            return Err(Error::Template {
                category_id,
                source: Box::new(e),
            })
        }
    };
    CategoryTemplate::validate(kind, remote)
}

/// Build a remote template whose display names match the schema. Used by
/// the in-memory content server and tests.
pub fn schema_template(kind: CategoryKind, category_id: i64) -> RemoteTemplate {
    RemoteTemplate {
        id: category_id,
        name: kind.label().to_string(),
        fields: kind
            .fields()
            .iter()
            .enumerate()
            .map(|(i, name)| TemplateField {
                key: format!("{}_{}", category_id, i + 2),
                name: (*name).to_string(),
            })
            .collect(),
    }
}

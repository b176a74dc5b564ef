//! Core data models used throughout the sync pipeline.
//!
//! These types represent the rows read from the permitting database, the
//! nodes of the ECM tree, and the file content that moves between them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

/// Identifier of a node (folder, document) in the ECM tree.
pub type NodeId = i64;

/// Placeholder written when a tax row has no street address.
pub const UNKNOWN_ADDRESS: &str = "Address Unknown";
/// Placeholder written when a tax row has no city.
pub const UNKNOWN_CITY: &str = "City Unknown";
/// Placeholder written when a tax row has no zip code.
pub const UNKNOWN_ZIP: &str = "Unk";

/// Descriptive record for one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    /// Name of the system the attachment came from.
    pub source: String,
    /// Free-text description entered by the user.
    pub description: String,
    /// Attachment type label.
    pub kind: String,
}

/// Structural key locating the folder record that owns an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderLink {
    pub folder_type: String,
    pub section: String,
    pub revision: String,
    pub sequence: String,
    pub year: String,
}

impl fmt::Display for FolderLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}",
            self.year, self.sequence, self.section, self.revision, self.folder_type
        )
    }
}

/// One permit record tied to a folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitRow {
    pub permit_type: String,
    pub permit_type_description: String,
    pub permit_number: String,
    pub folder_name: String,
    pub parcel_number: String,
    /// Internal folder key; links the folder to its parcels.
    pub folder_key: String,
    pub location: String,
    pub application_tracking_number: String,
    pub section_township_range: String,
    pub folder_description: String,
    /// Contact string in `label: value` form.
    pub contact: String,
}

/// One property/address record for a tax parcel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRow {
    pub alternate_tax_id: String,
    pub address: String,
    pub city: String,
    pub zip: String,
}

impl TaxRow {
    /// Replace blank address, city, and zip with their placeholders.
    pub fn with_defaults(mut self) -> Self {
        if self.address.trim().is_empty() {
            self.address = UNKNOWN_ADDRESS.to_string();
        }
        if self.city.trim().is_empty() {
            self.city = UNKNOWN_CITY.to_string();
        }
        if self.zip.trim().is_empty() {
            self.zip = UNKNOWN_ZIP.to_string();
        }
        self
    }
}

/// A parcel ID paired with the tax rows fetched for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelTaxRows {
    pub parcel_id: String,
    pub rows: Vec<TaxRow>,
}

/// A node in the ECM hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
}

/// File attributes sent alongside uploaded content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttributes {
    pub file_name: String,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Reader over file content. Dropping it releases the underlying resource
/// (open file, temp file).
pub type ContentReader = Box<dyn AsyncRead + Send + Unpin>;

/// File content moving into or out of the content server.
pub struct FileContent {
    pub file_name: String,
    pub mime_type: Option<String>,
    /// Size in bytes, as known by the producer.
    pub size: u64,
    pub reader: ContentReader,
}

impl FileContent {
    pub fn new(file_name: impl Into<String>, size: u64, reader: ContentReader) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: None,
            size,
            reader,
        }
    }

    /// In-memory content, mostly useful for tests.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self::new(file_name, size, Box::new(std::io::Cursor::new(bytes)))
    }

    /// The file extension, if the name has one.
    pub fn extension(&self) -> Option<&str> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            None
        } else {
            Some(ext)
        }
    }
}

impl fmt::Debug for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileContent")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_row_defaults_fill_blanks() {
        let row = TaxRow {
            alternate_tax_id: "A1".into(),
            address: "  ".into(),
            city: String::new(),
            zip: "".into(),
        }
        .with_defaults();
        assert_eq!(row.address, UNKNOWN_ADDRESS);
        assert_eq!(row.city, UNKNOWN_CITY);
        assert_eq!(row.zip, UNKNOWN_ZIP);
        assert_eq!(row.alternate_tax_id, "A1");
    }

    #[test]
    fn test_tax_row_defaults_keep_values() {
        let row = TaxRow {
            alternate_tax_id: String::new(),
            address: "1 Main St".into(),
            city: "Everett".into(),
            zip: "982".into(),
        }
        .with_defaults();
        assert_eq!(row.address, "1 Main St");
        assert_eq!(row.city, "Everett");
        assert_eq!(row.zip, "982");
    }

    #[test]
    fn test_file_content_extension() {
        assert_eq!(
            FileContent::from_bytes("site-plan.pdf", vec![1]).extension(),
            Some("pdf")
        );
        assert_eq!(FileContent::from_bytes("README", vec![1]).extension(), None);
        assert_eq!(FileContent::from_bytes(".hidden", vec![1]).extension(), None);
    }

    #[test]
    fn test_folder_link_display() {
        let link = FolderLink {
            folder_type: "BLD".into(),
            section: "00".into(),
            revision: "00".into(),
            sequence: "101234".into(),
            year: "24".into(),
        };
        assert_eq!(link.to_string(), "24-101234-00-00-BLD");
    }
}

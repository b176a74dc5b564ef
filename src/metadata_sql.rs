//! SQLite-backed [`MetadataSource`].
//!
//! Reads the mirror tables created by [`crate::migrate`]. Text columns that
//! are NULL come back as empty strings. Database failures surface as
//! [`Error::Transport`].

use async_trait::async_trait;
use permit_ecm_core::models::{AttachmentMetadata, FolderLink, PermitRow, TaxRow};
use permit_ecm_core::source::MetadataSource;
use permit_ecm_core::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

pub struct SqlMetadataSource {
    pool: SqlitePool,
    attachment_source: String,
}

impl SqlMetadataSource {
    /// `attachment_source` is written as the source of every attachment.
    pub fn new(pool: SqlitePool, attachment_source: impl Into<String>) -> Self {
        Self {
            pool,
            attachment_source: attachment_source.into(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn text(row: &SqliteRow, column: &str) -> Result<String> {
    let value: Option<String> = row.try_get(column).map_err(Error::transport)?;
    Ok(value.unwrap_or_default())
}

#[async_trait]
impl MetadataSource for SqlMetadataSource {
    async fn attachment_metadata(&self, attachment_id: i64) -> Result<Option<AttachmentMetadata>> {
        let row = sqlx::query(
            "SELECT IFNULL(a.attachment_desc, '') AS description, v.attachment_desc AS kind \
             FROM attachment a \
             INNER JOIN valid_attachment v ON a.attachment_code = v.attachment_code \
             WHERE a.attachment_rsn = ?",
        )
        .bind(attachment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::transport)?;

        row.map(|row| {
            Ok(AttachmentMetadata {
                source: self.attachment_source.clone(),
                description: text(&row, "description")?,
                kind: text(&row, "kind")?,
            })
        })
        .transpose()
    }

    async fn folder_link(&self, attachment_id: i64) -> Result<Option<FolderLink>> {
        let row = sqlx::query(
            "SELECT f.folder_type, f.folder_section, f.folder_revision, f.folder_sequence, f.folder_year \
             FROM folder f \
             INNER JOIN attachment a ON a.table_rsn = f.folder_rsn \
             WHERE a.attachment_rsn = ? AND a.table_name = 'Folder'",
        )
        .bind(attachment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::transport)?;

        row.map(|row| {
            Ok(FolderLink {
                folder_type: text(&row, "folder_type")?,
                section: text(&row, "folder_section")?,
                revision: text(&row, "folder_revision")?,
                sequence: text(&row, "folder_sequence")?,
                year: text(&row, "folder_year")?,
            })
        })
        .transpose()
    }

    async fn parcel_ids(&self, folder_key: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT REPLACE(p.property_roll, '-', '') AS parcel_id \
             FROM folder_property fp \
             INNER JOIN property p ON p.property_rsn = fp.property_rsn \
             WHERE fp.folder_rsn = ? AND TRIM(IFNULL(p.property_roll, '')) <> '' \
             ORDER BY fp.row_order, fp.property_rsn",
        )
        .bind(folder_key)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::transport)?;

        let mut ids: Vec<String> = Vec::with_capacity(rows.len());
        for row in &rows {
            let id = text(row, "parcel_id")?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    async fn permit_rows(&self, link: &FolderLink) -> Result<Vec<PermitRow>> {
        let rows = sqlx::query(
            "SELECT permit_type, permit_type_desc, permit_number, folder_name, parcel_number, \
                    folder_rsn, location, app_tracking_number, section_township_range, \
                    folder_desc, contact \
             FROM permit_complete \
             WHERE folder_type = ? AND folder_section = ? AND folder_revision = ? \
               AND folder_sequence = ? AND folder_year = ? \
             ORDER BY row_order",
        )
        .bind(&link.folder_type)
        .bind(&link.section)
        .bind(&link.revision)
        .bind(&link.sequence)
        .bind(&link.year)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::transport)?;

        rows.iter()
            .map(|row| {
                Ok(PermitRow {
                    permit_type: text(row, "permit_type")?,
                    permit_type_description: text(row, "permit_type_desc")?,
                    permit_number: text(row, "permit_number")?,
                    folder_name: text(row, "folder_name")?,
                    parcel_number: text(row, "parcel_number")?,
                    folder_key: text(row, "folder_rsn")?,
                    location: text(row, "location")?,
                    application_tracking_number: text(row, "app_tracking_number")?,
                    section_township_range: text(row, "section_township_range")?,
                    folder_description: text(row, "folder_desc")?,
                    contact: text(row, "contact")?,
                })
            })
            .collect()
    }

    async fn tax_rows(&self, parcel_id: &str) -> Result<Vec<TaxRow>> {
        let rows = sqlx::query(
            "SELECT alt_tax_id, address, city, zip \
             FROM property_address \
             WHERE parcel_id = ? \
             ORDER BY row_order",
        )
        .bind(parcel_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::transport)?;

        rows.iter()
            .map(|row| {
                Ok(TaxRow {
                    alternate_tax_id: text(row, "alt_tax_id")?,
                    address: text(row, "address")?,
                    city: text(row, "city")?,
                    zip: text(row, "zip")?,
                })
            })
            .collect()
    }
}

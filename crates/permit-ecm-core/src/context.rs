//! Per-run memoization of metadata lookups.
//!
//! A [`RunContext`] is created for one attachment run and dropped at its end.
//! Each keyed lookup reaches the [`MetadataSource`] at most once; later
//! calls with the same key are served from the context. Nothing is shared
//! between runs.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{AttachmentMetadata, FolderLink, ParcelTaxRows, PermitRow, TaxRow};
use crate::source::MetadataSource;

/// Memoizing wrapper over a [`MetadataSource`] for a single run.
pub struct RunContext {
    source: Arc<dyn MetadataSource>,
    attachments: HashMap<i64, Option<AttachmentMetadata>>,
    links: HashMap<i64, Option<FolderLink>>,
    permits: HashMap<FolderLink, Vec<PermitRow>>,
    parcels: HashMap<i64, Vec<String>>,
    tax: HashMap<String, Vec<TaxRow>>,
}

impl RunContext {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self {
            source,
            attachments: HashMap::new(),
            links: HashMap::new(),
            permits: HashMap::new(),
            parcels: HashMap::new(),
            tax: HashMap::new(),
        }
    }

    /// Descriptive record of the attachment.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the source has no row for it.
    pub async fn attachment_metadata(&mut self, attachment_id: i64) -> Result<AttachmentMetadata> {
        if !self.attachments.contains_key(&attachment_id) {
            let fetched = self.source.attachment_metadata(attachment_id).await?;
            self.attachments.insert(attachment_id, fetched);
        }
        self.attachments
            .get(&attachment_id)
            .cloned()
            .flatten()
            .ok_or_else(|| Error::NotFound(format!("metadata for attachment {}", attachment_id)))
    }

    /// Folder linkage of the attachment.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the attachment is not linked to a folder.
    pub async fn folder_link(&mut self, attachment_id: i64) -> Result<FolderLink> {
        if !self.links.contains_key(&attachment_id) {
            let fetched = self.source.folder_link(attachment_id).await?;
            self.links.insert(attachment_id, fetched);
        }
        self.links
            .get(&attachment_id)
            .cloned()
            .flatten()
            .ok_or_else(|| {
                Error::NotFound(format!("folder link for attachment {}", attachment_id))
            })
    }

    /// Permit rows for the folder, primary first. May be empty.
    pub async fn permit_rows(&mut self, link: &FolderLink) -> Result<Vec<PermitRow>> {
        if let Some(rows) = self.permits.get(link) {
            return Ok(rows.clone());
        }
        let rows = self.source.permit_rows(link).await?;
        tracing::debug!(folder = %link, rows = rows.len(), "permit rows fetched");
        self.permits.insert(link.clone(), rows.clone());
        Ok(rows)
    }

    /// Distinct, non-blank parcel ids for a folder key, in link order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] when `folder_key` is not an integer.
    pub async fn parcel_ids(&mut self, folder_key: &str) -> Result<Vec<String>> {
        let key: i64 = folder_key.trim().parse().map_err(|_| {
            Error::InvalidInput(format!("folder key '{}' is not numeric", folder_key))
        })?;
        if let Some(ids) = self.parcels.get(&key) {
            return Ok(ids.clone());
        }
        let raw = self.source.parcel_ids(key).await?;
        let mut ids: Vec<String> = Vec::with_capacity(raw.len());
        for id in raw {
            let id = id.trim();
            if !id.is_empty() && !ids.iter().any(|existing| existing == id) {
                ids.push(id.to_string());
            }
        }
        self.parcels.insert(key, ids.clone());
        Ok(ids)
    }

    /// Tax rows for a parcel with blank address, city, and zip replaced by
    /// their placeholders.
    pub async fn tax_rows(&mut self, parcel_id: &str) -> Result<Vec<TaxRow>> {
        if let Some(rows) = self.tax.get(parcel_id) {
            return Ok(rows.clone());
        }
        let rows: Vec<TaxRow> = self
            .source
            .tax_rows(parcel_id)
            .await?
            .into_iter()
            .map(TaxRow::with_defaults)
            .collect();
        self.tax.insert(parcel_id.to_string(), rows.clone());
        Ok(rows)
    }

    /// Pair each parcel with its tax rows, in order.
    ///
    /// Stops after the first parcel without rows: the tax account cannot be
    /// built at that point, so later parcels are not fetched. The empty
    /// parcel is still included so the caller sees it.
    pub async fn parcel_tax_rows(&mut self, parcel_ids: &[String]) -> Result<Vec<ParcelTaxRows>> {
        let mut parcels = Vec::with_capacity(parcel_ids.len());
        for parcel_id in parcel_ids {
            let rows = self.tax_rows(parcel_id).await?;
            let empty = rows.is_empty();
            parcels.push(ParcelTaxRows {
                parcel_id: parcel_id.clone(),
                rows,
            });
            if empty {
                break;
            }
        }
        Ok(parcels)
    }
}

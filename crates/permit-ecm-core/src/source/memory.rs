//! In-memory [`MetadataSource`] for tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{AttachmentMetadata, FolderLink, PermitRow, TaxRow};

use super::MetadataSource;

/// Per-method call counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCalls {
    pub attachment_metadata: usize,
    pub folder_link: usize,
    pub parcel_ids: usize,
    pub permit_rows: usize,
    pub tax_rows: usize,
}

#[derive(Default)]
struct Tables {
    attachments: HashMap<i64, AttachmentMetadata>,
    links: HashMap<i64, FolderLink>,
    parcels: HashMap<i64, Vec<String>>,
    permits: HashMap<FolderLink, Vec<PermitRow>>,
    tax: HashMap<String, Vec<TaxRow>>,
    failing: bool,
    calls: SourceCalls,
}

/// Metadata source backed by `HashMap`s.
#[derive(Default)]
pub struct InMemoryMetadataSource {
    tables: Mutex<Tables>,
}

impl InMemoryMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_attachment(
        &self,
        attachment_id: i64,
        metadata: AttachmentMetadata,
        link: Option<FolderLink>,
    ) {
        let mut t = self.tables();
        t.attachments.insert(attachment_id, metadata);
        if let Some(link) = link {
            t.links.insert(attachment_id, link);
        }
    }

    pub fn insert_permits(&self, link: FolderLink, rows: Vec<PermitRow>) {
        self.tables().permits.insert(link, rows);
    }

    pub fn insert_parcels(&self, folder_key: i64, parcel_ids: Vec<String>) {
        self.tables().parcels.insert(folder_key, parcel_ids);
    }

    pub fn insert_tax_rows(&self, parcel_id: &str, rows: Vec<TaxRow>) {
        self.tables().tax.insert(parcel_id.to_string(), rows);
    }

    /// Make every subsequent lookup fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.tables().failing = failing;
    }

    pub fn calls(&self) -> SourceCalls {
        self.tables().calls.clone()
    }

    fn check(t: &Tables) -> Result<()> {
        if t.failing {
            Err(Error::transport("metadata source unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MetadataSource for InMemoryMetadataSource {
    async fn attachment_metadata(&self, attachment_id: i64) -> Result<Option<AttachmentMetadata>> {
        let mut t = self.tables();
        t.calls.attachment_metadata += 1;
        Self::check(&t)?;
        Ok(t.attachments.get(&attachment_id).cloned())
    }

    async fn folder_link(&self, attachment_id: i64) -> Result<Option<FolderLink>> {
        let mut t = self.tables();
        t.calls.folder_link += 1;
        Self::check(&t)?;
        Ok(t.links.get(&attachment_id).cloned())
    }

    async fn parcel_ids(&self, folder_key: i64) -> Result<Vec<String>> {
        let mut t = self.tables();
        t.calls.parcel_ids += 1;
        Self::check(&t)?;
        Ok(t.parcels.get(&folder_key).cloned().unwrap_or_default())
    }

    async fn permit_rows(&self, link: &FolderLink) -> Result<Vec<PermitRow>> {
        let mut t = self.tables();
        t.calls.permit_rows += 1;
        Self::check(&t)?;
        Ok(t.permits.get(link).cloned().unwrap_or_default())
    }

    async fn tax_rows(&self, parcel_id: &str) -> Result<Vec<TaxRow>> {
        let mut t = self.tables();
        t.calls.tax_rows += 1;
        Self::check(&t)?;
        Ok(t.tax.get(parcel_id).cloned().unwrap_or_default())
    }
}

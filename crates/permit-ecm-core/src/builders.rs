//! Category builders.
//!
//! Pure transformations from metadata rows into [`AttributeSet`]s. Each
//! builder starts from a validated template, so the result always carries
//! every schema field, and sets fields by name.
//!
//! | Builder | Input | Result |
//! |---------|-------|--------|
//! | [`build_document_info`] | one [`AttachmentMetadata`] | 3 fields |
//! | [`build_permit_category`] | permit rows, primary first | 11 fields |
//! | [`build_tax_account_category`] | parcels with their tax rows | 7 fields, or `None` |
//!
//! Lengths are counted in Unicode scalar values, never bytes, so truncation
//! and chunking cannot split a character.

use crate::category::{
    document_info, permit, tax_account, AttributeSet, CategoryTemplate,
};
use crate::error::{Error, Result};
use crate::models::{AttachmentMetadata, ParcelTaxRows, PermitRow};

/// Maximum length of the emitted document description.
pub const DESCRIPTION_MAX_CHARS: usize = 80;
/// Size of one folder-description chunk.
pub const FOLDER_DESCRIPTION_CHUNK_CHARS: usize = 320;
/// Maximum number of folder-description chunks (8000 characters).
pub const FOLDER_DESCRIPTION_MAX_CHUNKS: usize = 25;
/// Maximum number of distinct section/township/range values.
pub const SECTION_TOWNSHIP_RANGE_MAX: usize = 10;
/// Maximum number of distinct contacts.
pub const CONTACTS_MAX: usize = 600;
/// Maximum length of an emitted zip code.
pub const ZIP_MAX_CHARS: usize = 5;

/// Keep the first `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Split `text` into successive chunks of at most `size` characters,
/// keeping at most `max_chunks` of them. An empty string yields no chunks.
pub fn chunk_chars(text: &str, size: usize, max_chunks: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .take(max_chunks)
        .map(|c| c.iter().collect())
        .collect()
}

/// Push `value` unless an equal value is already present. Returns whether
/// it was added.
fn push_unique(values: &mut Vec<String>, value: &str) -> bool {
    if values.iter().any(|v| v == value) {
        return false;
    }
    values.push(value.to_string());
    true
}

/// Build the Document Info category for one attachment.
pub fn build_document_info(
    template: &CategoryTemplate,
    metadata: &AttachmentMetadata,
) -> Result<AttributeSet> {
    let mut set = template.instantiate();
    set.set(document_info::SOURCE, vec![metadata.source.clone()])?;
    set.set(
        document_info::DESCRIPTION,
        vec![truncate_chars(&metadata.description, DESCRIPTION_MAX_CHARS)],
    )?;
    set.set(document_info::ATTACHMENT_TYPE, vec![metadata.kind.clone()])?;
    Ok(set)
}

/// Build the Permit category. `rows[0]` is the primary permit.
///
/// # Errors
///
/// [`Error::NotFound`] when `rows` is empty: there is no permit to file
/// under.
pub fn build_permit_category(template: &CategoryTemplate, rows: &[PermitRow]) -> Result<AttributeSet> {
    let primary = rows
        .first()
        .ok_or_else(|| Error::NotFound("no permit rows for folder".to_string()))?;

    let mut set = template.instantiate();
    set.set(permit::PERMIT_TYPE, vec![primary.permit_type.clone()])?;
    set.set(
        permit::PERMIT_TYPE_DESCRIPTION,
        vec![primary.permit_type_description.clone()],
    )?;
    set.set(permit::PERMIT_NUMBER, vec![primary.permit_number.clone()])?;
    set.set(permit::FOLDER_NAME, vec![primary.folder_name.clone()])?;
    set.set(permit::RELATED_PERMITS, related_permits(rows))?;
    set.set(permit::LOCATION, vec![primary.location.clone()])?;
    set.set(permit::FOLDER_KEY, vec![primary.folder_key.clone()])?;
    set.set(
        permit::APPLICATION_TRACKING_NUMBER,
        vec![application_tracking_number(rows)],
    )?;
    set.set(permit::SECTION_TOWNSHIP_RANGE, section_township_ranges(rows))?;
    set.set(
        permit::FOLDER_DESCRIPTION,
        chunk_chars(
            &primary.folder_description,
            FOLDER_DESCRIPTION_CHUNK_CHARS,
            FOLDER_DESCRIPTION_MAX_CHUNKS,
        ),
    )?;
    set.set(permit::CONTACTS, contacts(rows))?;
    Ok(set)
}

/// Permit numbers of rows 2..N, first occurrence only, excluding the
/// primary number.
fn related_permits(rows: &[PermitRow]) -> Vec<String> {
    let Some((primary, rest)) = rows.split_first() else {
        return Vec::new();
    };
    let mut related = Vec::new();
    for row in rest {
        if row.permit_number != primary.permit_number {
            push_unique(&mut related, &row.permit_number);
        }
    }
    related
}

fn application_tracking_number(rows: &[PermitRow]) -> String {
    rows.iter()
        .map(|r| r.application_tracking_number.as_str())
        .find(|v| !v.trim().is_empty())
        .unwrap_or_default()
        .to_string()
}

fn section_township_ranges(rows: &[PermitRow]) -> Vec<String> {
    let mut values = Vec::new();
    for row in rows {
        if values.len() >= SECTION_TOWNSHIP_RANGE_MAX {
            break;
        }
        if !row.section_township_range.trim().is_empty() {
            push_unique(&mut values, &row.section_township_range);
        }
    }
    values
}

/// Value portion of a `label: value` contact, if it has a label and a
/// non-blank value. The value ends at the next separator.
fn contact_value(contact: &str) -> Option<&str> {
    let (label, rest) = contact.split_once(':')?;
    if label.is_empty() {
        return None;
    }
    let value = rest.split(':').next().unwrap_or_default();
    (!value.trim().is_empty()).then_some(value)
}

fn contacts(rows: &[PermitRow]) -> Vec<String> {
    let mut values = Vec::new();
    for row in rows {
        if values.len() >= CONTACTS_MAX {
            break;
        }
        if contact_value(&row.contact).is_some() {
            push_unique(&mut values, &row.contact);
        }
    }
    if values.is_empty() {
        values.push(String::new());
    }
    values
}

/// Build the Tax Account category from parcels in link order.
///
/// Returns `Ok(None)` when no tax account applies: the list is empty, or
/// any parcel (the primary included) has no tax rows.
pub fn build_tax_account_category(
    template: &CategoryTemplate,
    parcels: &[ParcelTaxRows],
) -> Result<Option<AttributeSet>> {
    let Some(first) = parcels.first() else {
        return Ok(None);
    };
    let Some(primary) = first.rows.first() else {
        tracing::debug!(parcel = %first.parcel_id, "no tax rows for primary parcel");
        return Ok(None);
    };
    if let Some(empty) = parcels.iter().find(|p| p.rows.is_empty()) {
        tracing::debug!(parcel = %empty.parcel_id, "no tax rows for related parcel");
        return Ok(None);
    }

    let mut related_addresses: Vec<String> = Vec::new();
    let mut emitted = 0usize;
    for parcel in parcels {
        for row in parcel.rows.iter().skip(1) {
            if row.address != primary.address && push_unique(&mut related_addresses, &row.address)
            {
                emitted += 1;
            }
        }
        if emitted == 0 {
            related_addresses.push(String::new());
        }
    }

    let mut set = template.instantiate();
    set.set(tax_account::TAX_ID, vec![first.parcel_id.clone()])?;
    set.set(
        tax_account::ALTERNATE_TAX_ID,
        vec![primary.alternate_tax_id.clone()],
    )?;
    set.set(
        tax_account::RELATED_TAX_ACCOUNTS,
        parcels.iter().map(|p| p.parcel_id.clone()).collect(),
    )?;
    set.set(tax_account::PROPERTY_ADDRESS, vec![primary.address.clone()])?;
    set.set(tax_account::RELATED_PROPERTY_ADDRESSES, related_addresses)?;
    set.set(tax_account::CITY, vec![primary.city.clone()])?;
    set.set(
        tax_account::ZIP,
        vec![truncate_chars(&primary.zip, ZIP_MAX_CHARS)],
    )?;
    Ok(Some(set))
}

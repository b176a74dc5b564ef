//! Schema for the local metadata mirror.
//!
//! Mirrors the subset of the permitting database the loader reads:
//! attachments and their type codes, folders, parcels and the folder/parcel
//! link, flattened permit rows, and property addresses. Every statement is
//! idempotent, so `ecm-sync init` can be run repeatedly.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::DbConfig;
use crate::db;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS valid_attachment (
        attachment_code INTEGER PRIMARY KEY,
        attachment_desc TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS folder (
        folder_rsn INTEGER PRIMARY KEY,
        folder_type TEXT NOT NULL,
        folder_section TEXT NOT NULL,
        folder_revision TEXT NOT NULL,
        folder_sequence TEXT NOT NULL,
        folder_year TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attachment (
        attachment_rsn INTEGER PRIMARY KEY,
        table_name TEXT NOT NULL DEFAULT 'Folder',
        table_rsn INTEGER NOT NULL,
        attachment_code INTEGER NOT NULL,
        attachment_desc TEXT,
        FOREIGN KEY (attachment_code) REFERENCES valid_attachment(attachment_code)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS property (
        property_rsn INTEGER PRIMARY KEY,
        property_roll TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS folder_property (
        folder_rsn INTEGER NOT NULL,
        property_rsn INTEGER NOT NULL,
        row_order INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (folder_rsn, property_rsn)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS permit_complete (
        folder_type TEXT NOT NULL,
        folder_section TEXT NOT NULL,
        folder_revision TEXT NOT NULL,
        folder_sequence TEXT NOT NULL,
        folder_year TEXT NOT NULL,
        row_order INTEGER NOT NULL,
        permit_type TEXT,
        permit_type_desc TEXT,
        permit_number TEXT,
        folder_name TEXT,
        parcel_number TEXT,
        folder_rsn TEXT,
        location TEXT,
        app_tracking_number TEXT,
        section_township_range TEXT,
        folder_desc TEXT,
        contact TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS property_address (
        parcel_id TEXT NOT NULL,
        row_order INTEGER NOT NULL,
        alt_tax_id TEXT,
        address TEXT,
        city TEXT,
        zip TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_attachment_table ON attachment(table_name, table_rsn)",
    "CREATE INDEX IF NOT EXISTS idx_permit_complete_folder ON permit_complete(folder_year, folder_sequence, folder_section, folder_revision, folder_type)",
    "CREATE INDEX IF NOT EXISTS idx_property_address_parcel ON property_address(parcel_id)",
];

/// Create every mirror table and index on an open pool.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

pub async fn run_migrations(config: &DbConfig) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    tracing::info!(path = %config.path.display(), "metadata schema ready");
    Ok(())
}

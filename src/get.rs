//! `ecm-sync get`: download the latest version of a document.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use permit_ecm_core::{AttachmentService, FileContent};
use tokio::io::AsyncWriteExt;

use crate::app;
use crate::config::Config;

/// Write downloaded content to `dir/<file name>`, returning the path.
///
/// Only the final component of the remote name is used, so a name cannot
/// escape `dir`.
pub async fn save_content(mut content: FileContent, dir: &Path) -> Result<PathBuf> {
    let name = Path::new(&content.file_name)
        .file_name()
        .with_context(|| format!("unusable document name '{}'", content.file_name))?
        .to_owned();
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(name);
    let mut out = tokio::fs::File::create(&path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let written = tokio::io::copy(&mut content.reader, &mut out).await?;
    out.flush().await?;
    tracing::debug!(path = %path.display(), bytes = written, "document saved");
    Ok(path)
}

async fn download(service: &AttachmentService, document_id: i64, dir: &Path) -> Result<PathBuf> {
    let content = service
        .get_attachment(document_id)
        .await
        .with_context(|| format!("Failed to download document {}", document_id))?;
    save_content(content, dir).await
}

/// CLI entry point. Prints the path of the saved file.
pub async fn run_get(config: &Config, document_id: i64, output: &Path) -> Result<()> {
    let session = app::open(config).await?;
    let result = download(&session.service, document_id, output).await;
    session.close().await;

    let path = result?;
    println!("{}", path.display());
    Ok(())
}

//! `ecm-sync put`: upload a file for an attachment.

use std::path::Path;

use anyhow::{Context, Result};
use permit_ecm_core::FileContent;

use crate::app;
use crate::config::Config;

/// Open `path` as upload content named after its file name.
pub async fn open_file(path: &Path) -> Result<FileContent> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let size = file
        .metadata()
        .await
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    Ok(FileContent::new(name, size, Box::new(file)))
}

/// CLI entry point. Prints the document reference id.
pub async fn run_put(
    config: &Config,
    attachment_id: i64,
    path: &Path,
    document_id: Option<i64>,
) -> Result<()> {
    let content = open_file(path).await?;
    let session = app::open(config).await?;
    let result = session
        .service
        .put_attachment(attachment_id, document_id, content)
        .await;
    session.close().await;

    let id = result.with_context(|| format!("Failed to upload attachment {}", attachment_id))?;
    println!("{}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_open_file_reads_name_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site-plan.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let mut content = open_file(&path).await.unwrap();
        assert_eq!(content.file_name, "site-plan.pdf");
        assert_eq!(content.size, 8);
        let mut buf = Vec::new();
        content.reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_open_missing_file_fails() {
        let err = open_file(Path::new("/nonexistent/plan.pdf")).await.unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }
}

//! TOML configuration.
//!
//! Loaded once at startup by [`load_config`], which also validates the
//! values the loader depends on. The ECM password may be given in the file
//! or through the `ECM_PASSWORD` environment variable; the variable wins.

use anyhow::{bail, Context, Result};
use permit_ecm_core::resolver::{
    DEFAULT_DOCUMENT_COMMENT, DEFAULT_FOLDER_COMMENT, DEFAULT_FOLDER_SOURCE, DEFAULT_FOLDER_TYPE,
};
use permit_ecm_core::{CategoryIds, FolderLayout, Labels};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// Environment variable holding the ECM password.
pub const PASSWORD_ENV: &str = "ECM_PASSWORD";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub ecm: EcmConfig,
    pub categories: CategoryIds,
    pub folders: FoldersConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EcmConfig {
    pub base_url: String,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub workspace_root_id: i64,
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct FoldersConfig {
    #[serde(deserialize_with = "folder_path")]
    pub tax_account_path: Vec<String>,
    #[serde(deserialize_with = "folder_path")]
    pub no_tax_account_path: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LabelsConfig {
    #[serde(default = "default_attachment_source")]
    pub attachment_source: String,
    #[serde(default = "default_folder_source")]
    pub folder_source: String,
    #[serde(default = "default_folder_type")]
    pub folder_type: String,
    #[serde(default = "default_document_comment")]
    pub document_comment: String,
    #[serde(default = "default_folder_comment")]
    pub folder_comment: String,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            attachment_source: default_attachment_source(),
            folder_source: default_folder_source(),
            folder_type: default_folder_type(),
            document_comment: default_document_comment(),
            folder_comment: default_folder_comment(),
        }
    }
}

fn default_attachment_source() -> String {
    "AMANDA Attachment".to_string()
}
fn default_folder_source() -> String {
    DEFAULT_FOLDER_SOURCE.to_string()
}
fn default_folder_type() -> String {
    DEFAULT_FOLDER_TYPE.to_string()
}
fn default_document_comment() -> String {
    DEFAULT_DOCUMENT_COMMENT.to_string()
}
fn default_folder_comment() -> String {
    DEFAULT_FOLDER_COMMENT.to_string()
}

/// A folder path is either a list of segments or one `"A|B"` string.
fn folder_path<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Joined(String),
        Segments(Vec<String>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Joined(s) => s.split('|').map(str::to_string).collect(),
        Raw::Segments(v) => v,
    })
}

impl Config {
    pub fn layout(&self) -> FolderLayout {
        FolderLayout {
            workspace_root_id: self.ecm.workspace_root_id,
            tax_account_path: self.folders.tax_account_path.clone(),
            no_tax_account_path: self.folders.no_tax_account_path.clone(),
        }
    }

    pub fn labels(&self) -> Labels {
        Labels {
            folder_source: self.labels.folder_source.clone(),
            folder_type: self.labels.folder_type.clone(),
            folder_comment: self.labels.folder_comment.clone(),
            document_comment: self.labels.document_comment.clone(),
        }
    }

    /// The ECM password, preferring the environment over the file.
    pub fn ecm_password(&self) -> Result<String> {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            return Ok(password);
        }
        match &self.ecm.password {
            Some(password) => Ok(password.clone()),
            None => bail!("ECM password not configured: set ecm.password or {}", PASSWORD_ENV),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate ecm
    if config.ecm.base_url.trim().is_empty() {
        bail!("ecm.base_url must not be empty");
    }
    if config.ecm.username.trim().is_empty() {
        bail!("ecm.username must not be empty");
    }
    if config.ecm.timeout_secs == 0 {
        bail!("ecm.timeout_secs must be > 0");
    }

    // Validate folders
    validate_path("folders.tax_account_path", &config.folders.tax_account_path)?;
    validate_path(
        "folders.no_tax_account_path",
        &config.folders.no_tax_account_path,
    )?;

    // Validate categories
    let ids = [
        ("document_info", config.categories.document_info),
        ("permit", config.categories.permit),
        ("tax_account", config.categories.tax_account),
    ];
    for (name, id) in ids {
        if id <= 0 {
            bail!("categories.{} must be > 0", name);
        }
    }
    if ids[0].1 == ids[1].1 || ids[0].1 == ids[2].1 || ids[1].1 == ids[2].1 {
        bail!("categories ids must be distinct");
    }

    Ok(config)
}

fn validate_path(name: &str, segments: &[String]) -> Result<()> {
    if segments.is_empty() {
        bail!("{} must not be empty", name);
    }
    if segments.iter().any(|s| s.trim().is_empty()) {
        bail!("{} must not contain blank segments", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID: &str = r#"
[db]
path = "./data/amanda.sqlite"

[ecm]
base_url = "https://ecm.example.org/api/v1"
username = "loader"
password = "from-file"
workspace_root_id = 2000

[categories]
document_info = 31001
permit = 31002
tax_account = 31003

[folders]
tax_account_path = ["Permits", "Tax Accounts"]
no_tax_account_path = "Permits|No Tax Account"
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(VALID);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.ecm.timeout_secs, 60);
        assert_eq!(config.categories.permit, 31002);
        assert_eq!(
            config.folders.tax_account_path,
            vec!["Permits".to_string(), "Tax Accounts".to_string()]
        );
    }

    #[test]
    fn test_pipe_separated_path_is_split() {
        let file = write_config(VALID);
        let config = load_config(file.path()).unwrap();
        assert_eq!(
            config.folders.no_tax_account_path,
            vec!["Permits".to_string(), "No Tax Account".to_string()]
        );
    }

    #[test]
    fn test_labels_default() {
        let file = write_config(VALID);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.labels.attachment_source, "AMANDA Attachment");
        assert_eq!(config.labels().folder_comment, DEFAULT_FOLDER_COMMENT);
        assert_eq!(config.labels().document_comment, DEFAULT_DOCUMENT_COMMENT);
    }

    #[test]
    fn test_blank_path_segment_rejected() {
        let file = write_config(&VALID.replace("\"Permits|No Tax Account\"", "\"Permits||x\""));
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("blank segments"));
    }

    #[test]
    fn test_duplicate_category_ids_rejected() {
        let file = write_config(&VALID.replace("tax_account = 31003", "tax_account = 31002"));
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let file = write_config(&VALID.replace(
            "workspace_root_id = 2000",
            "workspace_root_id = 2000\ntimeout_secs = 0",
        ));
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_config(Path::new("/nonexistent/ecm-sync.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}

//! `ecm-sync check`: verify configuration against the live systems.
//!
//! Runs every check even after a failure and prints one status line per
//! check, then fails if any check did.

use anyhow::{bail, Result};
use permit_ecm_core::category::{CategoryKind, CategoryTemplate};
use permit_ecm_core::ecm::ContentServer;
use permit_ecm_core::resolver::FolderResolver;
use permit_ecm_core::CategoryTemplates;

use crate::config::Config;
use crate::db;
use crate::ecm_rest::RestContentServer;

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckStatus {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

impl CheckStatus {
    fn ok(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: true,
            detail: detail.into(),
        }
    }

    fn failed(name: impl Into<String>, detail: impl ToString) -> Self {
        Self {
            name: name.into(),
            ok: false,
            detail: detail.to_string(),
        }
    }
}

/// Validate the three category templates and both root paths.
pub async fn check_server(server: &dyn ContentServer, config: &Config) -> Vec<CheckStatus> {
    let mut statuses = Vec::new();
    let ids = &config.categories;
    let categories = [
        (CategoryKind::DocumentInfo, ids.document_info),
        (CategoryKind::Permit, ids.permit),
        (CategoryKind::TaxAccount, ids.tax_account),
    ];
    let mut templates = Vec::new();
    for (kind, id) in categories {
        let name = format!("template {}", kind.label());
        let validated = match server.category_template(id).await {
            Ok(remote) => CategoryTemplate::validate(kind, remote),
            Err(e) => Err(e),
        };
        match validated {
            Ok(t) => {
                statuses.push(CheckStatus::ok(name, format!("category {}", id)));
                templates.push(t);
            }
            Err(e) => statuses.push(CheckStatus::failed(name, e)),
        }
    }

    let layout = config.layout();
    let labels = config.labels();
    if let [document_info, permit, tax_account] = templates.as_slice() {
        let templates = CategoryTemplates {
            document_info: document_info.clone(),
            permit: permit.clone(),
            tax_account: tax_account.clone(),
        };
        let resolver = FolderResolver::new(server, &templates, &layout, &labels);
        for (name, path) in [
            ("root tax account", &layout.tax_account_path),
            ("root no tax account", &layout.no_tax_account_path),
        ] {
            match resolver.root(path).await {
                Ok(node) => statuses.push(CheckStatus::ok(
                    name,
                    format!("{} (node {})", path.join("|"), node.id),
                )),
                Err(e) => statuses.push(CheckStatus::failed(name, e)),
            }
        }
    }
    statuses
}

fn print_statuses(statuses: &[CheckStatus]) {
    println!("{:<24} {:<8} DETAIL", "CHECK", "STATUS");
    for s in statuses {
        let status = if s.ok { "OK" } else { "FAILED" };
        println!("{:<24} {:<8} {}", s.name, status, s.detail);
    }
}

/// CLI entry point.
pub async fn run_check(config: &Config) -> Result<()> {
    let mut statuses = Vec::new();

    match db::connect(&config.db).await {
        Ok(pool) => {
            statuses.push(CheckStatus::ok("database", config.db.path.display().to_string()));
            pool.close().await;
        }
        Err(e) => statuses.push(CheckStatus::failed("database", format!("{:#}", e))),
    }

    let server = match config.ecm_password() {
        Ok(password) => RestContentServer::connect(&config.ecm, &password)
            .await
            .map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };
    match server {
        Ok(server) => {
            statuses.push(CheckStatus::ok("ecm session", config.ecm.base_url.clone()));
            statuses.extend(check_server(&server, config).await);
            if let Err(e) = server.close().await {
                tracing::warn!(error = %e, "failed to close ECM session");
            }
        }
        Err(e) => statuses.push(CheckStatus::failed("ecm session", format!("{:#}", e))),
    }

    print_statuses(&statuses);
    let failed = statuses.iter().filter(|s| !s.ok).count();
    if failed > 0 {
        bail!("{} check(s) failed", failed);
    }
    Ok(())
}

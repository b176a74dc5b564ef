//! Wiring of the concrete collaborators into an [`AttachmentService`].

use std::sync::Arc;

use anyhow::{Context, Result};
use permit_ecm_core::ecm::ContentServer;
use permit_ecm_core::AttachmentService;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::ecm_rest::RestContentServer;
use crate::metadata_sql::SqlMetadataSource;

/// An open database pool and ECM session behind one service.
pub struct Session {
    pub service: AttachmentService,
    pool: SqlitePool,
}

/// Connect to the metadata mirror and the content server, then load the
/// category templates.
pub async fn open(config: &Config) -> Result<Session> {
    let pool = db::connect(&config.db).await?;
    let source = Arc::new(SqlMetadataSource::new(
        pool.clone(),
        config.labels.attachment_source.clone(),
    ));

    let password = config.ecm_password()?;
    let server = RestContentServer::connect(&config.ecm, &password)
        .await
        .with_context(|| format!("Failed to connect to ECM at {}", config.ecm.base_url))?;
    let server = Arc::new(server);

    let service = match AttachmentService::start(
        source,
        server.clone(),
        &config.categories,
        config.layout(),
        config.labels(),
    )
    .await
    {
        Ok(service) => service,
        Err(e) => {
            if let Err(close_err) = server.close().await {
                tracing::warn!(error = %close_err, "failed to close ECM session");
            }
            pool.close().await;
            return Err(e).context("Failed to load category templates");
        }
    };

    Ok(Session { service, pool })
}

impl Session {
    /// End the ECM session and close the pool. A failed sign-out is logged,
    /// not returned.
    pub async fn close(self) {
        if let Err(e) = self.service.close().await {
            tracing::warn!(error = %e, "failed to close ECM session");
        }
        self.pool.close().await;
    }
}

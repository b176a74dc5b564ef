//! `ecm-sync plan`: show what an upload would send, without creating
//! anything.

use anyhow::{Context, Result};

use crate::app;
use crate::config::Config;

/// CLI entry point. Prints the attachment plan as pretty JSON.
pub async fn run_plan(config: &Config, attachment_id: i64) -> Result<()> {
    let session = app::open(config).await?;
    let result = session.service.plan(attachment_id).await;
    session.close().await;

    let plan = result.with_context(|| format!("Failed to plan attachment {}", attachment_id))?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

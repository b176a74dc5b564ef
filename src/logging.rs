//! Tracing setup for the `ecm-sync` binary.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "permit_ecm_sync=info,permit_ecm_core=info";

/// Install the global subscriber. Events go to stderr so stdout stays free
/// for command output; `json` switches to one JSON object per line.
pub fn init(json: bool) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create log filter")?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    installed.context("Failed to install tracing subscriber")?;

    Ok(())
}

//! # ecm-sync
//!
//! Command-line loader for permit attachments.
//!
//! ## Usage
//!
//! ```bash
//! ecm-sync --config ./config/ecm-sync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ecm-sync init` | Create the metadata mirror schema |
//! | `ecm-sync check` | Verify category templates and root folders |
//! | `ecm-sync plan <attachment-id>` | Print categories and placement as JSON |
//! | `ecm-sync put <attachment-id> <file>` | Upload a file for an attachment |
//! | `ecm-sync get <document-id>` | Download the latest version of a document |

use clap::{Parser, Subcommand};
use permit_ecm_sync::{check, config, get, logging, migrate, plan, put};
use std::path::PathBuf;

/// Permit attachment loader for the ECM content server.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ecm-sync.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ecm-sync",
    about = "Load permit attachments into the ECM content server",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ecm-sync.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the metadata mirror schema.
    ///
    /// Creates the SQLite file and every mirror table. Safe to run again.
    Init,

    /// Check the configuration against the live systems.
    ///
    /// Opens the database and an ECM session, validates the three category
    /// templates, and resolves both root folder paths.
    Check,

    /// Show what an upload would send without creating anything.
    Plan {
        /// Attachment id in the permitting database.
        attachment_id: i64,
    },

    /// Upload a file for an attachment.
    ///
    /// Creates a new document under the resolved folder, or adds a major
    /// version when `--document-id` is given. Prints the document id.
    Put {
        /// Attachment id in the permitting database.
        attachment_id: i64,

        /// File to upload.
        file: PathBuf,

        /// Existing document to add a version to (0 creates a new one).
        #[arg(long)]
        document_id: Option<i64>,
    },

    /// Download the latest version of a document.
    Get {
        /// Document id on the content server.
        document_id: i64,

        /// Directory to write the file into.
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_json)?;

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg.db).await?;
            println!("Database initialized successfully.");
        }
        Commands::Check => {
            check::run_check(&cfg).await?;
        }
        Commands::Plan { attachment_id } => {
            plan::run_plan(&cfg, attachment_id).await?;
        }
        Commands::Put {
            attachment_id,
            file,
            document_id,
        } => {
            put::run_put(&cfg, attachment_id, &file, document_id).await?;
        }
        Commands::Get {
            document_id,
            output,
        } => {
            get::run_get(&cfg, document_id, &output).await?;
        }
    }

    Ok(())
}

//! # permit-ecm-sync
//!
//! Loads permit attachments from the permitting database into the ECM
//! content server, filing each under its permit (and tax parcel) folder
//! with the Document Info, Permit, and Tax Account categories attached.
//!
//! The sync logic lives in [`permit_ecm_core`]; this crate supplies the
//! concrete collaborators and the `ecm-sync` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │ SQLite mirror│──▶│ AttachmentService │──▶│ ECM REST API │
//! │  (sqlx)      │   │ (permit_ecm_core) │   │  (reqwest)   │
//! └──────────────┘   └──────────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ecm-sync init                       # create the metadata mirror schema
//! ecm-sync check                      # verify templates and root folders
//! ecm-sync plan 8801                  # show categories and placement
//! ecm-sync put 8801 ./plan.pdf        # upload as a new document
//! ecm-sync put 8801 ./plan.pdf --document-id 120455
//! ecm-sync get 120455 --output ./out
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | Tracing subscriber setup |
//! | [`db`] | Database connection |
//! | [`migrate`] | Metadata mirror schema |
//! | [`metadata_sql`] | SQLite metadata source |
//! | [`ecm_rest`] | HTTP content-server client |
//! | [`app`] | Service wiring |
//! | [`check`], [`plan`], [`put`], [`get`] | CLI commands |

pub mod app;
pub mod check;
pub mod config;
pub mod db;
pub mod ecm_rest;
pub mod get;
pub mod logging;
pub mod metadata_sql;
pub mod migrate;
pub mod plan;
pub mod put;

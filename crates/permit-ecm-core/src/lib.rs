//! # Permit ECM Core
//!
//! Attachment synchronization between a permitting database and an ECM
//! server: data models, category schemas and builders, the per-run lookup
//! context, folder resolution, and the upload orchestrator.
//!
//! The database and the content server are reached only through the
//! [`source::MetadataSource`] and [`ecm::ContentServer`] traits. This crate
//! contains no SQL and no HTTP; in-memory implementations of both traits
//! live in `source::memory` and `ecm::memory`.
//!
//! ```text
//! attachment id ─► RunContext ─► builders ─► FolderResolver ─► AttachmentService
//!                  (memoized)    (categories)  (parent folder)   (create / version)
//! ```

pub mod builders;
pub mod category;
pub mod context;
pub mod ecm;
pub mod error;
pub mod models;
pub mod resolver;
pub mod service;
pub mod source;

pub use category::{CategoryIds, CategoryKind, CategoryTemplates, Metadata};
pub use error::{Error, Result};
pub use models::{FileContent, NodeId};
pub use resolver::{FolderLayout, Labels};
pub use service::AttachmentService;

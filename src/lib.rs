//! Client SDK for the personal knowledge-graph platform.
//!
//! The platform exposes ontology management, entity CRUD and search,
//! named-entity linking, semantic (vector) search, groups, users,
//! tenants, ink-content processing and bulk import. This crate wraps
//! all of it behind typed clients, each available in an async and a
//! blocking flavor over the same request/response machinery.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use personal_knowledge::models::{Label, LocaleCode, OntologyClassReference, ThingObject};
//! use personal_knowledge::services::{GraphClient, ServiceConfig};
//!
//! # async fn run() -> personal_knowledge::error::ServiceResult<()> {
//! let config = ServiceConfig::new("https://kg.example.com/graph/v1".parse().unwrap());
//! let mut graph = GraphClient::new(&config)?;
//! graph.core_mut().login("tenant-api-key", "user@example.com").await?;
//!
//! let mut person = ThingObject::new(OntologyClassReference::new("wacom", "core", "Person"));
//! person.add_label(Label::main("Ada", LocaleCode::en_us()))?;
//! let uri = graph.create_entity(&person).await?;
//! let stored = graph.entity(&uri).await?;
//! # let _ = stored;
//! # Ok(())
//! # }
//! ```

// Error taxonomy shared by every operation
pub mod error;

// Domain model and wire codec
pub mod models;

// Sessions, JWT decoding and the process-wide token manager
pub mod session;

// HTTP transports (async + blocking), retry/backoff, DNS cache
pub mod transport;

// Per-domain service clients
pub mod services;

// Pagination iterators over entity listings
pub mod listing;

// Bulk-import orchestration and diff reconciliation
pub mod import_flow;

// Public re-exports for the common surface
pub use error::{ErrorEnvelope, ServiceError, ServiceResult};
pub use import_flow::{
    diff_entities, BlockingImportOrchestrator, EntityDiff, EntityReconciliation, ImportOptions,
    ImportOrchestrator, ImportReport,
};
pub use listing::{BlockingEntityIterator, EntityIterator};
pub use models::{
    AccessRight, DataProperty, DataPropertyType, Description, EntityStatus, Group, IndexTarget,
    Label, LocaleCode, OntologyClassReference, OntologyPropertyReference, ThingObject, Visibility,
};
pub use session::{Session, TokenManager};
pub use transport::{CallOptions, TransportConfig};

//! Service clients, each exposed in an async and a blocking flavor.

pub mod admin;
pub mod base;
pub mod graph;
pub mod group;
pub mod ink;
pub mod ontology;
pub mod search;
pub mod tenant;
pub mod user;

pub use admin::{
    BlockingDocumentStream, BlockingIndexAdminClient, DocumentStream, IndexAdminClient,
    IndexHealth, QueueMonitor,
};
pub use base::{BlockingClientBase, ClientBase, ServiceConfig};
pub use graph::{
    Activation, BlockingGraphClient, EntityPage, GraphClient, KnowledgeGraph, ListingFilter,
    RelationTriple, SearchPage, SearchPattern,
};
pub use group::{BlockingGroupClient, GroupClient};
pub use ink::{BlockingInkClient, ExportFormat, InkClient, PdfMode, WritingOrientation};
pub use ontology::{BlockingOntologyClient, NewProperty, OntologyClient};
pub use search::{
    BlockingSemanticSearchClient, DocumentListing, SearchFilter, SemanticSearchClient,
};
pub use tenant::{BlockingTenantClient, TenantClient};
pub use user::{BlockingUserClient, UserClient};

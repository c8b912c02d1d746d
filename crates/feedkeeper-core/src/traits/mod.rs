//! Collaborator contracts consumed by the jobs
//!
//! The jobs never talk to a database or the network directly. Everything
//! they need is expressed through these traits:
//!
//! - [`SourceCatalog`], [`CategoryCatalog`], [`SettingsStore`]: read-only catalogs
//! - [`ItemStore`], [`RankingQuery`]: the aggregated item set
//! - [`DigestStore`]: weekly digest documents
//! - [`ItemSaver`]: per-source fetch and insert
//! - [`JsonFetcher`]: social counter endpoints
//! - [`Cache`]: explicit cache invalidation after job completion

pub mod catalog;
pub mod digest_store;
pub mod fetcher;
pub mod item_store;

pub use catalog::{Cache, CategoryCatalog, SettingsStore, SourceCatalog};
pub use digest_store::DigestStore;
pub use fetcher::{ItemSaver, JsonFetcher};
pub use item_store::{ItemStore, RankingQuery};

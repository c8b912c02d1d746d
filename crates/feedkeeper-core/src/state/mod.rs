// # Store Implementations
//
// `MemoryCatalog` implements every store collaborator in memory;
// `SnapshotFile` persists its data as JSON across restarts.

pub mod file;
pub mod memory;

pub use file::SnapshotFile;
pub use memory::{CatalogData, MemoryCatalog};

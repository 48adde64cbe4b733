//! Implementations of the ports.
//!
//! - **MoxfieldClient**: `CardLookup` over HTTP
//! - **SqliteStore**: `InventoryStore` on disk, plus the loader and chaff queries
//! - **InMemoryStore**: `InventoryStore` for tests and development

pub mod memory_store;
pub mod moxfield;
pub mod sqlite_store;

pub use self::memory_store::InMemoryStore;
pub use self::moxfield::{ClientError, MoxfieldClient};
pub use self::sqlite_store::SqliteStore;

//! Domain model (inventory records, remote payloads, prices, errors).

pub mod card;
pub mod errors;
pub mod format;
pub mod price;
pub mod remote;
pub mod status;

pub use card::{CollectionEntry, InventoryRecord, RecordId};
pub use errors::{ConfigError, EnrichError, LoadError, ReportError, StoreError};
pub use format::Format;
pub use price::{PRICE_SOURCES, Price, select_price};
pub use remote::{DeckSearch, MARKER_TYPES, RemoteCard, select_card};
pub use status::EnrichmentStatus;

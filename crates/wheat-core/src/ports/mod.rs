//! Ports - seams between the enrichment pipeline and the outside world.
//!
//! Each trait hides one external system so the job can be driven by fakes in
//! tests:
//! - **CardLookup**: the remote card database (read-only)
//! - **InventoryStore**: the persistent inventory
//! - **Clock**: wall-clock timestamps

pub mod card_lookup;
pub mod clock;
pub mod inventory_store;

pub use self::card_lookup::CardLookup;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::inventory_store::InventoryStore;

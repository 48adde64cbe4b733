//! wheat-core
//!
//! Core building blocks for enriching a card collection with Moxfield data
//! and separating the wheat from the chaff.
//!
//! # Modules
//! - **domain**: inventory records, remote card payloads, prices, formats, errors
//! - **ports**: seams to the outside world (`CardLookup`, `InventoryStore`, `Clock`)
//! - **impls**: Moxfield HTTP client, SQLite store, in-memory store
//! - **app**: enrichment job, cancellation-aware runner, collection loader, chaff report
//! - **throttle**: sliding-window rate limiter shared by the lookups of one job
//! - **config**: settings built once at startup

pub mod app;
pub mod config;
pub mod csv;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod throttle;

pub use config::Settings;
pub use throttle::{Throttle, ThrottlePermit};

//! # portkeep core: per-directory port registry
//!
//! portkeep assigns and remembers one TCP port per (project directory,
//! service type) pair. Repeated resolutions of the same pair always return
//! the same port; new pairs get the lowest free port from a type-specific
//! range, overflowing into a shared catch-all range.
//!
//! ## Architecture
//!
//! ```text
//! resolve_port(store, dir, type)
//!        │
//!        ├── store.find ──────────── hit: return recorded port
//!        │
//!        └── miss: store.used_ports ──► find_available_port (range table)
//!                          │                     │
//!                          └──── store.insert ◄──┘
//!                     (UNIQUE constraints arbitrate races)
//! ```
//!
//! Uniqueness (one port per (directory, type) key, one owner per port) is
//! enforced by the store's SQLite constraints, not by application checks, so
//! concurrent invocations from separate processes cannot double-assign.

pub mod errors;
pub mod port;
pub mod resolver;
pub mod store;

pub use errors::{PortkeepError, Result};
pub use port::{find_available_port, range_for, PortRange, CATCH_ALL_RANGE};
pub use resolver::resolve_port;
pub use store::{PortRecord, PortStore};

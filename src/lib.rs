//! Tag-only simulator for set-associative LRU caches, driven by
//! Valgrind-style memory traces.

pub mod cache;
pub mod config;
pub mod error;
pub mod replace;
pub mod replay;
pub mod report;
pub mod sweep;
pub mod trace;

pub use cache::{Cache, Geometry, Stats};
pub use error::{ConfigError, Error, Result};
pub use replace::AccessResult;
pub use replay::{simulate, Replayed, Simulation};
pub use trace::{Access, AccessKind, Trace};

//! Per-module symbol cache
//!
//! [`ModuleInfoRegistry`] maps module names to [`ModuleInfo`] entries; each
//! entry keeps its module's exports fresh and expires when idle.

pub mod entity;
pub mod registry;
pub mod ttl;

pub use entity::ModuleInfo;
pub use registry::ModuleInfoRegistry;
pub use ttl::Expiring;

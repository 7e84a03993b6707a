//! Trait resolution and caching engine.
//!
//! Hosts declare provider classes and columns on a [`DataSourceBuilder`],
//! then read attributes of objects by key:
//!
//! 1. The key is completed from recorded defaults and looked up in the
//!    registry ([`orrery_registry::TraitRegistry::resolve`]). Later keys of a
//!    [`orrery_key::KeyPath`] resolve against the sub-traits of the provider
//!    above them.
//! 2. The request walks the [`CacheChain`]; the first layer holding the value
//!    serves it.
//! 3. On a miss the provider is realised for the object and its attribute
//!    slot loaded inside a scoped [`Lifecycle`] acquisition. The value is
//!    written back to the writable layers in front.
//!
//! # Modules
//!
//! - [`provider`] - provider declarations and realised instances
//! - [`lifecycle`] - reference-counted preload/cleanup with RAII guards
//! - [`slots`] - per-instance lazy attribute cache
//! - [`cache`] - cache layers and the chain
//! - [`column`] - per-object column data
//! - [`source`] - the [`DataSource`] context object
//! - [`config`] - TOML configuration

pub mod cache;
pub mod capability;
pub mod column;
pub mod config;
mod error;
mod export;
pub mod lifecycle;
mod pool;
pub mod provider;
pub mod slots;
pub mod source;
pub mod value;

pub use cache::{CacheChain, CacheLayer, CacheRequest, MemoryCache};
pub use capability::{Capabilities, Capability, HasShape, HasUnit, HasVariance};
pub use column::{Column, ColumnStore, FnColumn};
pub use config::{ConfigError, EngineConfig};
pub use error::{Cause, EngineError, LoadFailure, Result};
pub use export::ExportError;
pub use lifecycle::{Lifecycle, ResourceGuard};
pub use provider::{Provider, ProviderClass, ProviderDef, RealisedTrait, TraitInit, TraitInstance};
pub use slots::SlotCache;
pub use source::{DataSource, DataSourceBuilder, Schema, TraitSchema};
pub use value::{ArrayData, ArrayValue, ElementType, ShapeError, Value, ValueKind};

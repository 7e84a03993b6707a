//! Provider registry and key completion.
//!
//! A [`TraitRegistry`] maps concrete [`TraitKey`](orrery_key::TraitKey)s to
//! provider classes. Lookups are two-phase: [`complete`] fills a pattern's
//! branch and version from the recorded [`DefaultsTable`], then
//! [`TraitRegistry::retrieve`] does an exact map lookup.
//! [`TraitRegistry::resolve`] does both.
//!
//! # Modules
//!
//! - [`BranchesVersions`] - ordered branch/version declaration of a provider
//! - [`DefaultsRegistry`] / [`DefaultsTable`] - default branch and versions per key-name
//! - [`ProviderMeta`] / [`RegistryEntry`] - declaration metadata read during registration
//! - [`RegistryBuilder`] - registration, fails fast on conflicts

mod branches;
mod complete;
mod defaults;
mod error;
mod index;
mod meta;

pub use branches::BranchesVersions;
pub use complete::complete;
pub use defaults::{DefaultsRegistry, DefaultsTable};
pub use error::{RegistryError, Result};
pub use index::{RegistryBuilder, TraitRegistry};
pub use meta::{ProviderMeta, RegistryEntry};

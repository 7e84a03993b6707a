use std::sync::Arc;

use orrery_key::{KeyField, TraitKey, TraitName};
use tracing::trace;

use super::{RegistryBuilder, TraitRegistry};
use crate::complete::complete;
use crate::defaults::DefaultsTable;
use crate::error::{RegistryError, Result};
use crate::meta::RegistryEntry;

/// Fields cleared at each level of the legacy cascade, in the order they are tried.
const FALLBACK_CASCADE: &[&[KeyField]] = &[
	&[],
	&[KeyField::Branch],
	&[KeyField::Version],
	&[KeyField::Qualifier],
	&[KeyField::Qualifier, KeyField::Branch],
	&[KeyField::Branch, KeyField::Version],
	&[KeyField::Qualifier, KeyField::Version],
	&[KeyField::Qualifier, KeyField::Branch, KeyField::Version],
];

impl<T: RegistryEntry + ?Sized> TraitRegistry<T> {
	pub fn builder(label: &'static str) -> RegistryBuilder<T> {
		RegistryBuilder::new(label)
	}

	pub fn label(&self) -> &'static str {
		self.label
	}

	pub fn defaults(&self) -> &DefaultsTable {
		&self.defaults
	}

	/// Exact lookup of a concrete key.
	///
	/// # Errors
	///
	/// Returns [`RegistryError::UnknownKey`] if nothing is registered under
	/// `key`. Pattern keys never match; complete them first.
	pub fn retrieve(&self, key: &TraitKey) -> Result<&Arc<T>> {
		self.concrete
			.get(key)
			.ok_or_else(|| RegistryError::UnknownKey { key: key.clone() })
	}

	/// Completes `pattern` from this registry's defaults.
	pub fn complete(&self, pattern: &TraitKey) -> Result<TraitKey> {
		complete(pattern, &self.defaults)
	}

	/// Completes then retrieves, returning the concrete key alongside the class.
	pub fn resolve(&self, pattern: &TraitKey) -> Result<(TraitKey, &Arc<T>)> {
		let key = self.complete(pattern)?;
		let class = self.retrieve(&key)?;
		Ok((key, class))
	}

	/// Resolves a key one level down a provider hierarchy.
	///
	/// Keys whose name has recorded defaults resolve like
	/// [`resolve`](Self::resolve). Keys without a qualifier, or whose name has
	/// no defaults, must match a registration exactly, pattern registrations
	/// included. No fields are cleared.
	pub fn resolve_nested(&self, key: &TraitKey) -> Result<(TraitKey, &Arc<T>)> {
		match self.resolve(key) {
			Err(RegistryError::AmbiguousKey { .. } | RegistryError::UnknownKeyName { .. }) => self
				.concrete
				.get_key_value(key)
				.or_else(|| self.legacy.get_key_value(key))
				.map(|(registered, class)| (registered.clone(), class))
				.ok_or_else(|| RegistryError::UnknownKey { key: key.clone() }),
			resolved => resolved,
		}
	}

	/// Legacy lookup that retries with progressively more fields cleared.
	///
	/// Kept for callers that register or query partial keys directly. Prefer
	/// [`resolve`](Self::resolve): the cascade can match a provider other
	/// than the one the defaults would select.
	///
	/// Returns the registered key that matched.
	pub fn retrieve_with_fallback(&self, key: &TraitKey) -> Result<(&TraitKey, &Arc<T>)> {
		for cleared in FALLBACK_CASCADE {
			let candidate = key.without(cleared);
			let hit = self
				.concrete
				.get_key_value(&candidate)
				.or_else(|| self.legacy.get_key_value(&candidate));
			if let Some(hit) = hit {
				trace!(registry = self.label, query = %key, matched = %hit.0, "fallback lookup hit");
				return Ok(hit);
			}
		}
		Err(RegistryError::UnknownKey { key: key.clone() })
	}

	/// Distinct trait types, in registration order.
	pub fn trait_types(&self) -> Vec<&str> {
		let mut types: Vec<&str> = Vec::new();
		for class in &self.classes {
			if !types.contains(&class.trait_type()) {
				types.push(class.trait_type());
			}
		}
		types
	}

	/// Provider classes declaring `trait_type`.
	pub fn classes_for_type(&self, trait_type: &str) -> Vec<&Arc<T>> {
		self.classes.iter().filter(|c| c.trait_type() == trait_type).collect()
	}

	/// Every registered class, in registration order.
	pub fn classes(&self) -> &[Arc<T>] {
		&self.classes
	}

	/// Concrete keys registered for one key-name.
	pub fn keys_for_name(&self, name: &TraitName) -> Vec<&TraitKey> {
		self.concrete
			.keys()
			.filter(|key| key.name().as_ref() == Some(name))
			.collect()
	}

	/// Number of concrete keys.
	pub fn len(&self) -> usize {
		self.concrete.len()
	}

	pub fn is_empty(&self) -> bool {
		self.concrete.is_empty()
	}

	/// Iterates over concrete keys and their classes in registration order.
	pub fn iter(&self) -> impl Iterator<Item = (&TraitKey, &Arc<T>)> {
		self.concrete.iter()
	}

	/// Pattern keys reachable only through the fallback cascade.
	pub fn legacy_keys(&self) -> impl Iterator<Item = &TraitKey> {
		self.legacy.keys()
	}
}

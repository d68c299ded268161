//! Generation counters for declaration contexts.
//!
//! Every declaration context (a module, a plugin, a reloadable unit of
//! handler code) has a monotone generation. Declaring the context again or
//! unloading it bumps the generation, and every handle issued under an
//! older generation becomes stale. Registrations carry their handle, so the
//! registry can tell live definitions from superseded ones without keeping
//! dead handler code reachable.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

/// Shared table of current generations, keyed by context name.
///
/// Cloning shares the table.
#[derive(Clone, Default)]
pub struct EpochTable {
	generations: Arc<Mutex<HashMap<Arc<str>, u64>>>,
}

impl EpochTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts a new generation of `name` and returns its handle.
	///
	/// Handles from earlier generations of the same name become stale.
	pub fn declare(&self, name: impl Into<Arc<str>>) -> DeclarationContext {
		let name = name.into();
		let generation = {
			let mut generations = self.generations.lock();
			let slot = generations.entry(name.clone()).or_insert(0);
			*slot += 1;
			*slot
		};
		tracing::debug!(context = %name, generation, "declared context");
		DeclarationContext {
			name,
			generation,
			table: self.clone(),
		}
	}

	/// Marks every outstanding handle of `name` as stale.
	pub fn unload(&self, name: &str) {
		let mut generations = self.generations.lock();
		if let Some(generation) = generations.get_mut(name) {
			*generation += 1;
			tracing::debug!(context = name, generation = *generation, "unloaded context");
		}
	}

	/// Current generation of `name`, if it was ever declared.
	pub fn current(&self, name: &str) -> Option<u64> {
		self.generations.lock().get(name).copied()
	}

	pub fn is_current(&self, ctx: &DeclarationContext) -> bool {
		Arc::ptr_eq(&self.generations, &ctx.table.generations)
			&& self.current(&ctx.name) == Some(ctx.generation)
	}
}

impl fmt::Debug for EpochTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.generations.lock().iter()).finish()
	}
}

/// Handle to one generation of a declaration context.
#[derive(Clone)]
pub struct DeclarationContext {
	name: Arc<str>,
	generation: u64,
	table: EpochTable,
}

impl DeclarationContext {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns false once the context was re-declared or unloaded.
	pub fn is_current(&self) -> bool {
		self.table.is_current(self)
	}
}

impl PartialEq for DeclarationContext {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name
			&& self.generation == other.generation
			&& Arc::ptr_eq(&self.table.generations, &other.table.generations)
	}
}

impl Eq for DeclarationContext {}

impl fmt::Debug for DeclarationContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DeclarationContext")
			.field("name", &self.name)
			.field("generation", &self.generation)
			.finish()
	}
}

//! Default-parser table and structural type resolution.
//!
//! The table maps leaf [`TypeKey`]s to parser constructors. Composite shapes
//! (unions, literals, enums, collections, tuples) are never registered; they
//! are decomposed by [`ParserRegistry::resolve`] into composite parsers that
//! delegate to resolved children.
//!
//! Reads go through an [`ArcSwap`] snapshot, so resolution never contends
//! with a concurrent registration.

use std::fmt;
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap as HashMap;

use crate::builtins::{
	CollectionParser, EnumParser, LiteralParser, TupleParser, UnionParser, register_builtins,
};
use crate::error::ConfigError;
use crate::parser::Parser;
use crate::value::{TypeDesc, TypeKey};

/// Builds a fresh parser instance for a leaf type.
pub type ParserCtor = Arc<dyn Fn() -> Arc<dyn Parser> + Send + Sync>;

/// What to do when a type already has a default parser.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
	/// Keep the constructor that was registered first.
	FirstWins,
	/// Overwrite with the constructor registered last.
	#[default]
	LastWins,
}

#[derive(Clone, Default)]
struct ParserTable {
	ctors: HashMap<TypeKey, ParserCtor>,
}

static GLOBAL: LazyLock<ParserRegistry> = LazyLock::new(ParserRegistry::with_builtins);

/// Shared handle to a table of default parsers.
///
/// Cloning the handle shares the table; use [`fork`](Self::fork) for an
/// independent copy.
#[derive(Clone)]
pub struct ParserRegistry {
	table: Arc<ArcSwap<ParserTable>>,
}

impl ParserRegistry {
	/// A registry with no parsers at all.
	pub fn empty() -> Self {
		Self {
			table: Arc::new(ArcSwap::from_pointee(ParserTable::default())),
		}
	}

	/// A registry preloaded with the builtin leaf parsers.
	pub fn with_builtins() -> Self {
		let registry = Self::empty();
		register_builtins(&registry);
		registry
	}

	/// The process-wide default registry.
	pub fn global() -> &'static ParserRegistry {
		&GLOBAL
	}

	/// Copies the current table into a registry that no longer shares state
	/// with this one.
	pub fn fork(&self) -> Self {
		Self {
			table: Arc::new(ArcSwap::new(self.table.load_full())),
		}
	}

	/// Installs `ctor` as the default parser for each of `types`, replacing
	/// existing defaults.
	pub fn register<F>(&self, types: impl IntoIterator<Item = TypeKey>, ctor: F)
	where
		F: Fn() -> Arc<dyn Parser> + Send + Sync + 'static,
	{
		self.register_with(DuplicatePolicy::LastWins, types, ctor);
	}

	/// Installs `ctor` for each of `types` according to `policy`.
	///
	/// Returns the number of types whose default changed.
	pub fn register_with<F>(
		&self,
		policy: DuplicatePolicy,
		types: impl IntoIterator<Item = TypeKey>,
		ctor: F,
	) -> usize
	where
		F: Fn() -> Arc<dyn Parser> + Send + Sync + 'static,
	{
		let types: Vec<TypeKey> = types.into_iter().collect();
		let ctor: ParserCtor = Arc::new(ctor);
		let mut installed = 0;

		self.table.rcu(|cur| {
			let mut next = ParserTable::clone(cur);
			installed = 0;
			for ty in &types {
				if policy == DuplicatePolicy::FirstWins && next.ctors.contains_key(ty) {
					continue;
				}
				next.ctors.insert(ty.clone(), ctor.clone());
				installed += 1;
			}
			next
		});

		tracing::trace!(count = installed, ?types, "registered default parser");
		installed
	}

	pub fn contains(&self, key: &TypeKey) -> bool {
		self.table.load().ctors.contains_key(key)
	}

	/// Builds a parser for `ty`, recursing through composite shapes.
	pub fn resolve(&self, ty: &TypeDesc) -> Result<Arc<dyn Parser>, ConfigError> {
		match ty {
			TypeDesc::Leaf(key) => self.leaf(key),
			TypeDesc::Optional(inner) => {
				let parser = self.resolve(inner)?;
				Ok(Arc::new(UnionParser::new(vec![parser], true)))
			}
			TypeDesc::Union(members) => self.resolve_union(members),
			TypeDesc::Literal(values) => {
				if values.is_empty() {
					return Err(ConfigError::EmptyLiteral);
				}
				let mut pairs = Vec::with_capacity(values.len());
				for value in values {
					let key = value
						.leaf_key()
						.ok_or_else(|| ConfigError::Unsupported(format!("literal {value:?}")))?;
					pairs.push((value.clone(), self.leaf(&key)?));
				}
				Ok(Arc::new(LiteralParser::new(pairs)))
			}
			TypeDesc::Enum(desc) => {
				let repr = desc.repr().ok_or_else(|| ConfigError::InvalidEnum {
					name: desc.name().to_string(),
					reason: "members must share one primitive type",
				})?;
				if desc.kind() == crate::EnumKind::Flag && repr != TypeKey::Int {
					return Err(ConfigError::InvalidEnum {
						name: desc.name().to_string(),
						reason: "flag members must be integers",
					});
				}
				let value_parser = self.leaf(&repr)?;
				Ok(Arc::new(EnumParser::new(desc.clone(), value_parser)))
			}
			TypeDesc::Collection { kind, inner, sep } => {
				if inner.is_sequence() {
					return Err(ConfigError::NestedSequence(ty.to_string()));
				}
				let sep = checked_sep(sep.as_deref())?;
				let inner = self.resolve(inner)?;
				Ok(Arc::new(CollectionParser::with_kind(*kind, inner, sep)))
			}
			TypeDesc::Tuple { items, sep } => {
				if items.is_empty() {
					return Err(ConfigError::EmptyTuple);
				}
				if items.iter().any(TypeDesc::is_sequence) {
					return Err(ConfigError::NestedSequence(ty.to_string()));
				}
				let sep = checked_sep(sep.as_deref())?;
				let parsers = items
					.iter()
					.map(|item| self.resolve(item))
					.collect::<Result<Vec<_>, _>>()?;
				Ok(Arc::new(TupleParser::new(parsers, sep)))
			}
		}
	}

	fn leaf(&self, key: &TypeKey) -> Result<Arc<dyn Parser>, ConfigError> {
		let table = self.table.load();
		let ctor = table
			.ctors
			.get(key)
			.ok_or_else(|| ConfigError::NoParser(key.clone()))?;
		Ok(ctor())
	}

	fn resolve_union(&self, members: &[TypeDesc]) -> Result<Arc<dyn Parser>, ConfigError> {
		if members.len() < 2 {
			return Err(ConfigError::UnionArity(members.len()));
		}

		let mut optional = false;
		let mut parsers = Vec::with_capacity(members.len());
		for member in members {
			match member {
				TypeDesc::Leaf(TypeKey::None) => optional = true,
				TypeDesc::Optional(inner) => {
					optional = true;
					parsers.push(self.resolve(inner)?);
				}
				other => parsers.push(self.resolve(other)?),
			}
		}

		if parsers.is_empty() {
			return Err(ConfigError::Unsupported("union of only none".to_string()));
		}
		Ok(Arc::new(UnionParser::new(parsers, optional)))
	}
}

impl Default for ParserRegistry {
	fn default() -> Self {
		Self::with_builtins()
	}
}

impl fmt::Debug for ParserRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let table = self.table.load();
		let mut keys: Vec<String> = table.ctors.keys().map(ToString::to_string).collect();
		keys.sort();
		f.debug_struct("ParserRegistry").field("types", &keys).finish()
	}
}

fn checked_sep(sep: Option<&str>) -> Result<Arc<str>, ConfigError> {
	match sep {
		Some("") => Err(ConfigError::EmptySeparator),
		Some(sep) => Ok(Arc::from(sep)),
		None => Ok(Arc::from(crate::builtins::DEFAULT_ITEM_SEPARATOR)),
	}
}

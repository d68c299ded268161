//! Memoised manager trees.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, LazyLock};

use compid_parser::ParserRegistry;
use compid_record::{DeclarationContext, EpochTable};
use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

use crate::config::{ConfigLoadError, ManagerConfig};
use crate::manager::Manager;

/// Name of the root manager of every namespace.
pub const ROOT: &str = "root";

static GLOBAL: LazyLock<Namespace> =
	LazyLock::new(|| Namespace::build(ManagerConfig::default(), ParserRegistry::global().clone()));

/// State shared by every manager of one namespace.
pub(crate) struct Shared {
	pub(crate) config: ManagerConfig,
	pub(crate) counter_chars: Vec<char>,
	pub(crate) parsers: ParserRegistry,
	pub(crate) epochs: EpochTable,
}

impl Shared {
	pub(crate) fn is_counter_char(&self, c: char) -> bool {
		self.config.count && self.counter_chars.contains(&c)
	}
}

/// One logical subsystem's set of managers.
///
/// Managers are created lazily by dotted name, together with any missing
/// ancestors, and live as long as the namespace.
#[derive(Clone)]
pub struct Namespace {
	shared: Arc<Shared>,
	managers: Arc<Mutex<HashMap<Arc<str>, Manager>>>,
}

impl Namespace {
	pub fn new(config: ManagerConfig) -> Result<Self, ConfigLoadError> {
		Self::with_parsers(config, ParserRegistry::with_builtins())
	}

	pub fn with_parsers(
		config: ManagerConfig,
		parsers: ParserRegistry,
	) -> Result<Self, ConfigLoadError> {
		config.validate()?;
		Ok(Self::build(config, parsers))
	}

	fn build(config: ManagerConfig, parsers: ParserRegistry) -> Self {
		Self {
			shared: Arc::new(Shared {
				counter_chars: config.counter_chars(),
				config,
				parsers,
				epochs: EpochTable::new(),
			}),
			managers: Arc::default(),
		}
	}

	/// The process-wide namespace, using the global parser table.
	pub fn global() -> &'static Namespace {
		&GLOBAL
	}

	pub fn config(&self) -> &ManagerConfig {
		&self.shared.config
	}

	pub fn parsers(&self) -> &ParserRegistry {
		&self.shared.parsers
	}

	pub fn epochs(&self) -> &EpochTable {
		&self.shared.epochs
	}

	/// Starts a new generation of a declaration context.
	pub fn declare_context(&self, name: &str) -> DeclarationContext {
		self.shared.epochs.declare(name)
	}

	/// Marks every record type declared under `name` as stale.
	pub fn unload_context(&self, name: &str) {
		self.shared.epochs.unload(name);
	}

	pub fn root(&self) -> Manager {
		self.manager(ROOT)
	}

	/// Returns the manager called `name`, creating it and its ancestors.
	///
	/// `"a.b"` is a child of `"a"`, which is a child of the root. Both `""`
	/// and `"root"` name the root. Empty segments are dropped, so `".a"` and
	/// `"a..b"` mean `"a"` and `"a.b"`.
	pub fn manager(&self, name: &str) -> Manager {
		let name = normalize(name);
		let mut managers = self.managers.lock();
		self.get_or_create(&mut managers, &name)
	}

	fn get_or_create(&self, managers: &mut HashMap<Arc<str>, Manager>, name: &str) -> Manager {
		if let Some(manager) = managers.get(name) {
			return manager.clone();
		}

		let parent = if name == ROOT {
			None
		} else {
			let parent = name.rsplit_once('.').map_or(ROOT, |(parent, _)| parent);
			Some(self.get_or_create(managers, parent))
		};

		let manager = Manager::new(Arc::from(name), parent, self.shared.clone());
		tracing::trace!(manager = name, "created manager");
		managers.insert(Arc::from(name), manager.clone());
		manager
	}

	/// Every manager created so far, sorted by name.
	pub fn managers(&self) -> Vec<Manager> {
		let mut managers: Vec<Manager> = self.managers.lock().values().cloned().collect();
		managers.sort_by(|a, b| a.name().cmp(b.name()));
		managers
	}
}

fn normalize(name: &str) -> Cow<'_, str> {
	if !name.split('.').any(str::is_empty) {
		return Cow::Borrowed(name);
	}
	let joined = name.split('.').filter(|s| !s.is_empty()).collect::<Vec<_>>().join(".");
	if joined.is_empty() {
		Cow::Borrowed(ROOT)
	} else {
		Cow::Owned(joined)
	}
}

impl Default for Namespace {
	fn default() -> Self {
		Self::build(ManagerConfig::default(), ParserRegistry::with_builtins())
	}
}

impl fmt::Debug for Namespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Namespace")
			.field("config", &self.shared.config)
			.field("managers", &self.managers.lock().len())
			.finish()
	}
}

#[cfg(test)]
mod tests;

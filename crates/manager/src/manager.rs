//! Manager nodes: registration and token resolution.
//!
//! Every registration is installed on the owning manager and on each of its
//! ancestors, so any ancestor can resolve tokens of its descendants. All
//! nodes holding one registration share its counter.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use compid_parser::ParserRegistry;
use compid_record::{Record, RecordError, RecordType, RecordTypeBuilder, TokenIssuer};
use compid_token::{TokenSpec, split_name};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap as HashMap;

use crate::config::ManagerConfig;
use crate::dispatch::{ExceptionHandler, Middleware};
use crate::error::RegistryError;
use crate::host::SubscriptionId;
use crate::namespace::Shared;

/// One registration as seen from a node holding it.
#[derive(Clone)]
pub(crate) struct Entry {
	pub(crate) record_type: Arc<RecordType>,
	pub(crate) spec: Arc<TokenSpec>,
	pub(crate) owner: Weak<ManagerNode>,
	counter: Arc<AtomicUsize>,
}

impl Entry {
	/// Live while its declaration context is current and its owner exists.
	fn is_live(&self) -> bool {
		self.record_type.is_live() && self.owner.strong_count() > 0
	}
}

pub(crate) struct ManagerNode {
	name: Arc<str>,
	parent: Option<Manager>,
	shared: Arc<Shared>,
	children: RwLock<Vec<Weak<ManagerNode>>>,
	entries: RwLock<HashMap<Arc<str>, Entry>>,
	pub(crate) middleware: RwLock<Option<Arc<dyn Middleware>>>,
	pub(crate) exception_handler: RwLock<Option<Arc<dyn ExceptionHandler>>>,
	pub(crate) hosts: Mutex<HashMap<usize, SubscriptionId>>,
}

/// Handle to a node of a manager tree. Cloning is cheap and shares the node.
#[derive(Clone)]
pub struct Manager {
	pub(crate) node: Arc<ManagerNode>,
}

/// A token matched to a registration.
#[derive(Clone)]
pub struct Resolved {
	/// Registered identifier, without any counter suffix.
	pub identifier: Arc<str>,
	pub record_type: Arc<RecordType>,
	/// Manager the record type is registered with, if it still exists.
	pub owner: Option<Manager>,
	/// Raw state segments, in field order.
	pub fields: Vec<String>,
	/// False when the registration is stale and must not be dispatched.
	pub live: bool,
}

impl fmt::Debug for Resolved {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Resolved")
			.field("identifier", &self.identifier)
			.field("owner", &self.owner.as_ref().map(Manager::name))
			.field("fields", &self.fields)
			.field("live", &self.live)
			.finish()
	}
}

impl Manager {
	pub(crate) fn new(name: Arc<str>, parent: Option<Manager>, shared: Arc<Shared>) -> Self {
		let node = Arc::new(ManagerNode {
			name,
			parent,
			shared,
			children: RwLock::default(),
			entries: RwLock::default(),
			middleware: RwLock::default(),
			exception_handler: RwLock::default(),
			hosts: Mutex::default(),
		});
		if let Some(parent) = &node.parent {
			parent.node.children.write().push(Arc::downgrade(&node));
		}
		Self { node }
	}

	fn from_node(node: Arc<ManagerNode>) -> Self {
		Self { node }
	}

	pub fn name(&self) -> &str {
		&self.node.name
	}

	pub fn parent(&self) -> Option<Manager> {
		self.node.parent.clone()
	}

	pub fn children(&self) -> Vec<Manager> {
		self.node
			.children
			.read()
			.iter()
			.filter_map(Weak::upgrade)
			.map(Self::from_node)
			.collect()
	}

	pub fn config(&self) -> &ManagerConfig {
		&self.node.shared.config
	}

	pub fn parsers(&self) -> &ParserRegistry {
		&self.node.shared.parsers
	}

	/// This manager followed by its ancestors, up to the root.
	pub(crate) fn ancestry(&self) -> Vec<Manager> {
		let mut chain = vec![self.clone()];
		let mut current = self.parent();
		while let Some(manager) = current {
			current = manager.parent();
			chain.push(manager);
		}
		chain
	}

	/// Starts a record type declaration using this tree's separator.
	pub fn record_type(&self, name: &str) -> RecordTypeBuilder {
		RecordType::builder(name).separator(self.config().separator.as_str())
	}

	/// Finalizes `builder` against this tree's parsers and registers the
	/// result under its own name.
	pub fn declare(&self, builder: RecordTypeBuilder) -> Result<Arc<RecordType>, RegistryError> {
		let record_type = builder.finalize(self.parsers())?;
		self.register(&record_type)?;
		Ok(record_type)
	}

	/// Registers `record_type` under its token name.
	pub fn register(&self, record_type: &Arc<RecordType>) -> Result<(), RegistryError> {
		let identifier = record_type.spec().name().to_string();
		self.register_as(record_type, &identifier)
	}

	/// Registers `record_type` under `identifier`.
	///
	/// Registering the same type again is a no-op. A live registration of
	/// another type under the same identifier is an error; a stale one is
	/// superseded.
	pub fn register_as(
		&self,
		record_type: &Arc<RecordType>,
		identifier: &str,
	) -> Result<(), RegistryError> {
		let shared = &self.node.shared;
		if record_type.separator() != shared.config.separator {
			return Err(RegistryError::SeparatorMismatch {
				record: record_type.name().to_string(),
				expected: shared.config.separator.clone(),
				got: record_type.separator().to_string(),
			});
		}
		if let Some(owner) = record_type.owner()
			&& !self.is_issuer(&owner)
		{
			return Err(RegistryError::AlreadyOwned {
				record: record_type.name().to_string(),
				owner: owner.issuer_name().to_string(),
			});
		}

		let chain = self.ancestry();
		let mut stale = Vec::new();
		for manager in &chain {
			let entries = manager.node.entries.read();
			if let Some(existing) = entries.get(identifier) {
				if Arc::ptr_eq(&existing.record_type, record_type) {
					return Ok(());
				}
				if existing.is_live() {
					return Err(RegistryError::DuplicateIdentifier {
						identifier: identifier.to_string(),
					});
				}
				stale.push(existing.clone());
			}
			if let Some(existing) = find_ambiguous(shared, &entries, identifier) {
				return Err(RegistryError::AmbiguousIdentifier {
					identifier: identifier.to_string(),
					existing: existing.to_string(),
				});
			}
		}

		let spec = if record_type.spec().name() == identifier {
			record_type.spec().clone()
		} else {
			record_type.spec().renamed(identifier)?
		};

		for entry in stale {
			tracing::warn!(
				identifier,
				record = entry.record_type.name(),
				"superseding stale registration"
			);
			evict(identifier, &entry);
		}

		let identifier: Arc<str> = Arc::from(identifier);
		let entry = Entry {
			record_type: record_type.clone(),
			spec: Arc::new(spec),
			owner: Arc::downgrade(&self.node),
			counter: Arc::default(),
		};
		for manager in &chain {
			manager
				.node
				.entries
				.write()
				.insert(identifier.clone(), entry.clone());
		}
		let issuer: Weak<dyn TokenIssuer> = Arc::downgrade(&self.node) as Weak<dyn TokenIssuer>;
		record_type.set_owner(Some(issuer));

		tracing::debug!(
			identifier = %identifier,
			manager = self.name(),
			template = entry.spec.template(),
			"registered record type"
		);
		Ok(())
	}

	/// Removes every registration of `record_type` from this manager and its
	/// ancestors. Does nothing if it is not registered.
	pub fn deregister(&self, record_type: &Arc<RecordType>) {
		let mut removed = false;
		for manager in self.ancestry() {
			manager.node.entries.write().retain(|_, entry| {
				let keep = !Arc::ptr_eq(&entry.record_type, record_type);
				removed |= !keep;
				keep
			});
		}
		if let Some(owner) = record_type.owner()
			&& self.is_issuer(&owner)
		{
			record_type.set_owner(None);
		}
		if removed {
			tracing::debug!(
				record = record_type.name(),
				manager = self.name(),
				"deregistered record type"
			);
		}
	}

	/// Returns true if `record_type` is visible from this manager.
	pub fn is_registered(&self, record_type: &Arc<RecordType>) -> bool {
		self.node
			.entries
			.read()
			.values()
			.any(|entry| Arc::ptr_eq(&entry.record_type, record_type))
	}

	/// Every record type visible from this manager: its own and those of
	/// its descendants, sorted by identifier.
	pub fn record_types(&self) -> Vec<(Arc<str>, Arc<RecordType>)> {
		let mut types: Vec<_> = self
			.node
			.entries
			.read()
			.iter()
			.map(|(id, entry)| (id.clone(), entry.record_type.clone()))
			.collect();
		types.sort_by(|a, b| a.0.cmp(&b.0));
		types
	}

	/// Matches `token` against the registrations visible from this manager.
	///
	/// A trailing counter character on the name portion is stripped when the
	/// name itself is not registered. Tokens that do not match the
	/// registration's spec resolve to `None`, like unknown tokens.
	pub fn resolve(&self, token: &str) -> Option<Resolved> {
		let shared = &self.node.shared;
		let (name, _) = split_name(token, &shared.config.separator);

		let (identifier, entry) = {
			let entries = self.node.entries.read();
			match entries.get_key_value(name) {
				Some((id, entry)) => (id.clone(), entry.clone()),
				None => {
					let mut chars = name.chars();
					let last = chars.next_back()?;
					if !shared.is_counter_char(last) {
						return None;
					}
					let (id, entry) = entries.get_key_value(chars.as_str())?;
					(id.clone(), entry.clone())
				}
			}
		};

		let canonical = format!("{identifier}{}", &token[name.len()..]);
		let fields = match entry.spec.decode(&canonical) {
			Ok(fields) => fields.into_iter().map(str::to_string).collect(),
			Err(err) => {
				tracing::debug!(
					token,
					identifier = %identifier,
					error = %err,
					"token does not match spec"
				);
				return None;
			}
		};

		Some(Resolved {
			live: entry.is_live(),
			owner: entry.owner.upgrade().map(Self::from_node),
			identifier,
			record_type: entry.record_type,
			fields,
		})
	}

	/// Drops a stale registration from every node that holds it.
	pub(crate) fn evict(&self, resolved: &Resolved) {
		let entry = self
			.node
			.entries
			.read()
			.get(&resolved.identifier)
			.filter(|entry| Arc::ptr_eq(&entry.record_type, &resolved.record_type))
			.cloned();
		if let Some(entry) = entry {
			tracing::debug!(
				identifier = %resolved.identifier,
				record = resolved.record_type.name(),
				"evicting stale registration"
			);
			evict(&resolved.identifier, &entry);
			// The owner may already be gone, in which case only this chain
			// still holds the entry.
			for manager in self.ancestry() {
				remove_entry(&manager, &resolved.identifier, &entry.record_type);
			}
		}
	}

	fn is_issuer(&self, issuer: &Arc<dyn TokenIssuer>) -> bool {
		std::ptr::addr_eq(Arc::as_ptr(issuer), Arc::as_ptr(&self.node))
	}
}

impl ManagerNode {
	/// The registration of `record_type` owned by this node.
	fn own_entry(&self, record_type: &Arc<RecordType>) -> Option<Entry> {
		self.entries
			.read()
			.values()
			.find(|entry| {
				Arc::ptr_eq(&entry.record_type, record_type)
					&& std::ptr::eq(entry.owner.as_ptr(), self)
			})
			.cloned()
	}

	fn next_counter(&self, entry: &Entry) -> Option<char> {
		let shared = &self.shared;
		if !shared.config.count || shared.counter_chars.is_empty() {
			return None;
		}
		let len = shared.counter_chars.len();
		let n = entry.counter.fetch_add(1, Ordering::Relaxed);
		if n > 0 && n % len == 0 {
			tracing::warn!(
				manager = %self.name,
				record = entry.record_type.name(),
				issued = n,
				"counter wrapped, tokens may repeat"
			);
		}
		shared.counter_chars.get(n % len).copied()
	}
}

#[async_trait]
impl TokenIssuer for ManagerNode {
	fn issuer_name(&self) -> &str {
		&self.name
	}

	async fn issue(&self, record: &Record) -> Result<String, RecordError> {
		let entry = self
			.own_entry(record.record_type())
			.ok_or_else(|| RecordError::NotRegistered(record.record_type().name().to_string()))?;
		let raw = record.raw_fields().await?;
		let token = entry.spec.encode_with_suffix(&raw, self.next_counter(&entry))?;

		let len = token.chars().count();
		let max = self.shared.config.max_token_len;
		if len > max {
			return Err(RecordError::TooLong { len, max });
		}
		Ok(token)
	}
}

impl Manager {
	/// Encodes `record` with this manager's registration of its type.
	pub async fn dumps(&self, record: &Record) -> Result<String, RecordError> {
		self.node.issue(record).await
	}
}

impl PartialEq for Manager {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.node, &other.node)
	}
}

impl Eq for Manager {}

impl fmt::Debug for Manager {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Manager").field(&self.node.name).finish()
	}
}

impl fmt::Debug for ManagerNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ManagerNode")
			.field("name", &self.name)
			.field("entries", &self.entries.read().len())
			.finish_non_exhaustive()
	}
}

/// Finds a registered identifier that equals `identifier` plus or minus one
/// trailing counter character.
fn find_ambiguous<'e>(
	shared: &Shared,
	entries: &'e HashMap<Arc<str>, Entry>,
	identifier: &str,
) -> Option<&'e str> {
	if !shared.config.count {
		return None;
	}
	let extends = |longer: &str, shorter: &str| {
		longer
			.strip_prefix(shorter)
			.and_then(|rest| {
				let mut chars = rest.chars();
				let c = chars.next()?;
				chars.as_str().is_empty().then_some(c)
			})
			.is_some_and(|c| shared.is_counter_char(c))
	};
	entries
		.iter()
		.filter(|(_, entry)| entry.is_live())
		.map(|(id, _)| &**id)
		.find(|&id| extends(id, identifier) || extends(identifier, id))
}

/// Removes `entry` from its owner and the owner's ancestors, and unbinds the
/// superseded type from its owner.
fn evict(identifier: &str, entry: &Entry) {
	if let Some(owner) = entry.owner.upgrade().map(Manager::from_node) {
		for manager in owner.ancestry() {
			remove_entry(&manager, identifier, &entry.record_type);
		}
	}
	entry.record_type.set_owner(None);
}

fn remove_entry(manager: &Manager, identifier: &str, record_type: &Arc<RecordType>) {
	let mut entries = manager.node.entries.write();
	if entries
		.get(identifier)
		.is_some_and(|e| Arc::ptr_eq(&e.record_type, record_type))
	{
		entries.remove(identifier);
	}
}

#[cfg(test)]
mod tests;

//! Binding managers to the host that delivers events.

use std::sync::Arc;

use async_trait::async_trait;
use compid_parser::Event;

use crate::error::RegistryError;
use crate::manager::Manager;

/// Handle returned by [`EventSource::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Receives every inbound event from a host.
#[async_trait]
pub trait EventListener: Send + Sync {
	async fn on_event(&self, event: &dyn Event);
}

/// A host delivering inbound events to its subscribers.
pub trait EventSource: Send + Sync {
	fn subscribe(&self, listener: Arc<dyn EventListener>) -> SubscriptionId;

	fn unsubscribe(&self, id: SubscriptionId);
}

#[async_trait]
impl EventListener for Manager {
	async fn on_event(&self, event: &dyn Event) {
		self.handle_event(event).await;
	}
}

/// Identity of a host, by the address of its shared allocation.
fn host_key(source: &Arc<dyn EventSource>) -> usize {
	Arc::as_ptr(source).cast::<()>() as usize
}

impl Manager {
	/// Subscribes this manager to `source`. Events are resolved from this
	/// manager, so only its own and its descendants' record types match.
	pub fn add_to_host(
		&self,
		source: &Arc<dyn EventSource>,
	) -> Result<SubscriptionId, RegistryError> {
		let key = host_key(source);
		let mut hosts = self.node.hosts.lock();
		if hosts.contains_key(&key) {
			return Err(RegistryError::AlreadyBound(self.name().to_string()));
		}
		let id = source.subscribe(Arc::new(self.clone()));
		hosts.insert(key, id);
		tracing::debug!(manager = self.name(), subscription = id.0, "bound to host");
		Ok(id)
	}

	pub fn remove_from_host(&self, source: &Arc<dyn EventSource>) -> Result<(), RegistryError> {
		let id = self
			.node
			.hosts
			.lock()
			.remove(&host_key(source))
			.ok_or_else(|| RegistryError::NotBound(self.name().to_string()))?;
		source.unsubscribe(id);
		tracing::debug!(manager = self.name(), subscription = id.0, "unbound from host");
		Ok(())
	}
}

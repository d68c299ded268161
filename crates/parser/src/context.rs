//! Context threaded through every `loads` call.

use std::any::Any;
use std::sync::Arc;

use crate::value::Value;

/// An inbound event delivered by the host.
///
/// The dispatcher only needs the token; parsers may downcast through
/// [`as_any`](Self::as_any) to reach host-specific data (the guild a member
/// belongs to, the message a button was attached to, ...).
pub trait Event: Send + Sync {
	/// The component id carried by the event.
	fn token(&self) -> &str;

	/// Raw input submitted with the event for a named field, such as
	/// selected option values or form text.
	fn input(&self, _name: &str) -> Option<&str> {
		None
	}

	fn as_any(&self) -> &dyn Any;
}

/// Execution context for a single decode.
///
/// Fields are parsed in declaration order, and each successfully decoded
/// value is pushed here so later parsers can depend on earlier ones.
pub struct ParseContext<'a> {
	event: Option<&'a dyn Event>,
	decoded: Vec<(Arc<str>, Value)>,
}

impl<'a> ParseContext<'a> {
	pub fn new(event: &'a dyn Event) -> Self {
		Self {
			event: Some(event),
			decoded: Vec::new(),
		}
	}

	/// A context with no inbound event, for decoding outside dispatch.
	pub fn detached() -> Self {
		Self {
			event: None,
			decoded: Vec::new(),
		}
	}

	pub fn from_option(event: Option<&'a dyn Event>) -> Self {
		Self {
			event,
			decoded: Vec::new(),
		}
	}

	pub fn event(&self) -> Option<&'a dyn Event> {
		self.event
	}

	/// Downcasts the inbound event to a concrete host type.
	pub fn event_as<T: Any>(&self) -> Option<&'a T> {
		self.event?.as_any().downcast_ref()
	}

	/// A value decoded earlier in the same record.
	pub fn previous(&self, field: &str) -> Option<&Value> {
		self.decoded
			.iter()
			.find(|(name, _)| &**name == field)
			.map(|(_, v)| v)
	}

	pub fn push(&mut self, field: Arc<str>, value: Value) {
		self.decoded.push((field, value));
	}
}

impl std::fmt::Debug for ParseContext<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ParseContext")
			.field("event", &self.event.map(Event::token))
			.field("decoded", &self.decoded)
			.finish()
	}
}

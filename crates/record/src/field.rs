use std::sync::Arc;

use compid_parser::{Parser, TypeDesc, Value};

/// Where a field's value comes from when a record is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
	/// Travels inside the token, in declaration order.
	State,
	/// Read from the inbound event's named input rather than the token.
	Event,
	/// Never parsed; always starts from its default.
	Internal,
}

/// Declaration of one named slot of a record type.
#[derive(Debug, Clone)]
pub struct Field {
	name: Arc<str>,
	ty: Option<TypeDesc>,
	default: Option<Value>,
	parser: Option<Arc<dyn Parser>>,
	role: FieldRole,
}

impl Field {
	pub fn state(name: impl Into<Arc<str>>, ty: impl Into<TypeDesc>) -> Self {
		Self::with_role(name.into(), Some(ty.into()), FieldRole::State)
	}

	pub fn event(name: impl Into<Arc<str>>, ty: impl Into<TypeDesc>) -> Self {
		Self::with_role(name.into(), Some(ty.into()), FieldRole::Event)
	}

	pub fn internal(name: impl Into<Arc<str>>, default: impl Into<Value>) -> Self {
		Self::with_role(name.into(), None, FieldRole::Internal).default(default)
	}

	fn with_role(name: Arc<str>, ty: Option<TypeDesc>, role: FieldRole) -> Self {
		Self {
			name,
			ty,
			default: None,
			parser: None,
			role,
		}
	}

	/// Sets the value used when none is given at construction, or when an
	/// event field has no input.
	pub fn default(mut self, value: impl Into<Value>) -> Self {
		self.default = Some(value.into());
		self
	}

	/// Overrides the parser that would be resolved from the declared type.
	pub fn parser(mut self, parser: Arc<dyn Parser>) -> Self {
		self.parser = Some(parser);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub(crate) fn name_arc(&self) -> &Arc<str> {
		&self.name
	}

	/// Declared type. Internal fields have none.
	pub fn ty(&self) -> Option<&TypeDesc> {
		self.ty.as_ref()
	}

	pub fn default_value(&self) -> Option<&Value> {
		self.default.as_ref()
	}

	pub fn explicit_parser(&self) -> Option<&Arc<dyn Parser>> {
		self.parser.as_ref()
	}

	pub fn role(&self) -> FieldRole {
		self.role
	}
}

use std::fmt;
use std::sync::Arc;

use compid_parser::Value;
use rustc_hash::FxHashMap as HashMap;

use crate::error::RecordError;
use crate::record_type::{RecordType, TokenIssuer};

/// Concrete field values of one record type.
#[derive(Clone)]
pub struct Record {
	record_type: Arc<RecordType>,
	values: Vec<Value>,
}

impl Record {
	pub(crate) fn from_parts(record_type: Arc<RecordType>, values: Vec<Value>) -> Self {
		Self {
			record_type,
			values,
		}
	}

	pub fn record_type(&self) -> &Arc<RecordType> {
		&self.record_type
	}

	/// The manager that will encode this record, if its type is registered.
	pub fn manager(&self) -> Option<Arc<dyn TokenIssuer>> {
		self.record_type.owner()
	}

	pub fn get(&self, field: &str) -> Option<&Value> {
		let (index, _) = self.record_type.factory().slot(field)?;
		self.values.get(index)
	}

	/// Field values in declaration order.
	pub fn values(&self) -> &[Value] {
		&self.values
	}

	/// Iterates `(field name, value)` pairs in declaration order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.record_type
			.fields()
			.map(|f| f.name())
			.zip(self.values.iter())
	}

	/// Replaces a field value. The value must be one the field's parser
	/// can dump.
	pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), RecordError> {
		let value = value.into();
		let index = check(&self.record_type, field, &value)?;
		self.values[index] = value;
		Ok(())
	}

	/// Dumps every state field, in order, without assembling a token.
	pub async fn raw_fields(&self) -> Result<Vec<String>, RecordError> {
		self.record_type.factory().dumps(&self.values).await
	}

	/// Encodes the record into its token.
	///
	/// Registered types go through their manager, which applies the
	/// registered identifier and counter suffix; unregistered types encode
	/// with their own spec.
	pub async fn dumps(&self) -> Result<String, RecordError> {
		if let Some(issuer) = self.manager() {
			return issuer.issue(self).await;
		}
		let raw = self.raw_fields().await?;
		Ok(self.record_type.spec().encode(&raw)?)
	}
}

impl PartialEq for Record {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.record_type, &other.record_type) && self.values == other.values
	}
}

impl fmt::Debug for Record {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut s = f.debug_struct(self.record_type.name());
		for (name, value) in self.iter() {
			s.field(name, value);
		}
		s.finish()
	}
}

/// Builds a [`Record`] from named values.
///
/// Fields left unset take their default; errors are reported by
/// [`build`](Self::build).
pub struct RecordBuilder {
	record_type: Arc<RecordType>,
	values: HashMap<String, Value>,
	order: Vec<String>,
}

impl RecordBuilder {
	pub(crate) fn new(record_type: Arc<RecordType>) -> Self {
		Self {
			record_type,
			values: HashMap::default(),
			order: Vec::new(),
		}
	}

	pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
		let field = field.into();
		if self.values.insert(field.clone(), value.into()).is_none() {
			self.order.push(field);
		}
		self
	}

	pub fn build(mut self) -> Result<Record, RecordError> {
		let record = self.record_type.name().to_string();

		for field in &self.order {
			if self.record_type.field(field).is_none() {
				return Err(RecordError::UnknownField {
					record,
					field: field.clone(),
				});
			}
		}

		let mut values = Vec::with_capacity(self.record_type.factory().slots().len());
		for slot in self.record_type.factory().slots() {
			let name = slot.field.name();
			let value = match (self.values.remove(name), &slot.default) {
				(Some(value), _) => value,
				(None, Some(default)) => default.clone(),
				(None, None) => {
					return Err(RecordError::MissingField {
						record,
						field: name.to_string(),
					});
				}
			};
			check(&self.record_type, name, &value)?;
			values.push(value);
		}

		Ok(Record::from_parts(self.record_type, values))
	}
}

fn check(record_type: &RecordType, field: &str, value: &Value) -> Result<usize, RecordError> {
	let Some((index, slot)) = record_type.factory().slot(field) else {
		return Err(RecordError::UnknownField {
			record: record_type.name().to_string(),
			field: field.to_string(),
		});
	};
	if !slot.accepts(value) {
		return Err(RecordError::TypeMismatch {
			record: record_type.name().to_string(),
			field: field.to_string(),
			expected: slot
				.field
				.ty()
				.map_or_else(|| "any".to_string(), ToString::to_string),
			got: value.kind_name(),
		});
	}
	Ok(index)
}

//! Field-by-field conversion between raw token segments and values.

use std::sync::Arc;

use compid_parser::{Event, ParseContext, ParseError, Parser, Value};

use crate::error::{ConversionError, FieldError, RecordError};
use crate::field::{Field, FieldRole};

/// A finalized field: the declaration plus everything resolved for it.
#[derive(Debug)]
pub(crate) struct Slot {
	pub(crate) field: Field,
	/// `None` only for internal fields.
	pub(crate) parser: Option<Arc<dyn Parser>>,
	/// An empty segment decodes to [`Value::None`] without calling the parser.
	pub(crate) optional: bool,
	/// Explicit default, or none for optional fields without one.
	pub(crate) default: Option<Value>,
}

impl Slot {
	fn name(&self) -> &str {
		self.field.name()
	}

	/// Returns true if `value` may be stored in this slot.
	pub(crate) fn accepts(&self, value: &Value) -> bool {
		match &self.parser {
			_ if self.optional && value.is_none() => true,
			Some(parser) => parser.owns(value),
			None => true,
		}
	}

	async fn load(&self, ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		if self.optional && raw.is_empty() {
			return Ok(Value::None);
		}
		match &self.parser {
			Some(parser) => parser.loads(ctx, raw).await,
			None => Err(ParseError::Missing),
		}
	}
}

/// Builds record values from token segments and back.
///
/// Built once per record type; every check that can be done ahead of time
/// was done by [`RecordTypeBuilder::finalize`](crate::RecordTypeBuilder::finalize).
#[derive(Debug)]
pub struct RecordFactory {
	record: Arc<str>,
	slots: Vec<Slot>,
}

impl RecordFactory {
	pub(crate) fn new(record: Arc<str>, slots: Vec<Slot>) -> Self {
		Self { record, slots }
	}

	pub(crate) fn slots(&self) -> &[Slot] {
		&self.slots
	}

	pub(crate) fn slot(&self, name: &str) -> Option<(usize, &Slot)> {
		self.slots.iter().enumerate().find(|(_, s)| s.name() == name)
	}

	/// Number of fields that travel inside the token.
	pub fn state_count(&self) -> usize {
		self.state_slots().count()
	}

	fn state_slots(&self) -> impl Iterator<Item = &Slot> {
		self.slots.iter().filter(|s| s.field.role() == FieldRole::State)
	}

	/// Converts the raw state segments, reading event fields from `event`.
	///
	/// Fields are converted in declaration order, and every converted value
	/// is visible to the parsers of later fields. All failures are collected
	/// rather than stopping at the first.
	pub async fn loads(
		&self,
		event: Option<&dyn Event>,
		raw: &[&str],
	) -> Result<Vec<Value>, ConversionError> {
		let expected = self.state_count();
		if raw.len() != expected {
			return Err(ConversionError {
				record: self.record.to_string(),
				errors: vec![FieldError {
					field: Arc::from("<token>"),
					raw: Some(raw.join(",")),
					error: ParseError::Arity {
						expected,
						got: raw.len(),
					},
				}],
			});
		}

		let mut ctx = ParseContext::from_option(event);
		let mut raw = raw.iter();
		let mut values = Vec::with_capacity(self.slots.len());
		let mut errors = Vec::new();

		for slot in &self.slots {
			let input = match slot.field.role() {
				FieldRole::State => raw.next().copied(),
				FieldRole::Event => event.and_then(|e| e.input(slot.name())),
				FieldRole::Internal => None,
			};

			let result = match (input, &slot.default) {
				(Some(input), _) => slot.load(&ctx, input).await,
				(None, Some(default)) => Ok(default.clone()),
				(None, None) => Err(ParseError::Missing),
			};

			match result {
				Ok(value) => {
					ctx.push(slot.field.name_arc().clone(), value.clone());
					values.push(value);
				}
				Err(error) => {
					errors.push(FieldError {
						field: slot.field.name_arc().clone(),
						raw: input.map(str::to_string),
						error,
					});
					values.push(Value::None);
				}
			}
		}

		if errors.is_empty() {
			Ok(values)
		} else {
			Err(ConversionError {
				record: self.record.to_string(),
				errors,
			})
		}
	}

	/// Dumps the state fields of `values`, in field order.
	pub async fn dumps(&self, values: &[Value]) -> Result<Vec<String>, RecordError> {
		let mut out = Vec::with_capacity(self.state_count());
		for (slot, value) in self.slots.iter().zip(values) {
			if slot.field.role() != FieldRole::State {
				continue;
			}
			if slot.optional && value.is_none() {
				out.push(String::new());
				continue;
			}
			let Some(parser) = &slot.parser else {
				continue;
			};
			let dumped = parser.dumps(value).await.map_err(|source| RecordError::Dump {
				record: self.record.to_string(),
				field: slot.name().to_string(),
				source,
			})?;
			out.push(dumped);
		}
		Ok(out)
	}
}

#[cfg(test)]
mod tests;

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use compid_parser::{Event, ParserRegistry, Value};
use compid_token::{DEFAULT_SEPARATOR, TokenSpec};
use parking_lot::RwLock;
use rustc_hash::FxHashSet as HashSet;

use crate::epoch::DeclarationContext;
use crate::error::{ConversionError, RecordError, SchemaError};
use crate::factory::{RecordFactory, Slot};
use crate::field::{Field, FieldRole};
use crate::record::{Record, RecordBuilder};

/// Callback invoked with a decoded record when its token comes back.
#[async_trait]
pub trait Handler: Send + Sync {
	async fn invoke(&self, record: Record, event: &dyn Event) -> anyhow::Result<()>;
}

/// Adapts an async closure over the decoded record into a [`Handler`].
pub struct HandlerFn<F>(F);

pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
	F: Fn(Record) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
	HandlerFn(f)
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
	F: Fn(Record) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
	async fn invoke(&self, record: Record, _event: &dyn Event) -> anyhow::Result<()> {
		(self.0)(record).await
	}
}

/// Whatever turns a record into its final token: usually the manager the
/// record type is registered with, which owns the identifier and counter.
#[async_trait]
pub trait TokenIssuer: Send + Sync + fmt::Debug {
	fn issuer_name(&self) -> &str;

	async fn issue(&self, record: &Record) -> Result<String, RecordError>;
}

/// An immutable record schema: ordered fields, token spec and factory.
pub struct RecordType {
	name: Arc<str>,
	spec: TokenSpec,
	factory: RecordFactory,
	context: Option<DeclarationContext>,
	handler: Option<Arc<dyn Handler>>,
	owner: RwLock<Option<Weak<dyn TokenIssuer>>>,
}

impl RecordType {
	pub fn builder(name: impl Into<Arc<str>>) -> RecordTypeBuilder {
		RecordTypeBuilder::new(name.into())
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Token spec over the state fields. Its name defaults to the type name.
	pub fn spec(&self) -> &TokenSpec {
		&self.spec
	}

	pub fn separator(&self) -> &str {
		self.spec.separator()
	}

	pub fn factory(&self) -> &RecordFactory {
		&self.factory
	}

	pub fn fields(&self) -> impl Iterator<Item = &Field> {
		self.factory.slots().iter().map(|s| &s.field)
	}

	pub fn field(&self, name: &str) -> Option<&Field> {
		self.factory.slot(name).map(|(_, s)| &s.field)
	}

	pub fn context(&self) -> Option<&DeclarationContext> {
		self.context.as_ref()
	}

	/// Types declared without a context never go stale.
	pub fn is_live(&self) -> bool {
		self.context.as_ref().is_none_or(DeclarationContext::is_current)
	}

	pub fn handler(&self) -> Option<&Arc<dyn Handler>> {
		self.handler.as_ref()
	}

	/// The issuer this type is registered with, if it is still alive.
	pub fn owner(&self) -> Option<Arc<dyn TokenIssuer>> {
		self.owner.read().as_ref().and_then(Weak::upgrade)
	}

	/// Binds or clears the issuer used by [`Record::dumps`].
	pub fn set_owner(&self, owner: Option<Weak<dyn TokenIssuer>>) {
		*self.owner.write() = owner;
	}

	/// Starts building an instance of this type.
	pub fn instance(self: &Arc<Self>) -> RecordBuilder {
		RecordBuilder::new(self.clone())
	}

	/// Decodes raw state segments into a record.
	pub async fn loads(
		self: &Arc<Self>,
		event: Option<&dyn Event>,
		raw: &[&str],
	) -> Result<Record, ConversionError> {
		let values = self.factory.loads(event, raw).await?;
		Ok(Record::from_parts(self.clone(), values))
	}
}

impl fmt::Debug for RecordType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RecordType")
			.field("name", &self.name)
			.field("spec", &self.spec)
			.field("context", &self.context)
			.finish_non_exhaustive()
	}
}

/// Collects a record type declaration. Nothing is validated until
/// [`finalize`](Self::finalize).
pub struct RecordTypeBuilder {
	name: Arc<str>,
	token_name: Option<Arc<str>>,
	sep: Arc<str>,
	fields: Vec<Field>,
	context: Option<DeclarationContext>,
	handler: Option<Arc<dyn Handler>>,
}

impl RecordTypeBuilder {
	fn new(name: Arc<str>) -> Self {
		Self {
			name,
			token_name: None,
			sep: Arc::from(DEFAULT_SEPARATOR),
			fields: Vec::new(),
			context: None,
			handler: None,
		}
	}

	pub fn field(mut self, field: Field) -> Self {
		self.fields.push(field);
		self
	}

	pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
		self.fields.extend(fields);
		self
	}

	pub fn separator(mut self, sep: impl Into<Arc<str>>) -> Self {
		self.sep = sep.into();
		self
	}

	/// Name written at the start of tokens, when it should differ from the
	/// type name.
	pub fn token_name(mut self, name: impl Into<Arc<str>>) -> Self {
		self.token_name = Some(name.into());
		self
	}

	pub fn context(mut self, context: DeclarationContext) -> Self {
		self.context = Some(context);
		self
	}

	pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
		self.handler = Some(Arc::new(handler));
		self
	}

	pub fn shared_handler(mut self, handler: Arc<dyn Handler>) -> Self {
		self.handler = Some(handler);
		self
	}

	/// Validates the declaration and freezes it.
	///
	/// Every problem that could otherwise surface while handling an event is
	/// reported here: duplicate fields, unresolvable types, defaults the
	/// field's parser would not accept, item separators that overlap the
	/// record separator, and token names that collide with the separator.
	pub fn finalize(self, parsers: &ParserRegistry) -> Result<Arc<RecordType>, SchemaError> {
		let record = self.name.to_string();

		let mut seen = HashSet::default();
		for field in &self.fields {
			if !seen.insert(field.name()) {
				return Err(SchemaError::DuplicateField {
					record,
					field: field.name().to_string(),
				});
			}
			check_item_separators(&record, field, &self.sep)?;
		}

		let mut slots = Vec::with_capacity(self.fields.len());
		for field in self.fields {
			slots.push(build_slot(&record, field, parsers)?);
		}

		let token_name = self.token_name.as_deref().unwrap_or(&self.name);
		let state_fields = slots
			.iter()
			.filter(|s| s.field.role() == FieldRole::State)
			.map(|s| s.field.name_arc().clone());
		let spec = TokenSpec::compile(token_name, &self.sep, state_fields)?;

		tracing::debug!(
			record = %self.name,
			template = spec.template(),
			fields = slots.len(),
			"finalized record type"
		);

		Ok(Arc::new(RecordType {
			factory: RecordFactory::new(self.name.clone(), slots),
			name: self.name,
			spec,
			context: self.context,
			handler: self.handler,
			owner: RwLock::new(None),
		}))
	}
}

/// Rejects a state field whose collection or tuple items would be split by
/// the record separator.
fn check_item_separators(record: &str, field: &Field, sep: &str) -> Result<(), SchemaError> {
	if field.role() != FieldRole::State || field.explicit_parser().is_some() {
		return Ok(());
	}
	let Some(ty) = field.ty() else {
		return Ok(());
	};
	match ty
		.item_separators()
		.into_iter()
		.find(|item_sep| item_sep.chars().any(|c| sep.contains(c)))
	{
		Some(item_sep) => Err(SchemaError::ItemSeparatorOverlap {
			record: record.to_string(),
			field: field.name().to_string(),
			item_sep: item_sep.to_string(),
			sep: sep.to_string(),
		}),
		None => Ok(()),
	}
}

fn build_slot(record: &str, field: Field, parsers: &ParserRegistry) -> Result<Slot, SchemaError> {
	let Some(ty) = field.ty().cloned() else {
		if field.default_value().is_none() {
			return Err(SchemaError::MissingDefault {
				record: record.to_string(),
				field: field.name().to_string(),
			});
		}
		let default = field.default_value().cloned();
		return Ok(Slot {
			field,
			parser: None,
			optional: false,
			default,
		});
	};

	let parser = match field.explicit_parser() {
		Some(parser) => parser.clone(),
		None => parsers.resolve(&ty).map_err(|source| SchemaError::Parser {
			record: record.to_string(),
			field: field.name().to_string(),
			source,
		})?,
	};
	let optional = ty.is_optional();

	let default = match field.default_value() {
		Some(value) if !(optional && value.is_none()) && !parser.owns(value) => {
			return Err(SchemaError::DefaultType {
				record: record.to_string(),
				field: field.name().to_string(),
				expected: ty.to_string(),
			});
		}
		Some(value) => Some(value.clone()),
		None if optional => Some(Value::None),
		None => None,
	};

	Ok(Slot {
		field,
		parser: Some(parser),
		optional,
		default,
	})
}

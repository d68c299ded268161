//! Parsers for structural shapes that delegate to member parsers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ParseContext;
use crate::error::ParseError;
use crate::parser::Parser;
use crate::value::{CollectionKind, Value};

/// Tries each member parser in declared order.
///
/// An optional union decodes the empty string to [`Value::None`] before any
/// member is consulted. Dumping picks the first member that
/// [owns](Parser::owns) the value.
#[derive(Debug)]
pub struct UnionParser {
	members: Vec<Arc<dyn Parser>>,
	optional: bool,
}

impl UnionParser {
	pub fn new(members: Vec<Arc<dyn Parser>>, optional: bool) -> Self {
		Self { members, optional }
	}

	pub fn is_optional(&self) -> bool {
		self.optional
	}
}

#[async_trait]
impl Parser for UnionParser {
	async fn loads(&self, ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		if self.optional && raw.is_empty() {
			return Ok(Value::None);
		}
		for member in &self.members {
			if let Ok(value) = member.loads(ctx, raw).await {
				return Ok(value);
			}
		}
		Err(ParseError::NoMatch {
			ty: format!("union of {} members", self.members.len()),
			raw: raw.to_string(),
		})
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		if self.optional && value.is_none() {
			return Ok(String::new());
		}
		match self.members.iter().find(|m| m.owns(value)) {
			Some(member) => member.dumps(value).await,
			None => Err(ParseError::Unowned {
				parser: "UnionParser",
				got: value.kind_name(),
			}),
		}
	}

	fn owns(&self, value: &Value) -> bool {
		(self.optional && value.is_none()) || self.members.iter().any(|m| m.owns(value))
	}
}

/// Accepts exactly one of a fixed set of values.
///
/// Each allowed value carries the leaf parser for its kind, so mixed
/// literals such as `1 | "one"` work.
#[derive(Debug)]
pub struct LiteralParser {
	allowed: Vec<(Value, Arc<dyn Parser>)>,
}

impl LiteralParser {
	pub fn new(allowed: Vec<(Value, Arc<dyn Parser>)>) -> Self {
		Self { allowed }
	}
}

#[async_trait]
impl Parser for LiteralParser {
	async fn loads(&self, ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		for (expected, parser) in &self.allowed {
			if let Ok(value) = parser.loads(ctx, raw).await
				&& value == *expected
			{
				return Ok(value);
			}
		}
		Err(ParseError::NoMatch {
			ty: format!("{:?}", self.allowed.iter().map(|(v, _)| v).collect::<Vec<_>>()),
			raw: raw.to_string(),
		})
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		match self.allowed.iter().find(|(allowed, _)| allowed == value) {
			Some((_, parser)) => parser.dumps(value).await,
			None => Err(ParseError::Unowned {
				parser: "LiteralParser",
				got: value.kind_name(),
			}),
		}
	}

	fn owns(&self, value: &Value) -> bool {
		self.allowed.iter().any(|(allowed, _)| allowed == value)
	}
}

/// Homogeneous list or set joined by a separator.
///
/// The empty string is the empty collection. Otherwise every part is handed
/// to the inner parser, except whitespace-only parts which are skipped. Sets
/// keep the first occurrence of each item.
///
/// Dumping fails if an item's segment contains the separator or is
/// whitespace-only, or if a lone item dumps to the empty string.
#[derive(Debug)]
pub struct CollectionParser {
	kind: CollectionKind,
	inner: Arc<dyn Parser>,
	sep: Arc<str>,
}

impl CollectionParser {
	pub fn new(inner: Arc<dyn Parser>, sep: Arc<str>) -> Self {
		Self::with_kind(CollectionKind::List, inner, sep)
	}

	pub fn with_kind(kind: CollectionKind, inner: Arc<dyn Parser>, sep: Arc<str>) -> Self {
		Self { kind, inner, sep }
	}

	fn items<'v>(&self, value: &'v Value) -> Option<&'v [Value]> {
		match (self.kind, value) {
			(CollectionKind::List, Value::List(items))
			| (CollectionKind::Set, Value::Set(items)) => Some(items.as_slice()),
			_ => None,
		}
	}

	fn wrap(&self, items: Vec<Value>) -> Value {
		match self.kind {
			CollectionKind::List => Value::List(items),
			CollectionKind::Set => Value::Set(items),
		}
	}
}

#[async_trait]
impl Parser for CollectionParser {
	async fn loads(&self, ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		let mut items = Vec::new();
		if raw.is_empty() {
			return Ok(self.wrap(items));
		}
		for part in raw.split(&*self.sep) {
			if !part.is_empty() && part.trim().is_empty() {
				continue;
			}
			let item = self.inner.loads(ctx, part).await?;
			if self.kind == CollectionKind::Set && items.contains(&item) {
				continue;
			}
			items.push(item);
		}
		Ok(self.wrap(items))
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		let Some(items) = self.items(value) else {
			return Err(ParseError::Unowned {
				parser: "CollectionParser",
				got: value.kind_name(),
			});
		};
		if self.kind == CollectionKind::Set
			&& let Some(dup) = first_duplicate(items)
		{
			return Err(ParseError::DuplicateItem(format!("{dup:?}")));
		}

		let parts = dump_items(&self.sep, items.iter().map(|item| (&self.inner, item))).await?;
		if let Some(blank) = parts.iter().find(|p| !p.is_empty() && p.trim().is_empty()) {
			return Err(ParseError::BlankItem(blank.clone()));
		}
		// A lone empty item would load back as the empty collection.
		if let [only] = parts.as_slice()
			&& only.is_empty()
		{
			return Err(ParseError::BlankItem(String::new()));
		}
		Ok(parts.join(&*self.sep))
	}

	fn owns(&self, value: &Value) -> bool {
		self.items(value).is_some_and(|items| {
			items.iter().all(|item| self.inner.owns(item))
				&& (self.kind == CollectionKind::List || first_duplicate(items).is_none())
		})
	}
}

fn first_duplicate(items: &[Value]) -> Option<&Value> {
	items
		.iter()
		.enumerate()
		.find(|&(i, item)| items[..i].contains(item))
		.map(|(_, item)| item)
}

/// Fixed-arity heterogeneous tuple joined by a separator.
#[derive(Debug)]
pub struct TupleParser {
	items: Vec<Arc<dyn Parser>>,
	sep: Arc<str>,
}

impl TupleParser {
	pub fn new(items: Vec<Arc<dyn Parser>>, sep: Arc<str>) -> Self {
		Self { items, sep }
	}

	fn check_arity(&self, got: usize) -> Result<(), ParseError> {
		if got != self.items.len() {
			return Err(ParseError::Arity {
				expected: self.items.len(),
				got,
			});
		}
		Ok(())
	}
}

#[async_trait]
impl Parser for TupleParser {
	async fn loads(&self, ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		let parts: Vec<&str> = raw.split(&*self.sep).collect();
		self.check_arity(parts.len())?;

		let mut values = Vec::with_capacity(parts.len());
		for (parser, part) in self.items.iter().zip(parts) {
			values.push(parser.loads(ctx, part).await?);
		}
		Ok(Value::Tuple(values))
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		let Value::Tuple(values) = value else {
			return Err(ParseError::Unowned {
				parser: "TupleParser",
				got: value.kind_name(),
			});
		};
		self.check_arity(values.len())?;
		let parts = dump_items(&self.sep, self.items.iter().zip(values)).await?;
		Ok(parts.join(&*self.sep))
	}

	fn owns(&self, value: &Value) -> bool {
		match value {
			Value::Tuple(values) => {
				values.len() == self.items.len()
					&& self.items.iter().zip(values).all(|(p, v)| p.owns(v))
			}
			_ => false,
		}
	}
}

async fn dump_items<'v>(
	sep: &str,
	items: impl Iterator<Item = (&'v Arc<dyn Parser>, &'v Value)> + Send,
) -> Result<Vec<String>, ParseError> {
	let mut parts = Vec::new();
	for (parser, value) in items {
		let part = parser.dumps(value).await?;
		if part.contains(sep) {
			return Err(ParseError::ContainsSeparator {
				item: part,
				sep: sep.to_string(),
			});
		}
		parts.push(part);
	}
	Ok(parts)
}

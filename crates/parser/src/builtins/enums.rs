use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ParseContext;
use crate::error::ParseError;
use crate::parser::Parser;
use crate::value::{EnumDesc, EnumKind, FlagsValue, Value};

/// Enumerations and flags, stored by member value rather than by name.
///
/// Values are usually shorter than names. The member values are read and
/// written with the leaf parser of the enumeration's primitive type.
#[derive(Debug)]
pub struct EnumParser {
	desc: Arc<EnumDesc>,
	value_parser: Arc<dyn Parser>,
}

impl EnumParser {
	pub fn new(desc: Arc<EnumDesc>, value_parser: Arc<dyn Parser>) -> Self {
		Self { desc, value_parser }
	}

	/// Flags of this enumeration that set no bit outside its members.
	fn owns_flags(&self, flags: &FlagsValue) -> bool {
		flags.is_of(&self.desc) && flags.bits & !self.desc.all_bits() == 0
	}

	fn no_match(&self, raw: &str) -> ParseError {
		ParseError::NoMatch {
			ty: self.desc.name().to_string(),
			raw: raw.to_string(),
		}
	}
}

#[async_trait]
impl Parser for EnumParser {
	async fn loads(&self, ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		let primitive = self.value_parser.loads(ctx, raw).await?;
		match self.desc.kind() {
			EnumKind::Enum => self
				.desc
				.by_value(&primitive)
				.map(Value::Enum)
				.ok_or_else(|| self.no_match(raw)),
			EnumKind::Flag => {
				let bits = primitive
					.as_int()
					.and_then(|n| u64::try_from(n).ok())
					.ok_or_else(|| self.no_match(raw))?;
				// Unknown bits are rejected rather than silently kept.
				if bits & !self.desc.all_bits() != 0 {
					return Err(self.no_match(raw));
				}
				Ok(Value::Flags(self.desc.flags_from_bits(bits)))
			}
		}
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		match value {
			Value::Enum(member) if self.desc.owns_member(member) => {
				self.value_parser.dumps(&member.value).await
			}
			Value::Flags(flags) if self.owns_flags(flags) => {
				let bits = i64::try_from(flags.bits).map_err(|_| {
					ParseError::Custom(format!("flag bits out of range: {}", flags.bits))
				})?;
				self.value_parser.dumps(&Value::Int(bits)).await
			}
			other => Err(ParseError::Unowned {
				parser: "EnumParser",
				got: other.kind_name(),
			}),
		}
	}

	fn owns(&self, value: &Value) -> bool {
		match value {
			Value::Enum(member) => self.desc.owns_member(member),
			Value::Flags(flags) => self.owns_flags(flags),
			_ => false,
		}
	}
}

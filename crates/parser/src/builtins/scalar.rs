use async_trait::async_trait;

use crate::context::ParseContext;
use crate::error::{ConfigError, ParseError};
use crate::parser::Parser;
use crate::value::Value;

/// Parser for the absent value.
///
/// A strict parser only accepts the empty string; a lenient one maps any
/// input to [`Value::None`].
#[derive(Debug, Clone, Copy)]
pub struct NoneParser {
	pub strict: bool,
}

impl Default for NoneParser {
	fn default() -> Self {
		Self { strict: true }
	}
}

#[async_trait]
impl Parser for NoneParser {
	async fn loads(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		if raw.is_empty() || !self.strict {
			Ok(Value::None)
		} else {
			Err(ParseError::invalid("none", raw))
		}
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		if value.is_none() || !self.strict {
			Ok(String::new())
		} else {
			Err(ParseError::Unowned {
				parser: "NoneParser",
				got: value.kind_name(),
			})
		}
	}

	fn owns(&self, value: &Value) -> bool {
		value.is_none()
	}
}

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Integer parser with configurable sign and radix.
#[derive(Debug, Clone, Copy)]
pub struct IntParser {
	signed: bool,
	radix: u32,
}

impl Default for IntParser {
	fn default() -> Self {
		Self {
			signed: true,
			radix: 10,
		}
	}
}

impl IntParser {
	pub fn unsigned() -> Self {
		Self {
			signed: false,
			..Self::default()
		}
	}

	/// Larger radixes give shorter tokens for large ids.
	pub fn with_radix(signed: bool, radix: u32) -> Result<Self, ConfigError> {
		if !(2..=36).contains(&radix) {
			return Err(ConfigError::InvalidRadix(radix));
		}
		Ok(Self { signed, radix })
	}

	fn check_sign(&self, n: i64) -> Result<(), ParseError> {
		if !self.signed && n < 0 {
			return Err(ParseError::Negative(n.to_string()));
		}
		Ok(())
	}

	fn format(&self, n: i64) -> String {
		if self.radix == 10 {
			return n.to_string();
		}

		let mut v = n.unsigned_abs();
		let radix = u64::from(self.radix);
		let mut digits = Vec::new();
		loop {
			// `v % radix` < 36, so the index is in bounds.
			digits.push(DIGITS[(v % radix) as usize]);
			v /= radix;
			if v == 0 {
				break;
			}
		}
		if n < 0 {
			digits.push(b'-');
		}
		digits.reverse();
		String::from_utf8_lossy(&digits).into_owned()
	}
}

#[async_trait]
impl Parser for IntParser {
	async fn loads(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		let n = i64::from_str_radix(raw, self.radix).map_err(|_| ParseError::invalid("int", raw))?;
		self.check_sign(n)?;
		Ok(Value::Int(n))
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		let Value::Int(n) = value else {
			return Err(ParseError::Unowned {
				parser: "IntParser",
				got: value.kind_name(),
			});
		};
		self.check_sign(*n)?;
		Ok(self.format(*n))
	}

	fn owns(&self, value: &Value) -> bool {
		matches!(value, Value::Int(_))
	}
}

/// Float parser. Whole numbers are written without a trailing `.0`.
#[derive(Debug, Clone, Copy)]
pub struct FloatParser {
	pub signed: bool,
}

impl Default for FloatParser {
	fn default() -> Self {
		Self { signed: true }
	}
}

#[async_trait]
impl Parser for FloatParser {
	async fn loads(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		let f: f64 = raw.parse().map_err(|_| ParseError::invalid("float", raw))?;
		if !self.signed && f < 0.0 {
			return Err(ParseError::Negative(raw.to_string()));
		}
		Ok(Value::Float(f))
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		let Value::Float(f) = value else {
			return Err(ParseError::Unowned {
				parser: "FloatParser",
				got: value.kind_name(),
			});
		};
		if !self.signed && *f < 0.0 {
			return Err(ParseError::Negative(f.to_string()));
		}
		// `Display` for f64 is the shortest round-tripping form and never
		// prints a trailing `.0`.
		Ok(f.to_string())
	}

	fn owns(&self, value: &Value) -> bool {
		matches!(value, Value::Float(_))
	}
}

const DEFAULT_TRUES: &[&str] = &["true", "t", "yes", "y", "1"];
const DEFAULT_FALSES: &[&str] = &["false", "f", "no", "n", "0"];

/// Boolean parser. Loads are case-insensitive; dumps are `1` and `0`.
#[derive(Debug, Clone)]
pub struct BoolParser {
	trues: Vec<String>,
	falses: Vec<String>,
}

impl Default for BoolParser {
	fn default() -> Self {
		Self::new(DEFAULT_TRUES.iter().copied(), DEFAULT_FALSES.iter().copied())
	}
}

impl BoolParser {
	/// Custom spellings. `1` and `0` should stay accepted, since they are what
	/// [`dumps`](Parser::dumps) writes.
	pub fn new<'s>(
		trues: impl IntoIterator<Item = &'s str>,
		falses: impl IntoIterator<Item = &'s str>,
	) -> Self {
		Self {
			trues: trues.into_iter().map(str::to_lowercase).collect(),
			falses: falses.into_iter().map(str::to_lowercase).collect(),
		}
	}
}

#[async_trait]
impl Parser for BoolParser {
	async fn loads(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		let lowered = raw.to_lowercase();
		if self.trues.contains(&lowered) {
			Ok(Value::Bool(true))
		} else if self.falses.contains(&lowered) {
			Ok(Value::Bool(false))
		} else {
			Err(ParseError::invalid("bool", raw))
		}
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		match value {
			Value::Bool(true) => Ok("1".to_string()),
			Value::Bool(false) => Ok("0".to_string()),
			other => Err(ParseError::Unowned {
				parser: "BoolParser",
				got: other.kind_name(),
			}),
		}
	}

	fn owns(&self, value: &Value) -> bool {
		matches!(value, Value::Bool(_))
	}
}

/// Identity parser for strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringParser;

#[async_trait]
impl Parser for StringParser {
	async fn loads(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		Ok(Value::Str(raw.to_string()))
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		match value {
			Value::Str(s) => Ok(s.clone()),
			other => Err(ParseError::Unowned {
				parser: "StringParser",
				got: other.kind_name(),
			}),
		}
	}

	fn owns(&self, value: &Value) -> bool {
		matches!(value, Value::Str(_))
	}
}

use std::fmt;
use std::sync::Arc;

use compid_parser::{ConfigError, ParseError};
use compid_token::TokenError;
use thiserror::Error;

/// A record type declaration was rejected during finalization.
#[derive(Error, Debug, Clone)]
pub enum SchemaError {
	#[error("record `{record}`: duplicate field `{field}`")]
	DuplicateField { record: String, field: String },
	#[error("record `{record}`: internal field `{field}` requires a default")]
	MissingDefault { record: String, field: String },
	#[error("record `{record}`: field `{field}`: {source}")]
	Parser {
		record: String,
		field: String,
		#[source]
		source: ConfigError,
	},
	#[error("record `{record}`: default of field `{field}` is not a valid {expected}")]
	DefaultType {
		record: String,
		field: String,
		expected: String,
	},
	#[error("record `{record}`: field `{field}` item separator {item_sep:?} overlaps {sep:?}")]
	ItemSeparatorOverlap {
		record: String,
		field: String,
		item_sep: String,
		sep: String,
	},
	#[error(transparent)]
	Token(#[from] TokenError),
}

/// One field that failed to convert.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
	pub field: Arc<str>,
	/// The raw input, if there was one.
	pub raw: Option<String>,
	pub error: ParseError,
}

impl fmt::Display for FieldError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.raw {
			Some(raw) => write!(f, "`{}` ({raw:?}): {}", self.field, self.error),
			None => write!(f, "`{}`: {}", self.field, self.error),
		}
	}
}

/// Every field failure of one decode, in field order.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("could not convert `{record}`: {}", summarize(.errors))]
pub struct ConversionError {
	pub record: String,
	pub errors: Vec<FieldError>,
}

impl ConversionError {
	/// Names of the failing fields.
	pub fn fields(&self) -> impl Iterator<Item = &str> {
		self.errors.iter().map(|e| &*e.field)
	}
}

fn summarize(errors: &[FieldError]) -> String {
	errors
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join("; ")
}

/// Failure to construct, mutate or encode a record instance.
#[derive(Error, Debug, Clone)]
pub enum RecordError {
	#[error("record `{record}` has no field `{field}`")]
	UnknownField { record: String, field: String },
	#[error("record `{record}`: field `{field}` is required")]
	MissingField { record: String, field: String },
	#[error("record `{record}`: field `{field}` expects {expected}, got {got}")]
	TypeMismatch {
		record: String,
		field: String,
		expected: String,
		got: &'static str,
	},
	#[error("record `{record}`: could not dump field `{field}`: {source}")]
	Dump {
		record: String,
		field: String,
		#[source]
		source: ParseError,
	},
	#[error(transparent)]
	Token(#[from] TokenError),
	#[error("token is {len} characters long, the limit is {max}")]
	TooLong { len: usize, max: usize },
	#[error("record type `{0}` is not registered with this manager")]
	NotRegistered(String),
}

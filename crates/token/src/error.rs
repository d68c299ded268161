use thiserror::Error;

/// Failure to compile, encode or decode a token.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
	#[error("token name must not be empty")]
	EmptyName,
	#[error("separator must not be empty")]
	EmptySeparator,
	#[error("token name {name:?} contains a separator character of {sep:?}")]
	NameContainsSeparator { name: String, sep: String },
	#[error("duplicate field name `{0}`")]
	DuplicateField(String),
	#[error("invalid field name {0:?}")]
	InvalidFieldName(String),
	#[error("expected {expected} field values, got {got}")]
	FieldCount { expected: usize, got: usize },
	/// A dumped field would be indistinguishable from a field boundary.
	#[error("value {value:?} of field `{field}` contains a separator character of {sep:?}")]
	SeparatorInField {
		field: String,
		value: String,
		sep: String,
	},
	#[error("suffix {0:?} cannot be a separator character")]
	InvalidSuffix(char),
	/// The token was not produced by this spec. Usually not an error at all:
	/// it belongs to some other record type or system.
	#[error("token {token:?} does not match {pattern}")]
	Mismatch { token: String, pattern: String },
	#[error(transparent)]
	Pattern(#[from] regex::Error),
}

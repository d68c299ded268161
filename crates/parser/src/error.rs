use thiserror::Error;

use crate::value::TypeKey;

/// A segment did not satisfy a parser's expected shape.
///
/// These are recoverable: the record factory collects them per field and
/// reports them together.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
	/// The input could not be read as the expected kind.
	#[error("invalid {expected}: {raw:?}")]
	Invalid { expected: &'static str, raw: String },
	/// An unsigned parser received a negative number.
	#[error("unsigned value cannot be negative: {0}")]
	Negative(String),
	/// A tuple had the wrong number of parts.
	#[error("expected {expected} items, got {got}")]
	Arity { expected: usize, got: usize },
	/// No union member, literal or enum member matched the input.
	#[error("{raw:?} does not match any of {ty}")]
	NoMatch { ty: String, raw: String },
	/// A parser was asked to dump a value it does not own.
	#[error("{parser} cannot dump a value of type {got}")]
	Unowned { parser: &'static str, got: &'static str },
	/// A dumped item contains the separator it is about to be joined with.
	#[error("item {item:?} contains separator {sep:?}")]
	ContainsSeparator { item: String, sep: String },
	/// A collection item dumps to a segment that would not load back.
	#[error("item {0:?} dumps to a blank segment")]
	BlankItem(String),
	/// A set holds the same item twice.
	#[error("set contains duplicate item {0}")]
	DuplicateItem(String),
	/// No input was available for a field that requires one.
	#[error("no input provided")]
	Missing,
	#[error("{0}")]
	Custom(String),
}

impl ParseError {
	pub fn invalid(expected: &'static str, raw: &str) -> Self {
		Self::Invalid {
			expected,
			raw: raw.to_string(),
		}
	}
}

/// A type descriptor cannot be turned into a parser.
///
/// Raised while declaring record types; never at event time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
	#[error("no parser registered for type `{0}`")]
	NoParser(TypeKey),
	/// Collections and tuples cannot contain other collections or tuples.
	#[error("nested sequences are ambiguous: {0}")]
	NestedSequence(String),
	#[error("a union requires at least two members, got {0}")]
	UnionArity(usize),
	#[error("a literal type requires at least one value")]
	EmptyLiteral,
	#[error("a tuple type requires at least one item")]
	EmptyTuple,
	#[error("enum `{name}`: {reason}")]
	InvalidEnum { name: String, reason: &'static str },
	#[error("separator must not be empty")]
	EmptySeparator,
	#[error("radix must be within 2..=36, got {0}")]
	InvalidRadix(u32),
	#[error("unsupported type shape: {0}")]
	Unsupported(String),
}

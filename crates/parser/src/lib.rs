//! Type-driven parsers for component id fields.
//!
//! A [`Parser`] converts one field between its typed [`Value`] and the string
//! segment it occupies inside a token. Leaf types get their parser from a
//! [`ParserRegistry`]; composite shapes described by a [`TypeDesc`] (options,
//! unions, literals, enums, collections and tuples) are resolved
//! structurally into parsers that delegate to their members.
//!
//! # Round-trip law
//!
//! For any value `v` a parser owns, `loads(dumps(v))` yields `v` again.
//! [`DateTimeParser`] (resolution truncation) and [`TimeParser`]
//! (sub-microsecond precision) are lossy and say so.

pub mod builtins;
mod context;
mod error;
mod parser;
mod registry;
mod value;

pub use builtins::{
	BoolParser, CollectionParser, DEFAULT_ITEM_SEPARATOR, DateParser, DateTimeParser,
	DurationParser, EnumParser, FloatParser, FnParser, IntParser, LiteralParser, NoneParser,
	Resolution, StringParser, TimeParser, TimezoneParser, TupleParser, UnionParser,
};
pub use context::{Event, ParseContext};
pub use error::{ConfigError, ParseError};
pub use parser::Parser;
pub use registry::{DuplicatePolicy, ParserCtor, ParserRegistry};
pub use value::{
	CollectionKind, EnumDesc, EnumKind, EnumValue, FlagsValue, Opaque, TypeDesc, TypeKey, Value,
};

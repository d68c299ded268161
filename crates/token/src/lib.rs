//! Token codec for component ids.
//!
//! A [`TokenSpec`] is compiled once from a name, a separator and an ordered
//! list of field names. It encodes already dumped field strings into one
//! token and decodes a token back into raw segments; typed conversion is
//! left to the parsers.

mod error;
mod spec;

pub use error::TokenError;
pub use spec::{TokenSpec, split_name};

/// Separator used when a record type does not choose its own.
pub const DEFAULT_SEPARATOR: &str = "|";

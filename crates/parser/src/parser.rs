use std::fmt;

use async_trait::async_trait;

use crate::context::ParseContext;
use crate::error::ParseError;
use crate::value::Value;

/// Bidirectional converter between a [`Value`] and one token segment.
///
/// For every value `v` the parser owns, `loads(dumps(v))` must yield a value
/// equal to `v`, unless the parser documents itself as lossy.
#[async_trait]
pub trait Parser: Send + Sync + fmt::Debug {
	/// Reads a value from a raw segment.
	async fn loads(&self, ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError>;

	/// Writes a value back to its segment form.
	async fn dumps(&self, value: &Value) -> Result<String, ParseError>;

	/// Returns true if this parser is the one responsible for dumping `value`.
	///
	/// Unions use this to pick a member parser; it must not accept values of
	/// a different runtime kind even when they would convert losslessly.
	fn owns(&self, value: &Value) -> bool;
}

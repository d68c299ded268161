use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ParseContext;
use crate::error::ParseError;
use crate::parser::Parser;
use crate::value::Value;

type LoadsFn = dyn Fn(&ParseContext<'_>, &str) -> Result<Value, ParseError> + Send + Sync;
type DumpsFn = dyn Fn(&Value) -> Result<String, ParseError> + Send + Sync;
type OwnsFn = dyn Fn(&Value) -> bool + Send + Sync;

/// A parser assembled from plain closures.
///
/// Meant for simple custom leaf types where a dedicated type would be noise:
///
/// ```ignore
/// registry.register([TypeKey::named("hex")], || {
///     Arc::new(FnParser::new(
///         "hex",
///         |_, raw| i64::from_str_radix(raw, 16).map(Value::Int).map_err(|_| ParseError::invalid("hex", raw)),
///         |v| Ok(format!("{:x}", v.as_int().unwrap_or_default())),
///         |v| matches!(v, Value::Int(_)),
///     ))
/// });
/// ```
#[derive(Clone)]
pub struct FnParser {
	name: &'static str,
	loads: Arc<LoadsFn>,
	dumps: Arc<DumpsFn>,
	owns: Arc<OwnsFn>,
}

impl FnParser {
	pub fn new<L, D, O>(name: &'static str, loads: L, dumps: D, owns: O) -> Self
	where
		L: Fn(&ParseContext<'_>, &str) -> Result<Value, ParseError> + Send + Sync + 'static,
		D: Fn(&Value) -> Result<String, ParseError> + Send + Sync + 'static,
		O: Fn(&Value) -> bool + Send + Sync + 'static,
	{
		Self {
			name,
			loads: Arc::new(loads),
			dumps: Arc::new(dumps),
			owns: Arc::new(owns),
		}
	}

	/// A parser for [`Value::Opaque`] payloads tagged `type_name`.
	pub fn opaque<L, D>(type_name: &'static str, loads: L, dumps: D) -> Self
	where
		L: Fn(&ParseContext<'_>, &str) -> Result<Value, ParseError> + Send + Sync + 'static,
		D: Fn(&Value) -> Result<String, ParseError> + Send + Sync + 'static,
	{
		Self::new(type_name, loads, dumps, move |value| {
			matches!(value, Value::Opaque(o) if o.type_name() == type_name)
		})
	}

	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl fmt::Debug for FnParser {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("FnParser").field(&self.name).finish()
	}
}

#[async_trait]
impl Parser for FnParser {
	async fn loads(&self, ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		(self.loads)(ctx, raw)
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		(self.dumps)(value)
	}

	fn owns(&self, value: &Value) -> bool {
		(self.owns)(value)
	}
}

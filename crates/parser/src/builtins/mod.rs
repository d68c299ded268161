//! Builtin parsers.
//!
//! Leaf parsers are registered as defaults by [`register_builtins`];
//! composite parsers are constructed by [`ParserRegistry::resolve`].

mod composite;
mod enums;
mod func;
mod scalar;
mod time;

use std::sync::Arc;

pub use composite::{CollectionParser, LiteralParser, TupleParser, UnionParser};
pub use enums::EnumParser;
pub use func::FnParser;
pub use scalar::{BoolParser, FloatParser, IntParser, NoneParser, StringParser};
pub use time::{
	DateParser, DateTimeParser, DurationParser, Resolution, TimeParser, TimezoneParser,
};

use crate::registry::ParserRegistry;
use crate::value::TypeKey;

/// Separator used between collection and tuple items when none is declared.
pub const DEFAULT_ITEM_SEPARATOR: &str = ",";

/// Installs the builtin leaf parsers into `registry`.
pub fn register_builtins(registry: &ParserRegistry) {
	registry.register([TypeKey::None], || Arc::new(NoneParser::default()));
	registry.register([TypeKey::Bool], || Arc::new(BoolParser::default()));
	registry.register([TypeKey::Int], || Arc::new(IntParser::default()));
	registry.register([TypeKey::Float], || Arc::new(FloatParser::default()));
	registry.register([TypeKey::Str], || Arc::new(StringParser));
	registry.register([TypeKey::DateTime], || Arc::new(DateTimeParser::default()));
	registry.register([TypeKey::Date], || Arc::new(DateParser));
	registry.register([TypeKey::Time], || Arc::new(TimeParser));
	registry.register([TypeKey::Duration], || Arc::new(DurationParser));
	registry.register([TypeKey::Timezone], || Arc::new(TimezoneParser));
}

/// Formats a count of microseconds as a decimal number of seconds.
///
/// Trailing fractional zeros are dropped, so whole seconds have no point.
pub(crate) fn format_micros(micros: i64) -> String {
	let sign = if micros < 0 { "-" } else { "" };
	let abs = micros.unsigned_abs();
	let (secs, frac) = (abs / 1_000_000, abs % 1_000_000);
	if frac == 0 {
		return format!("{sign}{secs}");
	}
	let frac = format!("{frac:06}");
	format!("{sign}{secs}.{}", frac.trim_end_matches('0'))
}

/// Inverse of [`format_micros`]. Accepts at most six fractional digits.
pub(crate) fn parse_micros(raw: &str) -> Option<i64> {
	let (negative, body) = match raw.strip_prefix('-') {
		Some(rest) => (true, rest),
		None => (false, raw),
	};
	let (int, frac) = body.split_once('.').unwrap_or((body, ""));
	if int.is_empty() || !int.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	if frac.len() > 6 || !frac.bytes().all(|b| b.is_ascii_digit()) || body.ends_with('.') {
		return None;
	}

	let secs: i64 = int.parse().ok()?;
	let frac: i64 = if frac.is_empty() {
		0
	} else {
		format!("{frac:0<6}").parse().ok()?
	};
	let micros = secs.checked_mul(1_000_000)?.checked_add(frac)?;
	Some(if negative { -micros } else { micros })
}

use async_trait::async_trait;
use chrono::{
	DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta, Timelike, Utc,
};

use super::{format_micros, parse_micros};
use crate::context::ParseContext;
use crate::error::ParseError;
use crate::parser::Parser;
use crate::value::Value;

/// Granularity with which timestamps are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Resolution {
	Micros,
	#[default]
	Seconds,
	Minutes,
	Hours,
	Days,
}

impl Resolution {
	/// Step in seconds, or `None` for sub-second resolution.
	fn step_secs(self) -> Option<i64> {
		match self {
			Self::Micros => None,
			Self::Seconds => Some(1),
			Self::Minutes => Some(60),
			Self::Hours => Some(60 * 60),
			Self::Days => Some(24 * 60 * 60),
		}
	}
}

/// Timestamps as (possibly fractional) unix seconds.
///
/// Loaded timestamps carry the parser's `timezone`, and only timestamps with
/// that offset are dumped. Lossy: dumping truncates towards the past to the
/// configured resolution.
#[derive(Debug, Clone, Copy)]
pub struct DateTimeParser {
	pub resolution: Resolution,
	pub timezone: FixedOffset,
}

impl DateTimeParser {
	pub fn new(resolution: Resolution) -> Self {
		Self {
			resolution,
			timezone: Utc.fix(),
		}
	}

	pub fn with_timezone(mut self, timezone: FixedOffset) -> Self {
		self.timezone = timezone;
		self
	}
}

impl Default for DateTimeParser {
	fn default() -> Self {
		Self::new(Resolution::default())
	}
}

#[async_trait]
impl Parser for DateTimeParser {
	async fn loads(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		parse_micros(raw)
			.and_then(DateTime::from_timestamp_micros)
			.map(|dt| Value::DateTime(dt.with_timezone(&self.timezone)))
			.ok_or_else(|| ParseError::invalid("timestamp", raw))
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		let Value::DateTime(dt) = value else {
			return Err(ParseError::Unowned {
				parser: "DateTimeParser",
				got: value.kind_name(),
			});
		};
		if *dt.offset() != self.timezone {
			return Err(ParseError::Custom(format!(
				"timestamp offset {} does not match {}",
				dt.offset(),
				self.timezone
			)));
		}
		Ok(match self.resolution.step_secs() {
			None => format_micros(dt.timestamp_micros()),
			Some(step) => (dt.timestamp().div_euclid(step) * step).to_string(),
		})
	}

	fn owns(&self, value: &Value) -> bool {
		matches!(value, Value::DateTime(dt) if *dt.offset() == self.timezone)
	}
}

/// Fixed UTC offsets as whole seconds east of UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimezoneParser;

#[async_trait]
impl Parser for TimezoneParser {
	async fn loads(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		raw.parse::<i32>()
			.ok()
			.and_then(FixedOffset::east_opt)
			.map(Value::Timezone)
			.ok_or_else(|| ParseError::invalid("utc offset", raw))
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		match value {
			Value::Timezone(offset) => Ok(offset.local_minus_utc().to_string()),
			other => Err(ParseError::Unowned {
				parser: "TimezoneParser",
				got: other.kind_name(),
			}),
		}
	}

	fn owns(&self, value: &Value) -> bool {
		matches!(value, Value::Timezone(_))
	}
}

/// Dates as proleptic Gregorian ordinals; `0001-01-01` is day 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateParser;

#[async_trait]
impl Parser for DateParser {
	async fn loads(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		raw.parse::<i32>()
			.ok()
			.and_then(NaiveDate::from_num_days_from_ce_opt)
			.map(Value::Date)
			.ok_or_else(|| ParseError::invalid("date ordinal", raw))
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		match value {
			Value::Date(date) => Ok(date.num_days_from_ce().to_string()),
			other => Err(ParseError::Unowned {
				parser: "DateParser",
				got: other.kind_name(),
			}),
		}
	}

	fn owns(&self, value: &Value) -> bool {
		matches!(value, Value::Date(_))
	}
}

/// Wall-clock times in ISO 8601 form. Sub-microsecond precision is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeParser;

#[async_trait]
impl Parser for TimeParser {
	async fn loads(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		raw.parse::<NaiveTime>()
			.map(Value::Time)
			.map_err(|_| ParseError::invalid("time", raw))
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		let Value::Time(time) = value else {
			return Err(ParseError::Unowned {
				parser: "TimeParser",
				got: value.kind_name(),
			});
		};
		let fmt = if time.nanosecond() / 1_000 == 0 {
			"%H:%M:%S"
		} else {
			"%H:%M:%S%.6f"
		};
		Ok(time.format(fmt).to_string())
	}

	fn owns(&self, value: &Value) -> bool {
		matches!(value, Value::Time(_))
	}
}

/// Durations as a decimal number of seconds with microsecond precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationParser;

#[async_trait]
impl Parser for DurationParser {
	async fn loads(&self, _ctx: &ParseContext<'_>, raw: &str) -> Result<Value, ParseError> {
		parse_micros(raw)
			.map(|micros| Value::Duration(TimeDelta::microseconds(micros)))
			.ok_or_else(|| ParseError::invalid("duration", raw))
	}

	async fn dumps(&self, value: &Value) -> Result<String, ParseError> {
		let Value::Duration(delta) = value else {
			return Err(ParseError::Unowned {
				parser: "DurationParser",
				got: value.kind_name(),
			});
		};
		delta
			.num_microseconds()
			.map(format_micros)
			.ok_or_else(|| ParseError::Custom(format!("duration out of range: {delta}")))
	}

	fn owns(&self, value: &Value) -> bool {
		matches!(value, Value::Duration(_))
	}
}

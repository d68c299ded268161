use std::any::Any;
use std::sync::Arc;

use compid_parser::{Event, FnParser, ParseError, ParserRegistry, TypeDesc, Value};
use pretty_assertions::assert_eq;

use crate::{ConversionError, Field, FieldError, RecordType};

struct Select {
	token: String,
	values: Option<String>,
}

impl Event for Select {
	fn token(&self) -> &str {
		&self.token
	}

	fn input(&self, name: &str) -> Option<&str> {
		(name == "choice").then_some(self.values.as_deref()).flatten()
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

fn pair() -> Arc<RecordType> {
	RecordType::builder("pair")
		.field(Field::state("label", TypeDesc::STR))
		.field(Field::state("count", TypeDesc::INT))
		.finalize(&ParserRegistry::with_builtins())
		.unwrap()
}

#[tokio::test]
async fn test_loads_in_order() {
	let values = pair().factory().loads(None, &["abc", "3"]).await.unwrap();
	assert_eq!(values, vec![Value::from("abc"), Value::Int(3)]);
}

#[tokio::test]
async fn test_failure_names_only_failing_field() {
	let err = pair()
		.factory()
		.loads(None, &["abc", "not-a-number"])
		.await
		.unwrap_err();
	assert_eq!(
		err,
		ConversionError {
			record: "pair".into(),
			errors: vec![FieldError {
				field: Arc::from("count"),
				raw: Some("not-a-number".into()),
				error: ParseError::invalid("int", "not-a-number"),
			}],
		}
	);
	assert_eq!(err.fields().collect::<Vec<_>>(), vec!["count"]);
}

#[tokio::test]
async fn test_every_failure_is_collected() {
	let ty = RecordType::builder("three")
		.field(Field::state("a", TypeDesc::INT))
		.field(Field::state("b", TypeDesc::STR))
		.field(Field::state("c", TypeDesc::BOOL))
		.finalize(&ParserRegistry::with_builtins())
		.unwrap();
	let err = ty.factory().loads(None, &["x", "ok", "maybe"]).await.unwrap_err();
	assert_eq!(err.fields().collect::<Vec<_>>(), vec!["a", "c"]);
	assert!(err.to_string().contains("`a`"));
}

#[tokio::test]
async fn test_segment_count_mismatch() {
	let err = pair().factory().loads(None, &["only"]).await.unwrap_err();
	assert_eq!(
		err.errors[0].error,
		ParseError::Arity {
			expected: 2,
			got: 1
		}
	);
}

#[tokio::test]
async fn test_optional_empty_skips_parser() {
	let strict_int = FnParser::new(
		"never",
		|_, raw| Err(ParseError::invalid("never", raw)),
		|_| Err(ParseError::Custom("never".into())),
		|v| matches!(v, Value::Int(_)),
	);
	let ty = RecordType::builder("opt")
		.field(Field::state("n", TypeDesc::optional(TypeDesc::INT)).parser(Arc::new(strict_int)))
		.finalize(&ParserRegistry::with_builtins())
		.unwrap();
	assert_eq!(ty.factory().loads(None, &[""]).await.unwrap(), vec![Value::None]);
	assert_eq!(ty.factory().dumps(&[Value::None]).await.unwrap(), vec![String::new()]);
}

#[tokio::test]
async fn test_later_fields_see_earlier_values() {
	let relative = FnParser::new(
		"relative",
		|ctx, raw| {
			let base = ctx.previous("base").and_then(Value::as_int).ok_or(ParseError::Missing)?;
			let offset: i64 = raw.parse().map_err(|_| ParseError::invalid("int", raw))?;
			Ok(Value::Int(base + offset))
		},
		|v| Ok(v.as_int().unwrap_or_default().to_string()),
		|v| matches!(v, Value::Int(_)),
	);
	let ty = RecordType::builder("rel")
		.field(Field::state("base", TypeDesc::INT))
		.field(Field::state("value", TypeDesc::INT).parser(Arc::new(relative)))
		.finalize(&ParserRegistry::with_builtins())
		.unwrap();
	let values = ty.factory().loads(None, &["10", "5"]).await.unwrap();
	assert_eq!(values, vec![Value::Int(10), Value::Int(15)]);
}

#[tokio::test]
async fn test_event_and_internal_fields() {
	let ty = RecordType::builder("menu")
		.field(Field::state("page", TypeDesc::INT))
		.field(Field::event("choice", TypeDesc::list(TypeDesc::STR)))
		.field(Field::internal("clicks", 0i64))
		.finalize(&ParserRegistry::with_builtins())
		.unwrap();
	assert_eq!(ty.factory().state_count(), 1);

	let event = Select {
		token: "menu|2".into(),
		values: Some("a,b".into()),
	};
	let values = ty.factory().loads(Some(&event), &["2"]).await.unwrap();
	assert_eq!(
		values,
		vec![
			Value::Int(2),
			Value::from(vec!["a", "b"]),
			Value::Int(0),
		]
	);

	// Only state fields are dumped.
	assert_eq!(ty.factory().dumps(&values).await.unwrap(), vec!["2".to_string()]);
}

#[tokio::test]
async fn test_event_field_without_input() {
	let ty = RecordType::builder("menu")
		.field(Field::event("choice", TypeDesc::STR))
		.field(Field::event("other", TypeDesc::STR).default("fallback"))
		.finalize(&ParserRegistry::with_builtins())
		.unwrap();
	let event = Select {
		token: "menu".into(),
		values: None,
	};
	let err = ty.factory().loads(Some(&event), &[]).await.unwrap_err();
	assert_eq!(err.errors.len(), 1);
	assert_eq!(&*err.errors[0].field, "choice");
	assert_eq!(err.errors[0].error, ParseError::Missing);
}

#[tokio::test]
async fn test_dump_failure_names_field() {
	let ty = RecordType::builder("u")
		.field(
			Field::state("n", TypeDesc::INT)
				.parser(Arc::new(compid_parser::IntParser::unsigned())),
		)
		.finalize(&ParserRegistry::with_builtins())
		.unwrap();
	let err = ty.factory().dumps(&[Value::Int(-1)]).await.unwrap_err();
	assert!(err.to_string().contains("`n`"));
}

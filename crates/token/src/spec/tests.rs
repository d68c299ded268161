use proptest::prelude::*;

use super::*;

#[test]
fn test_template_and_pattern() {
	let spec = TokenSpec::compile("vote", "|", ["choice", "round"]).unwrap();
	assert_eq!(spec.template(), "vote|{choice}|{round}");
	assert_eq!(spec.to_string(), spec.template());
	assert_eq!(spec.field_count(), 2);
	assert!(spec.matches("vote|a|1"));
	assert!(!spec.matches("vote|a|1|x"));
	assert!(!spec.matches("xvote|a|1"));
}

#[test]
fn test_encode_decode() {
	let spec = TokenSpec::compile("vote", "|", ["choice", "round"]).unwrap();
	let token = spec.encode(&["yes", "3"]).unwrap();
	assert_eq!(token, "vote|yes|3");
	assert_eq!(spec.decode(&token).unwrap(), vec!["yes", "3"]);
}

#[test]
fn test_empty_segments_survive() {
	let spec = TokenSpec::compile("t", "|", ["a", "b", "c"]).unwrap();
	let token = spec.encode(&["", "", ""]).unwrap();
	assert_eq!(token, "t|||");
	assert_eq!(spec.decode(&token).unwrap(), vec!["", "", ""]);
}

#[test]
fn test_no_fields_is_bare_name() {
	let spec = TokenSpec::compile("ping", "|", Vec::<String>::new()).unwrap();
	assert_eq!(spec.template(), "ping");
	assert_eq!(spec.encode::<&str>(&[]).unwrap(), "ping");
	assert!(spec.decode("ping").unwrap().is_empty());
	assert!(spec.decode("ping|").is_err());
}

#[test]
fn test_field_count_mismatch() {
	let spec = TokenSpec::compile("t", "|", ["a", "b"]).unwrap();
	assert_eq!(
		spec.encode(&["1"]).unwrap_err(),
		TokenError::FieldCount { expected: 2, got: 1 }
	);
	assert!(matches!(
		spec.decode("t|1"),
		Err(TokenError::Mismatch { .. })
	));
}

#[test]
fn test_separator_in_field_is_refused() {
	let spec = TokenSpec::compile("t", "|", ["a"]).unwrap();
	assert!(matches!(
		spec.encode(&["x|y"]),
		Err(TokenError::SeparatorInField { .. })
	));
}

#[test]
fn test_multi_char_separator() {
	let spec = TokenSpec::compile("t", "::", ["a", "b"]).unwrap();
	let token = spec.encode(&["1", "2"]).unwrap();
	assert_eq!(token, "t::1::2");
	assert_eq!(spec.decode(&token).unwrap(), vec!["1", "2"]);
	// Any separator character is reserved, not just the whole separator.
	assert!(spec.encode(&["a:b", "2"]).is_err());
	assert!(spec.decode("t::a:b::2").is_err());
}

#[test]
fn test_regex_metacharacters_are_literal() {
	let spec = TokenSpec::compile("a.b", "+", ["x"]).unwrap();
	assert_eq!(spec.decode("a.b+1").unwrap(), vec!["1"]);
	assert!(spec.decode("axb+1").is_err());

	let spec = TokenSpec::compile("n", "^]", ["x", "y"]).unwrap();
	assert_eq!(spec.decode("n^]a^]b").unwrap(), vec!["a", "b"]);
}

#[test]
fn test_suffix() {
	let spec = TokenSpec::compile("t", "|", ["a"]).unwrap();
	assert_eq!(spec.encode_with_suffix(&["1"], Some('!')).unwrap(), "t!|1");
	assert_eq!(
		spec.encode_with_suffix(&["1"], Some('|')).unwrap_err(),
		TokenError::InvalidSuffix('|')
	);
	// Suffixed tokens do not match until the suffix is stripped.
	assert!(!spec.matches("t!|1"));
}

#[test]
fn test_compile_validation() {
	assert_eq!(
		TokenSpec::compile("", "|", ["a"]).unwrap_err(),
		TokenError::EmptyName
	);
	assert_eq!(
		TokenSpec::compile("t", "", ["a"]).unwrap_err(),
		TokenError::EmptySeparator
	);
	assert!(matches!(
		TokenSpec::compile("a|b", "|", ["a"]),
		Err(TokenError::NameContainsSeparator { .. })
	));
	assert_eq!(
		TokenSpec::compile("t", "|", ["a", "a"]).unwrap_err(),
		TokenError::DuplicateField("a".into())
	);
	assert_eq!(
		TokenSpec::compile("t", "|", [""]).unwrap_err(),
		TokenError::InvalidFieldName(String::new())
	);
}

#[test]
fn test_renamed() {
	let spec = TokenSpec::compile("t", "|", ["a"]).unwrap();
	let renamed = spec.renamed("u").unwrap();
	assert_eq!(renamed.template(), "u|{a}");
	assert_eq!(renamed.decode("u|1").unwrap(), vec!["1"]);
	assert!(renamed.decode("t|1").is_err());
	assert_ne!(spec, renamed);
}

#[test]
fn test_split_name() {
	assert_eq!(split_name("t!|1|2", "|"), ("t!", Some("1|2")));
	assert_eq!(split_name("ping", "|"), ("ping", None));
}

fn segment() -> impl Strategy<Value = String> {
	"[^|]{0,6}"
}

proptest! {
	#[test]
	fn prop_decode_inverts_encode(values in prop::collection::vec(segment(), 0..6)) {
		let names: Vec<String> = (0..values.len()).map(|i| format!("f{i}")).collect();
		let spec = TokenSpec::compile("rec", "|", names).unwrap();
		let token = spec.encode(&values).unwrap();
		let decoded: Vec<String> =
			spec.decode(&token).unwrap().into_iter().map(String::from).collect();
		prop_assert_eq!(decoded, values);
	}

	#[test]
	fn prop_decode_only_accepts_encoded(token in "rec(\\|[a|]{0,3}){0,4}") {
		let spec = TokenSpec::compile("rec", "|", ["a", "b"]).unwrap();
		if let Ok(segments) = spec.decode(&token) {
			prop_assert_eq!(spec.encode(&segments).unwrap(), token);
		}
	}
}

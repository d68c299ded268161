use compid_parser::{TypeDesc, Value};
use compid_record::Field;
use pretty_assertions::assert_eq;

use super::*;
use crate::namespace::Namespace;

fn namespace(alphabet: &str) -> Namespace {
	Namespace::new(ManagerConfig {
		counter_alphabet: Some(alphabet.to_string()),
		..ManagerConfig::default()
	})
	.unwrap()
}

fn button(manager: &Manager, name: &str) -> Arc<RecordType> {
	manager
		.declare(
			manager
				.record_type(name)
				.field(Field::state("n", TypeDesc::INT))
				.field(Field::state("label", TypeDesc::optional(TypeDesc::STR))),
		)
		.unwrap()
}

#[tokio::test]
async fn test_dumps_appends_counter() {
	let ns = namespace("!?");
	let menus = ns.manager("menus");
	let ty = button(&menus, "btn");

	let record = ty.instance().set("n", 3i64).build().unwrap();
	assert_eq!(record.manager().unwrap().issuer_name(), "menus");
	assert_eq!(record.dumps().await.unwrap(), "btn!|3|");
	assert_eq!(menus.dumps(&record).await.unwrap(), "btn?|3|");
	// Wraps around.
	assert_eq!(record.dumps().await.unwrap(), "btn!|3|");
}

#[tokio::test]
async fn test_dumps_without_counter() {
	let ns = Namespace::new(ManagerConfig {
		count: false,
		..ManagerConfig::default()
	})
	.unwrap();
	let ty = button(&ns.root(), "btn");
	let record = ty.instance().set("n", 1i64).set("label", "ok").build().unwrap();
	assert_eq!(record.dumps().await.unwrap(), "btn|1|ok");
	assert_eq!(record.dumps().await.unwrap(), "btn|1|ok");
}

#[tokio::test]
async fn test_dumps_rejects_long_tokens() {
	let ns = Namespace::new(ManagerConfig {
		max_token_len: 10,
		..ManagerConfig::default()
	})
	.unwrap();
	let ty = button(&ns.root(), "btn");
	let record = ty
		.instance()
		.set("n", 1i64)
		.set("label", "far too long")
		.build()
		.unwrap();
	assert!(matches!(
		record.dumps().await,
		Err(RecordError::TooLong { max: 10, .. })
	));
}

#[test]
fn test_resolve_with_and_without_counter() {
	let ns = namespace("!?");
	let ty = button(&ns.manager("menus"), "btn");

	for token in ["btn|3|", "btn!|3|", "btn?|3|x"] {
		let resolved = ns.root().resolve(token).unwrap();
		assert_eq!(&*resolved.identifier, "btn");
		assert!(Arc::ptr_eq(&resolved.record_type, &ty));
		assert_eq!(resolved.owner, Some(ns.manager("menus")));
		assert!(resolved.live);
	}
	assert_eq!(ns.root().resolve("btn?|3|x").unwrap().fields, vec!["3", "x"]);

	assert!(ns.root().resolve("btn").is_none());
	assert!(ns.root().resolve("btn|3").is_none());
	assert!(ns.root().resolve("btn#|3|").is_none());
	assert!(ns.root().resolve("other|3|").is_none());
	assert!(ns.root().resolve("").is_none());
}

#[test]
fn test_visibility_follows_ancestry() {
	let ns = Namespace::default();
	let ty = button(&ns.manager("a.b"), "btn");

	assert!(ns.manager("a.b").is_registered(&ty));
	assert!(ns.manager("a").is_registered(&ty));
	assert!(ns.root().is_registered(&ty));
	assert!(!ns.manager("a.c").is_registered(&ty));
	assert!(!ns.manager("a.b.c").is_registered(&ty));
	assert!(ns.manager("a.c").resolve("btn|1|").is_none());

	let other = button(&ns.manager("z"), "zed");
	let visible: Vec<_> = ns
		.root()
		.record_types()
		.into_iter()
		.map(|(id, _)| id.to_string())
		.collect();
	assert_eq!(visible, vec!["btn", "zed"]);
	assert_eq!(ns.manager("z").record_types().len(), 1);
	assert!(Arc::ptr_eq(&ns.manager("z").record_types()[0].1, &other));
}

#[test]
fn test_duplicate_identifier() {
	let ns = Namespace::default();
	let ty = button(&ns.manager("a"), "btn");
	ns.manager("a").register(&ty).unwrap();

	let err = ns
		.manager("b")
		.declare(ns.manager("b").record_type("btn"))
		.unwrap_err();
	assert!(matches!(
		err,
		RegistryError::DuplicateIdentifier { identifier } if identifier == "btn"
	));

	let err = ns.root().declare(ns.root().record_type("btn")).unwrap_err();
	assert!(matches!(err, RegistryError::DuplicateIdentifier { .. }));
}

#[test]
fn test_counter_ambiguity() {
	let ns = namespace("!?");
	button(&ns.manager("a"), "btn");

	let err = ns
		.manager("b")
		.declare(ns.manager("b").record_type("btn!"))
		.unwrap_err();
	assert!(matches!(
		err,
		RegistryError::AmbiguousIdentifier { identifier, existing }
			if identifier == "btn!" && existing == "btn"
	));

	let b = ns.manager("b");
	b.declare(b.record_type("bt")).unwrap();
	let err = b.declare(b.record_type("bt?")).unwrap_err();
	assert!(matches!(err, RegistryError::AmbiguousIdentifier { .. }));

	// Not a counter character.
	ns.root().declare(ns.root().record_type("btn#")).unwrap();
}

#[test]
fn test_no_ambiguity_without_counting() {
	let ns = Namespace::new(ManagerConfig {
		count: false,
		..ManagerConfig::default()
	})
	.unwrap();
	button(&ns.root(), "btn");
	button(&ns.root(), "btn!");
	assert_eq!(&*ns.root().resolve("btn!|1|").unwrap().identifier, "btn!");
}

#[test]
fn test_single_owner() {
	let ns = Namespace::default();
	let ty = button(&ns.manager("a"), "btn");

	let err = ns.manager("b").register(&ty).unwrap_err();
	assert!(matches!(
		err,
		RegistryError::AlreadyOwned { record, owner } if record == "btn" && owner == "a"
	));
}

#[test]
fn test_separator_must_match() {
	let ns = Namespace::default();
	let ty = RecordType::builder("btn")
		.separator(":")
		.finalize(ns.parsers())
		.unwrap();
	assert!(matches!(
		ns.root().register(&ty),
		Err(RegistryError::SeparatorMismatch { .. })
	));
}

#[tokio::test]
async fn test_register_as_renames_token() {
	let ns = Namespace::new(ManagerConfig {
		count: false,
		..ManagerConfig::default()
	})
	.unwrap();
	let ty = RecordType::builder("a_long_descriptive_name")
		.field(Field::state("n", TypeDesc::INT))
		.finalize(ns.parsers())
		.unwrap();
	ns.root().register_as(&ty, "x").unwrap();

	let record = ty.instance().set("n", 2i64).build().unwrap();
	assert_eq!(record.dumps().await.unwrap(), "x|2");
	let resolved = ns.root().resolve("x|2").unwrap();
	assert!(Arc::ptr_eq(&resolved.record_type, &ty));
	assert!(ns.root().resolve("a_long_descriptive_name|2").is_none());

	assert!(matches!(
		ns.root().register_as(&ty, "a|b"),
		Err(RegistryError::Token(_))
	));
}

#[tokio::test]
async fn test_deregister() {
	let ns = Namespace::new(ManagerConfig {
		count: false,
		..ManagerConfig::default()
	})
	.unwrap();
	let ty = button(&ns.manager("a.b"), "btn");
	let record = ty.instance().set("n", 1i64).build().unwrap();

	ns.manager("a.b").deregister(&ty);
	assert!(!ns.root().is_registered(&ty));
	assert!(ty.owner().is_none());
	assert!(ns.root().resolve("btn|1|").is_none());
	// Unregistered types encode with their own spec.
	assert_eq!(record.dumps().await.unwrap(), "btn|1|");
	assert!(matches!(
		ns.root().dumps(&record).await,
		Err(RecordError::NotRegistered(_))
	));

	// Free to register elsewhere now.
	ns.manager("c").register(&ty).unwrap();
	assert_eq!(record.manager().unwrap().issuer_name(), "c");
}

#[test]
fn test_stale_registration_is_superseded() {
	let ns = Namespace::default();
	let ctx = ns.declare_context("ext");
	let old = ns
		.manager("ext")
		.declare(ns.manager("ext").record_type("btn").context(ctx))
		.unwrap();

	ns.unload_context("ext");
	let resolved = ns.root().resolve("btn").unwrap();
	assert!(!resolved.live);

	let ctx = ns.declare_context("ext");
	let new = ns
		.manager("ext.v2")
		.declare(ns.manager("ext.v2").record_type("btn").context(ctx))
		.unwrap();

	assert!(old.owner().is_none());
	assert!(!ns.manager("ext").is_registered(&old));
	let resolved = ns.root().resolve("btn").unwrap();
	assert!(Arc::ptr_eq(&resolved.record_type, &new));
	assert!(resolved.live);
}

#[test]
fn test_record_type_builder_uses_separator() {
	let ns = Namespace::new(ManagerConfig {
		separator: "::".to_string(),
		..ManagerConfig::default()
	})
	.unwrap();
	let ty = ns
		.root()
		.declare(ns.root().record_type("btn").field(Field::state("n", TypeDesc::INT)))
		.unwrap();
	assert_eq!(ty.separator(), "::");
	let resolved = ns.root().resolve("btn!::4").unwrap();
	assert_eq!(resolved.fields, vec!["4"]);
	assert_eq!(ty.field("n").and_then(Field::default_value), None::<&Value>);
}

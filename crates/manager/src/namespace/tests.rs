use super::*;

#[test]
fn test_root_aliases() {
	let ns = Namespace::default();
	assert_eq!(ns.manager(""), ns.root());
	assert_eq!(ns.manager("root"), ns.root());
	assert_eq!(ns.root().name(), "root");
	assert!(ns.root().parent().is_none());
}

#[test]
fn test_empty_segments_are_dropped() {
	let ns = Namespace::default();
	let a = ns.manager(".a");
	assert_eq!(a.name(), "a");
	assert_eq!(a.parent(), Some(ns.root()));
	assert_eq!(ns.manager("a..b."), ns.manager("a.b"));
	assert_eq!(ns.manager("..."), ns.root());

	let names: Vec<_> = ns.managers().iter().map(|m| m.name().to_string()).collect();
	assert_eq!(names, vec!["a", "a.b", "root"]);
}

#[test]
fn test_ancestors_are_created() {
	let ns = Namespace::default();
	let leaf = ns.manager("a.b.c");
	assert_eq!(leaf.name(), "a.b.c");

	let b = leaf.parent().unwrap();
	assert_eq!(b.name(), "a.b");
	let a = b.parent().unwrap();
	assert_eq!(a.name(), "a");
	assert_eq!(a.parent().unwrap(), ns.root());

	assert_eq!(
		ns.managers().iter().map(|m| m.name().to_string()).collect::<Vec<_>>(),
		vec!["a", "a.b", "a.b.c", "root"]
	);
}

#[test]
fn test_managers_are_memoised() {
	let ns = Namespace::default();
	let first = ns.manager("menus");
	let second = ns.manager("menus");
	assert_eq!(first, second);
	assert_eq!(ns.root().children(), vec![first]);
}

#[test]
fn test_namespaces_are_independent() {
	let one = Namespace::default();
	let two = Namespace::default();
	assert_ne!(one.manager("x"), two.manager("x"));
}

#[test]
fn test_rejects_invalid_config() {
	let config = ManagerConfig {
		separator: String::new(),
		..ManagerConfig::default()
	};
	assert!(Namespace::new(config).is_err());
}

#[test]
fn test_contexts() {
	let ns = Namespace::default();
	let ctx = ns.declare_context("ext");
	assert!(ns.epochs().is_current(&ctx));
	ns.unload_context("ext");
	assert!(!ctx.is_current());
}

#[test]
fn test_global_is_shared() {
	let global = Namespace::global();
	assert_eq!(global.manager("shared.global"), Namespace::global().manager("shared.global"));
	assert_eq!(global.config(), &ManagerConfig::default());
}

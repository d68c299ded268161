use std::any::Any;

use compid_parser::{TypeDesc, Value};
use compid_record::{Field, handler_fn};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::*;
use crate::config::ManagerConfig;
use crate::namespace::Namespace;

type Log = Arc<Mutex<Vec<String>>>;

struct Click {
	token: String,
	choice: Option<String>,
}

impl Click {
	fn new(token: &str) -> Self {
		Self {
			token: token.to_string(),
			choice: None,
		}
	}
}

impl Event for Click {
	fn token(&self) -> &str {
		&self.token
	}

	fn input(&self, name: &str) -> Option<&str> {
		(name == "choice").then_some(self.choice.as_deref()).flatten()
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

struct Recorder {
	name: &'static str,
	log: Log,
	fail_before: bool,
	fail_after: bool,
}

impl Recorder {
	fn new(name: &'static str, log: &Log) -> Arc<Self> {
		Arc::new(Self {
			name,
			log: log.clone(),
			fail_before: false,
			fail_after: false,
		})
	}
}

#[async_trait]
impl Middleware for Recorder {
	async fn before(&self, _invocation: &Invocation) -> anyhow::Result<()> {
		self.log.lock().push(format!("enter {}", self.name));
		if self.fail_before {
			anyhow::bail!("{} rejected", self.name);
		}
		Ok(())
	}

	async fn after(
		&self,
		_invocation: &Invocation,
		outcome: Result<(), &anyhow::Error>,
	) -> anyhow::Result<()> {
		let status = if outcome.is_ok() { "ok" } else { "err" };
		self.log.lock().push(format!("exit {} {status}", self.name));
		if self.fail_after {
			anyhow::bail!("{} failed on exit", self.name);
		}
		Ok(())
	}
}

struct Catcher {
	name: &'static str,
	log: Log,
	handles: bool,
}

#[async_trait]
impl ExceptionHandler for Catcher {
	async fn handle(&self, invocation: &Invocation, error: &anyhow::Error) -> bool {
		self.log.lock().push(format!(
			"catch {} {} {error}",
			self.name, invocation.identifier
		));
		self.handles
	}
}

fn catcher(name: &'static str, log: &Log, handles: bool) -> Arc<dyn ExceptionHandler> {
	Arc::new(Catcher {
		name,
		log: log.clone(),
		handles,
	})
}

/// Declares `btn` on `manager` with a handler that logs the decoded value
/// and fails when it is negative.
fn button(manager: &Manager, log: &Log) -> Arc<RecordType> {
	let log = log.clone();
	manager
		.declare(
			manager
				.record_type("btn")
				.field(Field::state("n", TypeDesc::INT))
				.handler(handler_fn(move |record: Record| {
					let log = log.clone();
					async move {
						let n = record.get("n").and_then(Value::as_int).unwrap_or_default();
						log.lock().push(format!("handler {n}"));
						anyhow::ensure!(n >= 0, "negative count {n}");
						Ok(())
					}
				})),
		)
		.unwrap()
}

fn namespace() -> Namespace {
	Namespace::new(ManagerConfig {
		count: false,
		..ManagerConfig::default()
	})
	.unwrap()
}

#[tokio::test]
async fn test_middleware_wraps_handler_root_first() {
	let ns = namespace();
	let log = Log::default();
	button(&ns.manager("a.b"), &log);
	ns.root().set_middleware(Some(Recorder::new("root", &log)));
	ns.manager("a.b").set_middleware(Some(Recorder::new("a.b", &log)));

	let outcome = ns.root().handle_event(&Click::new("btn|5")).await;
	assert!(outcome.is_invoked());
	assert_eq!(
		*log.lock(),
		vec!["enter root", "enter a.b", "handler 5", "exit a.b ok", "exit root ok"]
	);
}

#[tokio::test]
async fn test_unmatched_and_undecodable_tokens_are_dropped() {
	let ns = namespace();
	let log = Log::default();
	button(&ns.root(), &log);

	assert!(matches!(
		ns.root().handle_event(&Click::new("something_else")).await,
		DispatchOutcome::Unmatched
	));
	assert!(matches!(
		ns.root().handle_event(&Click::new("btn|1|2")).await,
		DispatchOutcome::Unmatched
	));
	let outcome = ns.root().handle_event(&Click::new("btn|one")).await;
	let DispatchOutcome::DecodeFailed(err) = outcome else {
		panic!("expected a decode failure, got {outcome:?}");
	};
	assert_eq!(err.fields().collect::<Vec<_>>(), vec!["n"]);
	assert!(log.lock().is_empty());
}

#[tokio::test]
async fn test_sibling_binding_does_not_match() {
	let ns = namespace();
	let log = Log::default();
	button(&ns.manager("a"), &log);

	assert!(matches!(
		ns.manager("b").handle_event(&Click::new("btn|1")).await,
		DispatchOutcome::Unmatched
	));
	assert!(ns.manager("a").handle_event(&Click::new("btn|1")).await.is_invoked());
}

#[tokio::test]
async fn test_stale_registration_is_evicted() {
	let ns = namespace();
	let log = Log::default();
	let ctx = ns.declare_context("ext");
	let manager = ns.manager("ext");
	let log_in_handler = log.clone();
	let ty = manager
		.declare(manager.record_type("btn").context(ctx).handler(handler_fn(
			move |_record: Record| {
				let log = log_in_handler.clone();
				async move {
					log.lock().push("stale handler ran".to_string());
					Ok::<_, anyhow::Error>(())
				}
			},
		)))
		.unwrap();

	ns.unload_context("ext");
	assert!(matches!(
		ns.root().handle_event(&Click::new("btn")).await,
		DispatchOutcome::Stale
	));
	assert!(!ns.root().is_registered(&ty));
	assert!(matches!(
		ns.root().handle_event(&Click::new("btn")).await,
		DispatchOutcome::Unmatched
	));
	assert!(log.lock().is_empty());
}

#[tokio::test]
async fn test_exception_cascade_stops_at_first_handler() {
	let ns = namespace();
	let log = Log::default();
	button(&ns.manager("a.b"), &log);
	ns.root().set_exception_handler(Some(catcher("root", &log, true)));
	ns.manager("a").set_exception_handler(Some(catcher("a", &log, true)));
	ns.manager("a.b").set_exception_handler(Some(catcher("a.b", &log, false)));

	let outcome = ns.root().handle_event(&Click::new("btn|-1")).await;
	assert!(matches!(outcome, DispatchOutcome::Failed { handled: true }));
	assert_eq!(
		*log.lock(),
		vec![
			"handler -1",
			"catch a.b btn negative count -1",
			"catch a btn negative count -1",
		]
	);
}

#[tokio::test]
async fn test_unhandled_error_reaches_root() {
	let ns = namespace();
	let log = Log::default();
	button(&ns.manager("a.b"), &log);
	ns.root().set_exception_handler(Some(catcher("root", &log, false)));
	ns.manager("a.b").set_exception_handler(Some(catcher("a.b", &log, false)));

	let outcome = ns.root().handle_event(&Click::new("btn|-2")).await;
	assert!(matches!(outcome, DispatchOutcome::Failed { handled: false }));
	assert_eq!(
		*log.lock(),
		vec![
			"handler -2",
			"catch a.b btn negative count -2",
			"catch root btn negative count -2",
		]
	);

	// One failing event does not affect the next.
	assert!(ns.root().handle_event(&Click::new("btn|2")).await.is_invoked());
}

#[tokio::test]
async fn test_rejecting_middleware_unwinds_entered_only() {
	let ns = namespace();
	let log = Log::default();
	button(&ns.manager("a.b"), &log);
	ns.root().set_middleware(Some(Recorder::new("root", &log)));
	ns.manager("a").set_middleware(Some(Arc::new(Recorder {
		name: "a",
		log: log.clone(),
		fail_before: true,
		fail_after: false,
	})));
	ns.manager("a.b").set_middleware(Some(Recorder::new("a.b", &log)));
	ns.root().set_exception_handler(Some(catcher("root", &log, true)));

	let outcome = ns.root().handle_event(&Click::new("btn|1")).await;
	assert!(matches!(outcome, DispatchOutcome::Failed { handled: true }));
	assert_eq!(
		*log.lock(),
		vec!["enter root", "enter a", "exit root err", "catch root btn a rejected"]
	);
}

#[tokio::test]
async fn test_failing_after_turns_success_into_error() {
	let ns = namespace();
	let log = Log::default();
	button(&ns.root(), &log);
	ns.root().set_middleware(Some(Arc::new(Recorder {
		name: "root",
		log: log.clone(),
		fail_before: false,
		fail_after: true,
	})));

	let outcome = ns.root().handle_event(&Click::new("btn|1")).await;
	assert!(matches!(outcome, DispatchOutcome::Failed { handled: false }));
	assert_eq!(*log.lock(), vec!["enter root", "handler 1", "exit root ok"]);
}

#[tokio::test]
async fn test_event_fields_read_from_event() {
	let ns = namespace();
	let seen = Log::default();
	let log = seen.clone();
	let manager = ns.root();
	manager
		.declare(
			manager
				.record_type("select")
				.field(Field::state("page", TypeDesc::INT))
				.field(Field::event("choice", TypeDesc::STR))
				.handler(handler_fn(move |record: Record| {
					let log = log.clone();
					async move {
						log.lock().push(format!("{record:?}"));
						Ok::<_, anyhow::Error>(())
					}
				})),
		)
		.unwrap();

	let event = Click {
		token: "select|2".to_string(),
		choice: Some("blue".to_string()),
	};
	assert!(manager.handle_event(&event).await.is_invoked());
	assert_eq!(*seen.lock(), vec![r#"select { page: Int(2), choice: Str("blue") }"#]);

	assert!(matches!(
		manager.handle_event(&Click::new("select|2")).await,
		DispatchOutcome::DecodeFailed(_)
	));
}

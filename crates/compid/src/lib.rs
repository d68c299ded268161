//! Typed component ids.
//!
//! Declare a record type as an ordered list of typed fields, encode
//! instances into short tokens that ride along inside host UI events, and
//! get typed records back when those events return.
//!
//! This crate aggregates the component id sub-crates:
//!
//! - [`parser`] - value model, type descriptors and the parser registry
//! - [`token`] - compiled token specs (encode/decode of raw segments)
//! - [`record`] - fields, record types, record instances and liveness
//! - [`manager`] - manager trees, registration, dispatch and host binding
//!
//! ```ignore
//! let ns = Namespace::default();
//! let menus = ns.manager("menus");
//! let page = menus.declare(
//!     menus
//!         .record_type("page")
//!         .field(Field::state("index", TypeDesc::INT))
//!         .handler(handler_fn(|record| async move { Ok(()) })),
//! )?;
//! let token = page.instance().set("index", 2i64).build()?.dumps().await?;
//! ```

pub use compid_manager as manager;
pub use compid_manager::{
	ConfigLoadError, DispatchOutcome, EventListener, EventSource, ExceptionHandler, Invocation,
	Manager, ManagerConfig, Middleware, Namespace, RegistryError, Resolved, SubscriptionId,
};
pub use compid_parser as parser;
pub use compid_parser::{
	CollectionKind, ConfigError, EnumDesc, Event, ParseContext, ParseError, Parser, ParserRegistry,
	TypeDesc, TypeKey, Value,
};
pub use compid_record as record;
pub use compid_record::{
	ConversionError, DeclarationContext, Field, FieldRole, Handler, Record, RecordError,
	RecordType, RecordTypeBuilder, SchemaError, handler_fn,
};
pub use compid_token as token;
pub use compid_token::{TokenError, TokenSpec};

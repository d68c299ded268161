//! Record types and instances.
//!
//! A [`RecordType`] is declared with a [`RecordTypeBuilder`]: an ordered
//! list of [`Field`]s, a separator and optionally a handler and a
//! [`DeclarationContext`]. Finalizing resolves a parser for every field and
//! compiles the [`TokenSpec`](compid_token::TokenSpec); the result is
//! immutable. Its [`RecordFactory`] converts between raw token segments and
//! [`Record`] instances.

mod epoch;
mod error;
mod factory;
mod field;
mod record;
mod record_type;

pub use epoch::{DeclarationContext, EpochTable};
pub use error::{ConversionError, FieldError, RecordError, SchemaError};
pub use factory::RecordFactory;
pub use field::{Field, FieldRole};
pub use record::{Record, RecordBuilder};
pub use record_type::{
	Handler, HandlerFn, RecordType, RecordTypeBuilder, TokenIssuer, handler_fn,
};

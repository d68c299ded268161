use compid_record::SchemaError;
use compid_token::TokenError;
use thiserror::Error;

/// Registration and host binding failures. All of them are raised while
/// wiring things up, never while handling an event.
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
	/// A live record type already uses this identifier.
	#[error("identifier `{identifier}` is already registered")]
	DuplicateIdentifier { identifier: String },
	/// The identifier and an existing one differ only by a counter character,
	/// so a suffixed token could resolve to either.
	#[error("identifier `{identifier}` is ambiguous with `{existing}` under the counter suffix")]
	AmbiguousIdentifier { identifier: String, existing: String },
	#[error("record type `{record}` is already registered with manager `{owner}`")]
	AlreadyOwned { record: String, owner: String },
	#[error("record type `{record}` uses separator {got:?}, manager expects {expected:?}")]
	SeparatorMismatch {
		record: String,
		expected: String,
		got: String,
	},
	#[error("manager `{0}` is already bound to this host")]
	AlreadyBound(String),
	#[error("manager `{0}` is not bound to this host")]
	NotBound(String),
	#[error(transparent)]
	Schema(#[from] SchemaError),
	#[error(transparent)]
	Token(#[from] TokenError),
}

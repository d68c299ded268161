//! Hierarchical component managers.
//!
//! A [`Namespace`] holds a tree of [`Manager`]s addressed by dotted names.
//! Record types are registered with one manager and become visible to it and
//! every ancestor, which can then resolve their tokens. Inbound events are
//! dispatched from whichever manager is bound to the host: the token is
//! resolved, decoded and handed to the record type's handler, wrapped in the
//! [`Middleware`] of each manager from the root down to the owner. Errors
//! cascade through [`ExceptionHandler`]s in the opposite direction.

mod config;
mod dispatch;
mod error;
mod host;
mod manager;
mod namespace;

pub use config::{ConfigLoadError, ManagerConfig};
pub use dispatch::{DispatchOutcome, ExceptionHandler, Invocation, Middleware};
pub use error::RegistryError;
pub use host::{EventListener, EventSource, SubscriptionId};
pub use manager::{Manager, Resolved};
pub use namespace::{Namespace, ROOT};

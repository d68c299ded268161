//! Event dispatch through the manager chain.
//!
//! An inbound token is resolved from the manager the event arrives at. The
//! decoded record is handed to its type's handler inside the middleware of
//! every manager from the root down to the owner. Failures are offered to
//! exception handlers from the owner back up to the root.

use std::sync::Arc;

use async_trait::async_trait;
use compid_parser::Event;
use compid_record::{ConversionError, Record, RecordType};
use tracing::Instrument;

use crate::manager::Manager;

/// Wraps every invocation dispatched through a manager or its descendants.
#[async_trait]
pub trait Middleware: Send + Sync {
	/// Runs before the handler. An error stops dispatch and is routed to the
	/// exception handlers.
	async fn before(&self, _invocation: &Invocation) -> anyhow::Result<()> {
		Ok(())
	}

	/// Runs after the handler, or after an inner middleware failed to enter.
	/// Receives the failure so far, if any.
	async fn after(
		&self,
		_invocation: &Invocation,
		_outcome: Result<(), &anyhow::Error>,
	) -> anyhow::Result<()> {
		Ok(())
	}
}

/// Offered every error raised while dispatching through a manager or its
/// descendants.
#[async_trait]
pub trait ExceptionHandler: Send + Sync {
	/// Returns true if the error was handled, which stops the cascade.
	async fn handle(&self, invocation: &Invocation, error: &anyhow::Error) -> bool;
}

/// One dispatched event, as seen by middleware and exception handlers.
pub struct Invocation {
	pub identifier: Arc<str>,
	pub record_type: Arc<RecordType>,
	/// Manager owning the record type.
	pub manager: Manager,
	pub token: String,
	/// Decoded record. Handlers receive their own copy.
	pub record: Record,
}

impl std::fmt::Debug for Invocation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Invocation")
			.field("identifier", &self.identifier)
			.field("manager", &self.manager)
			.field("token", &self.token)
			.field("record", &self.record)
			.finish()
	}
}

/// What happened to one inbound event.
#[derive(Debug)]
pub enum DispatchOutcome {
	/// No registration matches the token.
	Unmatched,
	/// The matching registration was stale and has been evicted.
	Stale,
	/// The token matched but a field failed to decode.
	DecodeFailed(ConversionError),
	/// The handler ran to completion.
	Invoked,
	/// Middleware or the handler failed. `handled` is false when no
	/// exception handler claimed the error.
	Failed { handled: bool },
}

impl DispatchOutcome {
	pub fn is_invoked(&self) -> bool {
		matches!(self, Self::Invoked)
	}
}

impl Manager {
	pub fn set_middleware(&self, middleware: Option<Arc<dyn Middleware>>) {
		*self.node.middleware.write() = middleware;
	}

	pub fn set_exception_handler(&self, handler: Option<Arc<dyn ExceptionHandler>>) {
		*self.node.exception_handler.write() = handler;
	}

	fn middleware(&self) -> Option<Arc<dyn Middleware>> {
		self.node.middleware.read().clone()
	}

	fn exception_handler(&self) -> Option<Arc<dyn ExceptionHandler>> {
		self.node.exception_handler.read().clone()
	}

	/// Dispatches one inbound event. Never fails: every failure is reported
	/// through the outcome and the log.
	pub async fn handle_event(&self, event: &dyn Event) -> DispatchOutcome {
		let token = event.token();
		self.dispatch(event)
			.instrument(tracing::info_span!("dispatch", token))
			.await
	}

	async fn dispatch(&self, event: &dyn Event) -> DispatchOutcome {
		let token = event.token();
		let Some(resolved) = self.resolve(token) else {
			tracing::debug!("no registration matches");
			return DispatchOutcome::Unmatched;
		};
		if !resolved.live {
			self.evict(&resolved);
			return DispatchOutcome::Stale;
		}

		let raw: Vec<&str> = resolved.fields.iter().map(String::as_str).collect();
		let record = match resolved.record_type.loads(Some(event), &raw).await {
			Ok(record) => record,
			Err(err) => {
				tracing::debug!(error = %err, "failed to decode token");
				return DispatchOutcome::DecodeFailed(err);
			}
		};

		let manager = resolved.owner.clone().unwrap_or_else(|| self.clone());
		let invocation = Invocation {
			identifier: resolved.identifier,
			record_type: resolved.record_type,
			manager,
			token: token.to_string(),
			record,
		};

		// Root first.
		let mut chain = invocation.manager.ancestry();
		chain.reverse();

		let result = run_chain(&chain, &invocation, event).await;
		match result {
			Ok(()) => DispatchOutcome::Invoked,
			Err(err) => {
				let handled = cascade(&chain, &invocation, &err).await;
				if !handled {
					tracing::error!(
						identifier = %invocation.identifier,
						manager = invocation.manager.name(),
						error = ?err,
						"unhandled error in component handler"
					);
				}
				DispatchOutcome::Failed { handled }
			}
		}
	}
}

/// Enters middleware root to owner, runs the handler, then unwinds the
/// entered middleware in reverse.
async fn run_chain(
	chain: &[Manager],
	invocation: &Invocation,
	event: &dyn Event,
) -> anyhow::Result<()> {
	let mut entered = Vec::with_capacity(chain.len());
	let mut result = Ok(());
	for manager in chain {
		let Some(middleware) = manager.middleware() else {
			continue;
		};
		if let Err(err) = middleware.before(invocation).await {
			result = Err(err);
			break;
		}
		entered.push(middleware);
	}

	if result.is_ok()
		&& let Some(handler) = invocation.record_type.handler()
	{
		result = handler.invoke(invocation.record.clone(), event).await;
	}

	for middleware in entered.iter().rev() {
		let after = middleware.after(invocation, result.as_ref().copied()).await;
		let Err(err) = after else {
			continue;
		};
		if let Err(original) = &result {
			tracing::warn!(
				error = %err,
				original = %original,
				"middleware failed while unwinding"
			);
		} else {
			result = Err(err);
		}
	}
	result
}

/// Offers `err` to exception handlers owner first. Returns true once one of
/// them handles it.
async fn cascade(chain: &[Manager], invocation: &Invocation, err: &anyhow::Error) -> bool {
	for manager in chain.iter().rev() {
		let Some(handler) = manager.exception_handler() else {
			continue;
		};
		if handler.handle(invocation, err).await {
			tracing::debug!(manager = manager.name(), "error handled");
			return true;
		}
	}
	false
}

#[cfg(test)]
mod tests;

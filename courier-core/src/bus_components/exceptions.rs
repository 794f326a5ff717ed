//! ### Exception resolution
//! A fault raised by any stage of a request pipeline is offered to the exception handlers
//! registered for the request, walking the fault's hierarchy from its own kind up to its
//! outermost ancestor. Within one level, handlers run in registration order and the first one
//! to claim the fault supplies the response. The walk stops there.
//!
//! Exception actions only observe. Depending on [ExceptionActionPolicy] they run for unclaimed
//! faults only, or for every fault.

use super::contexts::CancellationSignal;
use super::handler::{DynMessage, DynResponse, Recovery};
use crate::catalog::ShapeInstance;
use crate::reflect::TypeExpr;
use crate::registry::Scope;
use crate::responses::Fault;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionActionPolicy {
	#[default]
	UnhandledOnly,
	Always,
}

pub struct ExceptionResolutionChain {
	scope: Scope,
	request: TypeExpr,
	response: TypeExpr,
	policy: ExceptionActionPolicy,
}

impl ExceptionResolutionChain {
	pub fn new(scope: Scope, request: TypeExpr, response: TypeExpr, policy: ExceptionActionPolicy) -> Self {
		Self { scope, request, response, policy }
	}

	/// Resolves `fault` into a substitute response, or hands the original fault back.
	pub async fn resolve(&self, message: DynMessage, fault: Fault, signal: CancellationSignal) -> Result<DynResponse, Fault> {
		let lineage = fault.kind().lineage();
		let recovered = self.recover(&lineage, &message, &fault, &signal).await;

		if recovered.is_none() || self.policy == ExceptionActionPolicy::Always {
			self.observe(&lineage, &message, &fault, &signal).await;
		}
		match recovered {
			Some(response) => Ok(response),
			None => {
				tracing::error!(request = %self.request, %fault, "unhandled fault");
				Err(fault)
			}
		}
	}

	async fn recover(&self, lineage: &[TypeExpr], message: &DynMessage, fault: &Fault, signal: &CancellationSignal) -> Option<DynResponse> {
		for kind in lineage {
			let contract = ShapeInstance::exception_handler(self.request.clone(), self.response.clone(), kind.clone());
			let handlers = match self.scope.resolve_all(&contract) {
				Ok(handlers) => handlers,
				Err(err) => {
					tracing::error!(%contract, %err, "exception handlers could not be resolved");
					continue;
				}
			};
			for resolved in handlers {
				let Some(handler) = resolved.service.into_exception_handler() else {
					continue;
				};
				if let Recovery::Claimed(response) = handler.handle(message.clone(), fault, signal.clone()).await {
					tracing::debug!(request = %self.request, level = %kind, handler = %resolved.implementation, "fault claimed");
					return Some(response);
				}
			}
		}
		None
	}

	async fn observe(&self, lineage: &[TypeExpr], message: &DynMessage, fault: &Fault, signal: &CancellationSignal) {
		let mut executed: Vec<TypeExpr> = vec![];
		for kind in lineage {
			let contract = ShapeInstance::exception_action(self.request.clone(), kind.clone());
			let actions = match self.scope.resolve_all(&contract) {
				Ok(actions) => actions,
				Err(err) => {
					tracing::error!(%contract, %err, "exception actions could not be resolved");
					continue;
				}
			};
			for resolved in actions {
				if executed.contains(&resolved.implementation) {
					continue;
				}
				executed.push(resolved.implementation.clone());
				let Some(action) = resolved.service.into_exception_action() else {
					continue;
				};
				if let Err(err) = action.execute(message.clone(), fault, signal.clone()).await {
					tracing::error!(action = %resolved.implementation, %err, "exception action failed");
				}
			}
		}
	}
}

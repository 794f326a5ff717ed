use super::{downcast_message, DynMessage, DynResponse, TypedService};
use crate::bus_components::contexts::CancellationSignal;
use crate::message::TRequest;
use crate::responses::{Fault, TExceptionType};
use async_trait::async_trait;

/// Outcome of an exception handler. A claimed fault is replaced by the given response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery<S> {
	Unclaimed,
	Claimed(S),
}

impl<S> Recovery<S> {
	pub fn is_claimed(&self) -> bool {
		matches!(self, Self::Claimed(_))
	}

	pub fn map<T>(self, f: impl FnOnce(S) -> T) -> Recovery<T> {
		match self {
			Self::Unclaimed => Recovery::Unclaimed,
			Self::Claimed(response) => Recovery::Claimed(f(response)),
		}
	}
}

/// Handles faults of kind `X`, or of any kind derived from it, raised while handling `R`.
#[async_trait]
pub trait TRequestExceptionHandler<R: TRequest, X: TExceptionType>: Send + Sync + 'static {
	async fn handle(&self, request: &R, fault: &Fault, signal: &CancellationSignal) -> Recovery<R::Response>;
}

/// Observes faults of kind `X` raised while handling `R`. Actions never change the outcome.
#[async_trait]
pub trait TRequestExceptionAction<R: TRequest, X: TExceptionType>: Send + Sync + 'static {
	async fn execute(&self, request: &R, fault: &Fault, signal: &CancellationSignal) -> Result<(), Fault>;
}

#[async_trait]
pub trait DynExceptionHandler: Send + Sync {
	async fn handle(&self, request: DynMessage, fault: &Fault, signal: CancellationSignal) -> Recovery<DynResponse>;
}

#[async_trait]
pub trait DynExceptionAction: Send + Sync {
	async fn execute(&self, request: DynMessage, fault: &Fault, signal: CancellationSignal) -> Result<(), Fault>;
}

#[async_trait]
impl<R, X, H> DynExceptionHandler for TypedService<(R, X), H>
where
	R: TRequest,
	X: TExceptionType,
	H: TRequestExceptionHandler<R, X>,
{
	async fn handle(&self, request: DynMessage, fault: &Fault, signal: CancellationSignal) -> Recovery<DynResponse> {
		match downcast_message::<R>(request) {
			Ok(request) => self.inner.handle(&request, fault, &signal).await.map(|response| Box::new(response) as DynResponse),
			Err(err) => {
				tracing::error!(%err, "exception handler received a foreign request");
				Recovery::Unclaimed
			}
		}
	}
}

#[async_trait]
impl<R, X, A> DynExceptionAction for TypedService<(R, X), A>
where
	R: TRequest,
	X: TExceptionType,
	A: TRequestExceptionAction<R, X>,
{
	async fn execute(&self, request: DynMessage, fault: &Fault, signal: CancellationSignal) -> Result<(), Fault> {
		let request = downcast_message::<R>(request)?;
		self.inner.execute(&request, fault, &signal).await
	}
}

use super::{downcast_message, DynMessage, TypedService};
use crate::bus_components::contexts::CancellationSignal;
use crate::message::TRequest;
use crate::responses::{Fault, TypeMismatch};
use async_trait::async_trait;
use std::any::Any;

/// Runs before the behaviors of the pipeline. Cannot change the request.
#[async_trait]
pub trait TRequestPreProcessor<R: TRequest>: Send + Sync + 'static {
	async fn process(&self, request: &R, signal: &CancellationSignal) -> Result<(), Fault>;
}

/// Runs once the handler has answered, in registration order.
#[async_trait]
pub trait TRequestPostProcessor<R: TRequest>: Send + Sync + 'static {
	async fn process(&self, request: &R, response: &R::Response, signal: &CancellationSignal) -> Result<(), Fault>;
}

#[async_trait]
pub trait DynPreProcessor: Send + Sync {
	async fn process(&self, request: DynMessage, signal: CancellationSignal) -> Result<(), Fault>;
}

#[async_trait]
pub trait DynPostProcessor: Send + Sync {
	async fn process(&self, request: DynMessage, response: &(dyn Any + Send + Sync), signal: CancellationSignal) -> Result<(), Fault>;
}

#[async_trait]
impl<R, P> DynPreProcessor for TypedService<R, P>
where
	R: TRequest,
	P: TRequestPreProcessor<R>,
{
	async fn process(&self, request: DynMessage, signal: CancellationSignal) -> Result<(), Fault> {
		let request = downcast_message::<R>(request)?;
		self.inner.process(&request, &signal).await
	}
}

#[async_trait]
impl<R, P> DynPostProcessor for TypedService<R, P>
where
	R: TRequest,
	P: TRequestPostProcessor<R>,
{
	async fn process(&self, request: DynMessage, response: &(dyn Any + Send + Sync), signal: CancellationSignal) -> Result<(), Fault> {
		let request = downcast_message::<R>(request)?;
		let response = response.downcast_ref::<R::Response>().ok_or(TypeMismatch {
			expected: std::any::type_name::<R::Response>(),
		})?;
		self.inner.process(&request, response, &signal).await
	}
}

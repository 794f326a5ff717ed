use super::{downcast_message, DynMessage, DynResponse, TypedService};
use crate::bus_components::contexts::CancellationSignal;
use crate::message::TRequest;
use crate::responses::Fault;
use async_trait::async_trait;
use std::marker::PhantomData;

#[async_trait]
pub trait TRequestHandler<R: TRequest>: Send + Sync + 'static {
	async fn handle(&self, request: &R, signal: &CancellationSignal) -> Result<R::Response, Fault>;
}

/// Handler of a request answered with `()`. Registered as a request handler for `(R, ())`.
#[async_trait]
pub trait TVoidRequestHandler<R>: Send + Sync + 'static
where
	R: TRequest<Response = ()>,
{
	async fn handle(&self, request: &R, signal: &CancellationSignal) -> Result<(), Fault>;
}

#[async_trait]
pub trait DynRequestHandler: Send + Sync {
	async fn handle(&self, request: DynMessage, signal: CancellationSignal) -> Result<DynResponse, Fault>;
}

#[async_trait]
impl<R, H> DynRequestHandler for TypedService<R, H>
where
	R: TRequest,
	H: TRequestHandler<R>,
{
	async fn handle(&self, request: DynMessage, signal: CancellationSignal) -> Result<DynResponse, Fault> {
		let request = downcast_message::<R>(request)?;
		let response = self.inner.handle(&request, &signal).await?;
		Ok(Box::new(response))
	}
}

/// [TypedService] counterpart for [TVoidRequestHandler].
pub struct VoidService<R, H> {
	inner: H,
	_request: PhantomData<fn(R)>,
}

impl<R, H> VoidService<R, H> {
	pub fn new(inner: H) -> Self {
		Self { inner, _request: PhantomData }
	}
}

#[async_trait]
impl<R, H> DynRequestHandler for VoidService<R, H>
where
	R: TRequest<Response = ()>,
	H: TVoidRequestHandler<R>,
{
	async fn handle(&self, request: DynMessage, signal: CancellationSignal) -> Result<DynResponse, Fault> {
		let request = downcast_message::<R>(request)?;
		self.inner.handle(&request, &signal).await?;
		Ok(Box::new(()))
	}
}

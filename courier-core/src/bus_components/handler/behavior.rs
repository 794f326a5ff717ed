use super::{downcast_message, downcast_response, DynMessage, DynResponse, TypedService};
use crate::bus_components::contexts::CancellationSignal;
use crate::message::TRequest;
use crate::responses::Fault;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::marker::PhantomData;

/// Continuation of the pipeline: the next behavior, or the handler for the innermost one.
///
/// `run` consumes the continuation, so the rest of the pipeline executes at most once per behavior.
pub struct Next(Box<dyn FnOnce(CancellationSignal) -> BoxFuture<'static, Result<DynResponse, Fault>> + Send>);

impl Next {
	pub fn new<F, Fut>(f: F) -> Self
	where
		F: FnOnce(CancellationSignal) -> Fut + Send + 'static,
		Fut: Future<Output = Result<DynResponse, Fault>> + Send + 'static,
	{
		Self(Box::new(move |signal| f(signal).boxed()))
	}

	pub async fn run(self, signal: CancellationSignal) -> Result<DynResponse, Fault> {
		(self.0)(signal).await
	}

	pub fn typed<S: Send + Sync + 'static>(self) -> TypedNext<S> {
		TypedNext { next: self, _response: PhantomData }
	}
}

pub struct TypedNext<S> {
	next: Next,
	_response: PhantomData<fn() -> S>,
}

impl<S: Send + Sync + 'static> TypedNext<S> {
	pub async fn run(self, signal: CancellationSignal) -> Result<S, Fault> {
		downcast_response(self.next.run(signal).await?)
	}
}

/// Wraps the handling of `R`. The last registered behavior is the outermost one.
///
/// ```ignore
/// struct Doubling;
///
/// #[async_trait]
/// impl TPipelineBehavior<Sum> for Doubling {
///     async fn handle(&self, _: &Sum, next: TypedNext<i32>, signal: &CancellationSignal) -> Result<i32, Fault> {
///         Ok(next.run(signal.clone()).await? * 2)
///     }
/// }
/// ```
#[async_trait]
pub trait TPipelineBehavior<R: TRequest>: Send + Sync + 'static {
	async fn handle(&self, request: &R, next: TypedNext<R::Response>, signal: &CancellationSignal) -> Result<R::Response, Fault>;
}

#[async_trait]
pub trait DynPipelineBehavior: Send + Sync {
	async fn handle(&self, request: DynMessage, next: Next, signal: CancellationSignal) -> Result<DynResponse, Fault>;
}

#[async_trait]
impl<R, B> DynPipelineBehavior for TypedService<R, B>
where
	R: TRequest,
	B: TPipelineBehavior<R>,
{
	async fn handle(&self, request: DynMessage, next: Next, signal: CancellationSignal) -> Result<DynResponse, Fault> {
		let request = downcast_message::<R>(request)?;
		let response = self.inner.handle(&request, next.typed(), &signal).await?;
		Ok(Box::new(response))
	}
}

use super::{downcast_message, downcast_response, DynMessage, DynResponse, TypedService};
use crate::bus_components::contexts::CancellationSignal;
use crate::message::TStreamRequest;
use crate::responses::Fault;
use futures::stream::{self, BoxStream, StreamExt};
use std::marker::PhantomData;
use std::sync::Arc;

pub type FaultStream<T> = BoxStream<'static, Result<T, Fault>>;

pub trait TStreamRequestHandler<S: TStreamRequest>: Send + Sync + 'static {
	fn handle(&self, request: Arc<S>, signal: CancellationSignal) -> FaultStream<S::Item>;
}

pub trait DynStreamHandler: Send + Sync {
	fn handle(&self, request: DynMessage, signal: CancellationSignal) -> FaultStream<DynResponse>;
}

impl<S, H> DynStreamHandler for TypedService<S, H>
where
	S: TStreamRequest,
	H: TStreamRequestHandler<S>,
{
	fn handle(&self, request: DynMessage, signal: CancellationSignal) -> FaultStream<DynResponse> {
		match downcast_message::<S>(request) {
			Ok(request) => self.inner.handle(request, signal).map(|item| item.map(|item| Box::new(item) as DynResponse)).boxed(),
			Err(err) => failed(err),
		}
	}
}

pub(crate) fn failed<T: Send + 'static>(fault: Fault) -> FaultStream<T> {
	stream::once(async move { Err(fault) }).boxed()
}

/// Stream counterpart of [Next](super::Next).
pub struct StreamNext(Box<dyn FnOnce(CancellationSignal) -> FaultStream<DynResponse> + Send>);

impl StreamNext {
	pub fn new(f: impl FnOnce(CancellationSignal) -> FaultStream<DynResponse> + Send + 'static) -> Self {
		Self(Box::new(f))
	}

	pub fn run(self, signal: CancellationSignal) -> FaultStream<DynResponse> {
		(self.0)(signal)
	}

	pub fn typed<T: Send + Sync + 'static>(self) -> TypedStreamNext<T> {
		TypedStreamNext { next: self, _item: PhantomData }
	}
}

pub struct TypedStreamNext<T> {
	next: StreamNext,
	_item: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> TypedStreamNext<T> {
	pub fn run(self, signal: CancellationSignal) -> FaultStream<T> {
		self.next.run(signal).map(|item| item.and_then(downcast_response::<T>)).boxed()
	}
}

/// Wraps the stream produced for `S`, item by item or as a whole.
pub trait TStreamPipelineBehavior<S: TStreamRequest>: Send + Sync + 'static {
	fn handle(&self, request: Arc<S>, next: TypedStreamNext<S::Item>, signal: CancellationSignal) -> FaultStream<S::Item>;
}

pub trait DynStreamPipelineBehavior: Send + Sync {
	fn handle(&self, request: DynMessage, next: StreamNext, signal: CancellationSignal) -> FaultStream<DynResponse>;
}

impl<S, B> DynStreamPipelineBehavior for TypedService<S, B>
where
	S: TStreamRequest,
	B: TStreamPipelineBehavior<S>,
{
	fn handle(&self, request: DynMessage, next: StreamNext, signal: CancellationSignal) -> FaultStream<DynResponse> {
		match downcast_message::<S>(request) {
			Ok(request) => self.inner.handle(request, next.typed(), signal).map(|item| item.map(|item| Box::new(item) as DynResponse)).boxed(),
			Err(err) => failed(err),
		}
	}
}

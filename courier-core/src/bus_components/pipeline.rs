use super::contexts::CancellationSignal;
use super::exceptions::{ExceptionActionPolicy, ExceptionResolutionChain};
use super::handler::*;
use crate::catalog::ShapeInstance;
use crate::reflect::TypeExpr;
use crate::registry::{Resolved, Scope};
use crate::responses::{Cancelled, Fault, HandlerNotFound, TypeMismatch};
use futures::stream::StreamExt;
use std::sync::Arc;

/// Position of a component in an assembled chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainStage {
	PreProcessor,
	Behavior,
	Handler,
	PostProcessor,
}

/// Everything one request dispatch runs through, resolved from a single scope.
///
/// Execution order: pre-processors in registration order, then behaviors from the last
/// registered (outermost) to the first registered, then the handler, then post-processors in
/// registration order. A fault raised anywhere in that sequence goes through the
/// [ExceptionResolutionChain].
pub struct ExecutionChain {
	request: TypeExpr,
	pre_processors: Vec<(TypeExpr, Arc<dyn DynPreProcessor>)>,
	behaviors: Vec<(TypeExpr, Arc<dyn DynPipelineBehavior>)>,
	handler: (TypeExpr, Arc<dyn DynRequestHandler>),
	post_processors: Vec<(TypeExpr, Arc<dyn DynPostProcessor>)>,
	exceptions: ExceptionResolutionChain,
}

fn components<T: ?Sized>(resolved: Vec<Resolved>, pick: fn(Service) -> Option<Arc<T>>, expected: &'static str) -> Result<Vec<(TypeExpr, Arc<T>)>, Fault> {
	resolved
		.into_iter()
		.map(|Resolved { implementation, service }| pick(service).map(|component| (implementation, component)).ok_or_else(|| TypeMismatch { expected }.into()))
		.collect()
}

impl ExecutionChain {
	/// Resolves the chain of `request`. Fails with [HandlerNotFound] when no handler answers it.
	pub fn assemble(scope: &Scope, request: &TypeExpr, response: &TypeExpr, policy: ExceptionActionPolicy) -> Result<Self, Fault> {
		let contract = ShapeInstance::request_handler(request.clone(), response.clone());
		let handler = scope.resolve(&contract)?.ok_or_else(|| HandlerNotFound { contract: contract.to_string() })?;
		let handler = components(vec![handler], Service::into_request_handler, "RequestHandler")?.remove(0);

		Ok(Self {
			request: request.clone(),
			pre_processors: components(scope.resolve_all(&ShapeInstance::pre_processor(request.clone()))?, Service::into_pre_processor, "RequestPreProcessor")?,
			behaviors: components(scope.resolve_all(&ShapeInstance::pipeline_behavior(request.clone(), response.clone()))?, Service::into_behavior, "PipelineBehavior")?,
			handler,
			post_processors: components(scope.resolve_all(&ShapeInstance::post_processor(request.clone(), response.clone()))?, Service::into_post_processor, "RequestPostProcessor")?,
			exceptions: ExceptionResolutionChain::new(scope.clone(), request.clone(), response.clone(), policy),
		})
	}

	/// Components in execution order.
	pub fn stages(&self) -> Vec<(ChainStage, &TypeExpr)> {
		let mut stages: Vec<_> = self.pre_processors.iter().map(|(implementation, _)| (ChainStage::PreProcessor, implementation)).collect();
		stages.extend(self.behaviors.iter().rev().map(|(implementation, _)| (ChainStage::Behavior, implementation)));
		stages.push((ChainStage::Handler, &self.handler.0));
		stages.extend(self.post_processors.iter().map(|(implementation, _)| (ChainStage::PostProcessor, implementation)));
		stages
	}

	pub async fn execute(self, message: DynMessage, signal: CancellationSignal) -> Result<DynResponse, Fault> {
		let Self {
			request,
			pre_processors,
			behaviors,
			handler,
			post_processors,
			exceptions,
		} = self;

		let outcome = run(message.clone(), signal.clone(), pre_processors, behaviors, handler.1, post_processors).await;
		match outcome {
			Ok(response) => Ok(response),
			Err(fault) => {
				tracing::debug!(%request, %fault, "resolving fault");
				exceptions.resolve(message, fault, signal).await
			}
		}
	}
}

async fn run(
	message: DynMessage,
	signal: CancellationSignal,
	pre_processors: Vec<(TypeExpr, Arc<dyn DynPreProcessor>)>,
	behaviors: Vec<(TypeExpr, Arc<dyn DynPipelineBehavior>)>,
	handler: Arc<dyn DynRequestHandler>,
	post_processors: Vec<(TypeExpr, Arc<dyn DynPostProcessor>)>,
) -> Result<DynResponse, Fault> {
	for (_, processor) in &pre_processors {
		signal.check()?;
		processor.process(message.clone(), signal.clone()).await?;
	}

	let request = message.clone();
	let mut next = Next::new(move |signal: CancellationSignal| async move {
		signal.check()?;
		handler.handle(request, signal).await
	});
	// each behavior wraps the ones registered before it
	for (_, behavior) in behaviors {
		let (request, inner) = (message.clone(), next);
		next = Next::new(move |signal: CancellationSignal| async move {
			signal.check()?;
			behavior.handle(request, inner, signal).await
		});
	}
	let response = next.run(signal.clone()).await?;

	for (_, processor) in &post_processors {
		signal.check()?;
		processor.process(message.clone(), &*response, signal.clone()).await?;
	}
	Ok(response)
}

/// Stream counterpart of [ExecutionChain]: stream behaviors wrapping the stream handler.
pub struct StreamChain {
	behaviors: Vec<Arc<dyn DynStreamPipelineBehavior>>,
	handler: Arc<dyn DynStreamHandler>,
}

impl StreamChain {
	pub fn assemble(scope: &Scope, request: &TypeExpr, item: &TypeExpr) -> Result<Self, Fault> {
		let contract = ShapeInstance::stream_handler(request.clone(), item.clone());
		let handler = scope.resolve(&contract)?.ok_or_else(|| HandlerNotFound { contract: contract.to_string() })?;
		let handler = handler.service.into_stream_handler().ok_or(TypeMismatch { expected: "StreamRequestHandler" })?;
		let behaviors = components(scope.resolve_all(&ShapeInstance::stream_behavior(request.clone(), item.clone()))?, Service::into_stream_behavior, "StreamPipelineBehavior")?;

		Ok(Self {
			behaviors: behaviors.into_iter().map(|(_, behavior)| behavior).collect(),
			handler,
		})
	}

	pub fn execute(self, message: DynMessage, signal: CancellationSignal) -> FaultStream<DynResponse> {
		let Self { behaviors, handler } = self;
		let request = message.clone();
		let mut next = StreamNext::new(move |signal| handler.handle(request, signal));
		for behavior in behaviors {
			let (request, inner) = (message.clone(), next);
			next = StreamNext::new(move |signal| behavior.handle(request, inner, signal));
		}

		// cancellation wins over a pending or ready item and ends the stream with one `Cancelled`
		let state = Some((next.run(signal.clone()), signal.cancelled()));
		futures::stream::unfold(state, |state| async move {
			let (mut items, mut cancelled) = state?;
			tokio::select! {
				biased;
				_ = &mut cancelled => Some((Err(Cancelled.into()), None)),
				item = items.next() => item.map(|item| (item, Some((items, cancelled)))),
			}
		})
		.boxed()
	}
}

use super::contexts::CancellationSignal;
use super::exceptions::ExceptionActionPolicy;
use super::handler::stream::failed;
use super::handler::{downcast_response, DynMessage, DynResponse, FaultStream};
use super::pipeline::{ExecutionChain, StreamChain};
use super::publisher::{NotificationHandlerExecutor, TPublishStrategy};
use crate::catalog::ShapeInstance;
use crate::config::MediatorConfiguration;
use crate::message::{TNotification, TRequest, TStreamRequest};
use crate::reflect::{Reflect, TypeExpr};
use crate::registration::register;
use crate::registry::Registry;
use crate::responses::{ConfigurationError, Fault};
use futures::stream::StreamExt;
use std::sync::Arc;

/// Entry point for sending requests, publishing notifications and opening streams.
///
/// Every dispatch resolves its components from a fresh scope of the registry.
#[derive(Clone)]
pub struct Mediator {
	inner: Arc<MediatorInner>,
}

struct MediatorInner {
	registry: Registry,
	publisher: Arc<dyn TPublishStrategy>,
	policy: ExceptionActionPolicy,
}

impl Mediator {
	/// Scans, closes and registers everything `config` describes.
	pub fn build(config: MediatorConfiguration) -> Result<Self, ConfigurationError> {
		let registry = register(&config)?;
		Ok(Self::new(registry, config.publisher(), config.exception_action_policy))
	}

	pub fn new(registry: Registry, publisher: Arc<dyn TPublishStrategy>, policy: ExceptionActionPolicy) -> Self {
		Self {
			inner: Arc::new(MediatorInner { registry, publisher, policy }),
		}
	}

	pub fn registry(&self) -> &Registry {
		&self.inner.registry
	}

	pub async fn send<R: TRequest>(&self, request: R) -> Result<R::Response, Fault> {
		self.send_with(request, &CancellationSignal::new()).await
	}

	pub async fn send_with<R: TRequest>(&self, request: R, signal: &CancellationSignal) -> Result<R::Response, Fault> {
		let response = self.send_dynamic(Arc::new(request), R::type_expr(), <R::Response as Reflect>::type_expr(), signal).await?;
		downcast_response(response)
	}

	/// Sends a request known only by its type expressions.
	pub async fn send_dynamic(&self, request: DynMessage, request_type: TypeExpr, response_type: TypeExpr, signal: &CancellationSignal) -> Result<DynResponse, Fault> {
		tracing::info!(request = %request_type, "sending request");
		signal.check()?;

		let scope = self.inner.registry.create_scope();
		let chain = ExecutionChain::assemble(&scope, &request_type, &response_type, self.inner.policy)?;
		chain.execute(request, signal.clone()).await
	}

	pub async fn publish<N: TNotification>(&self, notification: N) -> Result<(), Fault> {
		self.publish_with(notification, &CancellationSignal::new()).await
	}

	pub async fn publish_with<N: TNotification>(&self, notification: N, signal: &CancellationSignal) -> Result<(), Fault> {
		self.publish_dynamic(Arc::new(notification), N::type_expr(), signal).await
	}

	/// Delivers a notification to its handlers through the configured strategy.
	/// Notifications without handlers are dropped.
	pub async fn publish_dynamic(&self, notification: DynMessage, notification_type: TypeExpr, signal: &CancellationSignal) -> Result<(), Fault> {
		tracing::info!(notification = %notification_type, "publishing notification");
		signal.check()?;

		let scope = self.inner.registry.create_scope();
		let executors = scope
			.resolve_all(&ShapeInstance::notification_handler(notification_type.clone()))?
			.into_iter()
			.filter_map(|resolved| {
				let implementation = resolved.implementation;
				resolved.service.into_notification_handler().map(|handler| NotificationHandlerExecutor::new(implementation, handler))
			})
			.collect::<Vec<_>>();

		if executors.is_empty() {
			tracing::debug!(notification = %notification_type, "no handler registered");
			return Ok(());
		}
		self.inner.publisher.publish(executors, notification, signal.clone()).await
	}

	pub fn create_stream<S: TStreamRequest>(&self, request: S) -> FaultStream<S::Item> {
		self.create_stream_with(request, &CancellationSignal::new())
	}

	/// Opens the stream of `request`. Assembly failures, such as a missing handler, are the only item of the stream.
	pub fn create_stream_with<S: TStreamRequest>(&self, request: S, signal: &CancellationSignal) -> FaultStream<S::Item> {
		let (request_type, item_type) = (S::type_expr(), <S::Item as Reflect>::type_expr());
		tracing::info!(request = %request_type, "creating stream");
		if let Err(fault) = signal.check() {
			return failed(fault);
		}

		let scope = self.inner.registry.create_scope();
		match StreamChain::assemble(&scope, &request_type, &item_type) {
			Ok(chain) => chain.execute(Arc::new(request), signal.clone()).map(|item| item.and_then(downcast_response::<S::Item>)).boxed(),
			Err(fault) => failed(fault),
		}
	}
}

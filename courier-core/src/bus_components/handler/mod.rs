//! ### Handlers
//! Handlers are written against typed traits such as [TRequestHandler] or [TNotificationHandler].
//! The dispatcher only sees their type-erased counterparts (`Dyn*` traits), reached through
//! [TypedService], which downcasts the erased message back to its concrete type.
//!
//! Templates closed at startup implement the `Dyn*` traits directly since their concrete types
//! are only known from their bindings.
//!
//! ### Example - typed request handler
//! ```ignore
//! struct PingHandler;
//!
//! #[async_trait]
//! impl TRequestHandler<Ping> for PingHandler {
//!     async fn handle(&self, request: &Ping, _: &CancellationSignal) -> Result<String, Fault> {
//!         Ok(format!("pong {}", request.0))
//!     }
//! }
//! ```

pub mod behavior;
pub mod event;
pub mod exception;
pub mod processor;
pub mod request;
pub mod stream;

pub use behavior::*;
pub use event::*;
pub use exception::*;
pub use processor::*;
pub use request::*;
pub use stream::*;

use crate::catalog::ShapeKind;
use crate::responses::{Fault, TypeMismatch};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// Erased request, notification or stream request shared by every stage of one dispatch.
pub type DynMessage = Arc<dyn Any + Send + Sync>;
/// Erased response or stream item.
pub type DynResponse = Box<dyn Any + Send + Sync>;

/// Typed handler `H` seen through the erased trait matching its role for message `M`.
pub struct TypedService<M, H> {
	inner: H,
	_message: PhantomData<fn(M)>,
}

impl<M, H> TypedService<M, H> {
	pub fn new(inner: H) -> Self {
		Self { inner, _message: PhantomData }
	}
}

pub(crate) fn downcast_message<M: Send + Sync + 'static>(message: DynMessage) -> Result<Arc<M>, Fault> {
	message.downcast::<M>().map_err(|_| TypeMismatch { expected: std::any::type_name::<M>() }.into())
}

pub fn downcast_response<S: 'static>(response: DynResponse) -> Result<S, Fault> {
	response.downcast::<S>().map(|response| *response).map_err(|_| TypeMismatch { expected: std::any::type_name::<S>() }.into())
}

/// Component resolved from the registry.
#[derive(Clone)]
pub enum Service {
	RequestHandler(Arc<dyn DynRequestHandler>),
	NotificationHandler(Arc<dyn DynNotificationHandler>),
	StreamHandler(Arc<dyn DynStreamHandler>),
	PreProcessor(Arc<dyn DynPreProcessor>),
	PostProcessor(Arc<dyn DynPostProcessor>),
	ExceptionHandler(Arc<dyn DynExceptionHandler>),
	ExceptionAction(Arc<dyn DynExceptionAction>),
	Behavior(Arc<dyn DynPipelineBehavior>),
	StreamBehavior(Arc<dyn DynStreamPipelineBehavior>),
}

impl Service {
	/// Whether the component can serve a contract of `kind`.
	pub fn fits(&self, kind: ShapeKind) -> bool {
		matches!(
			(self, kind),
			(Self::RequestHandler(_), ShapeKind::RequestHandler | ShapeKind::VoidRequestHandler)
				| (Self::NotificationHandler(_), ShapeKind::NotificationHandler)
				| (Self::StreamHandler(_), ShapeKind::StreamRequestHandler)
				| (Self::PreProcessor(_), ShapeKind::RequestPreProcessor)
				| (Self::PostProcessor(_), ShapeKind::RequestPostProcessor)
				| (Self::ExceptionHandler(_), ShapeKind::RequestExceptionHandler)
				| (Self::ExceptionAction(_), ShapeKind::RequestExceptionAction)
				| (Self::Behavior(_), ShapeKind::PipelineBehavior)
				| (Self::StreamBehavior(_), ShapeKind::StreamPipelineBehavior)
		)
	}

	pub fn variant_name(&self) -> &'static str {
		match self {
			Self::RequestHandler(_) => "RequestHandler",
			Self::NotificationHandler(_) => "NotificationHandler",
			Self::StreamHandler(_) => "StreamHandler",
			Self::PreProcessor(_) => "PreProcessor",
			Self::PostProcessor(_) => "PostProcessor",
			Self::ExceptionHandler(_) => "ExceptionHandler",
			Self::ExceptionAction(_) => "ExceptionAction",
			Self::Behavior(_) => "Behavior",
			Self::StreamBehavior(_) => "StreamBehavior",
		}
	}
}

impl std::fmt::Debug for Service {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Service::{}", self.variant_name())
	}
}

macro_rules! service_accessors {
	($($method:ident => $variant:ident($component:ty)),* $(,)?) => {
		impl Service {
			$(
				pub fn $method(self) -> Option<Arc<$component>> {
					match self {
						Self::$variant(component) => Some(component),
						_ => None,
					}
				}
			)*
		}
	};
}

service_accessors!(
	into_request_handler => RequestHandler(dyn DynRequestHandler),
	into_notification_handler => NotificationHandler(dyn DynNotificationHandler),
	into_stream_handler => StreamHandler(dyn DynStreamHandler),
	into_pre_processor => PreProcessor(dyn DynPreProcessor),
	into_post_processor => PostProcessor(dyn DynPostProcessor),
	into_exception_handler => ExceptionHandler(dyn DynExceptionHandler),
	into_exception_action => ExceptionAction(dyn DynExceptionAction),
	into_behavior => Behavior(dyn DynPipelineBehavior),
	into_stream_behavior => StreamBehavior(dyn DynStreamPipelineBehavior),
);

//! ### Modules
//! A [Module] is the unit handed to the scanner. It lists message types, handler
//! implementations and templates, each turned into a [CandidateType] when the module is loaded.
//!
//! ### Example
//! ```ignore
//! let module = Module::new("app")
//!     .request::<Ping>()
//!     .request_handler::<Ping, _>(|| PingHandler)
//!     .template(Template::new("AuditLog").param(TypeParam::new("N").constrained(TypeConstraint::Role(RoleKind::Notification))));
//! ```

use super::scanner::{TTypeModule, TypeLoad, TypeLoadError};
use super::{Activator, CandidateType, CrossConstraint, ShapeInstance, TypeParam, TypeRole};
use crate::bus_components::handler::*;
use crate::message::{TNotification, TRequest, TStreamRequest};
use crate::reflect::{Bindings, Reflect, TypeExpr, TypeName};
use crate::responses::{ActivationError, ConfigurationError, TExceptionType};
use std::marker::PhantomData;
use std::sync::Arc;

type Loader = Box<dyn Fn() -> TypeLoad + Send + Sync>;

pub struct Module {
	name: String,
	loaders: Vec<Loader>,
}

impl Module {
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into(), loaders: vec![] }
	}

	pub fn add(mut self, candidate: CandidateType) -> Self {
		self.loaders.push(Box::new(move || Ok(candidate.clone())));
		self
	}

	/// Type whose load fails. The scanner drops it and keeps going.
	pub fn unloadable(mut self, type_name: impl Into<String>, reason: impl Into<String>) -> Self {
		let (type_name, reason) = (type_name.into(), reason.into());
		self.loaders.push(Box::new(move || {
			Err(TypeLoadError {
				type_name: type_name.clone(),
				reason: reason.clone(),
			})
		}));
		self
	}

	pub fn request<R: TRequest>(self) -> Self {
		self.add(CandidateType::request::<R>())
	}

	pub fn notification<N: TNotification>(self) -> Self {
		self.add(CandidateType::notification::<N>())
	}

	pub fn stream_request<S: TStreamRequest>(self) -> Self {
		self.add(CandidateType::stream_request::<S>())
	}

	pub fn exception<X: TExceptionType>(self) -> Self {
		self.add(CandidateType::exception::<X>())
	}

	pub fn interface<T: Reflect>(self) -> Self {
		self.add(CandidateType::interface::<T>())
	}

	pub fn template(self, template: Template) -> Self {
		self.add(template.build())
	}

	/// Implementation type `H` declaring one or more shapes.
	pub fn implementation<H: Send + Sync + 'static>(self, build: impl FnOnce(Implementation<H>) -> Implementation<H>) -> Self {
		self.add(build(Implementation::new()).candidate)
	}

	pub fn request_handler<R: TRequest, H: TRequestHandler<R>>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self {
		self.implementation::<H>(|implementation| implementation.request_handler::<R>(factory))
	}

	pub fn void_request_handler<R: TRequest<Response = ()>, H: TVoidRequestHandler<R>>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self {
		self.implementation::<H>(|implementation| implementation.void_request_handler::<R>(factory))
	}

	pub fn notification_handler<N: TNotification, H: TNotificationHandler<N>>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self {
		self.implementation::<H>(|implementation| implementation.notification_handler::<N>(factory))
	}

	pub fn stream_handler<S: TStreamRequest, H: TStreamRequestHandler<S>>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self {
		self.implementation::<H>(|implementation| implementation.stream_handler::<S>(factory))
	}

	pub fn pre_processor<R: TRequest, P: TRequestPreProcessor<R>>(self, factory: impl Fn() -> P + Send + Sync + 'static) -> Self {
		self.implementation::<P>(|implementation| implementation.pre_processor::<R>(factory))
	}

	pub fn post_processor<R: TRequest, P: TRequestPostProcessor<R>>(self, factory: impl Fn() -> P + Send + Sync + 'static) -> Self {
		self.implementation::<P>(|implementation| implementation.post_processor::<R>(factory))
	}

	pub fn exception_handler<R: TRequest, X: TExceptionType, H: TRequestExceptionHandler<R, X>>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self {
		self.implementation::<H>(|implementation| implementation.exception_handler::<R, X>(factory))
	}

	pub fn exception_action<R: TRequest, X: TExceptionType, A: TRequestExceptionAction<R, X>>(self, factory: impl Fn() -> A + Send + Sync + 'static) -> Self {
		self.implementation::<A>(|implementation| implementation.exception_action::<R, X>(factory))
	}
}

impl TTypeModule for Module {
	fn name(&self) -> &str {
		&self.name
	}

	fn load_types(&self) -> Result<Vec<TypeLoad>, ConfigurationError> {
		Ok(self.loaders.iter().map(|load| load()).collect())
	}
}

/// Shapes declared by the concrete implementation type `H`.
pub struct Implementation<H> {
	candidate: CandidateType,
	_implementation: PhantomData<fn() -> H>,
}

impl<H: Send + Sync + 'static> Implementation<H> {
	fn new() -> Self {
		Self {
			candidate: CandidateType::new(TypeExpr::named(std::any::type_name::<H>()), TypeRole::Plain),
			_implementation: PhantomData,
		}
	}

	fn declare(mut self, shape: ShapeInstance, activate: impl Fn() -> Service + Send + Sync + 'static) -> Self {
		let activator: Activator = Arc::new(move |_: &Bindings| Ok(activate()));
		self.candidate = self.candidate.implements_typed(shape, activator);
		self
	}

	fn declare_erased(mut self, shape: ShapeInstance, activate: impl Fn() -> Service + Send + Sync + 'static) -> Self {
		let activator: Activator = Arc::new(move |_: &Bindings| Ok(activate()));
		self.candidate = self.candidate.implements(shape, activator);
		self
	}

	pub fn base(mut self, base: TypeExpr) -> Self {
		self.candidate = self.candidate.base(base);
		self
	}

	pub fn marker(mut self, marker: impl Into<TypeName>) -> Self {
		self.candidate = self.candidate.marker(marker);
		self
	}

	pub fn request_handler<R: TRequest>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self
	where
		H: TRequestHandler<R>,
	{
		self.declare(ShapeInstance::request_handler(R::type_expr(), <R::Response as Reflect>::type_expr()), move || {
			Service::RequestHandler(Arc::new(TypedService::<R, H>::new(factory())))
		})
	}

	pub fn void_request_handler<R: TRequest<Response = ()>>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self
	where
		H: TVoidRequestHandler<R>,
	{
		self.declare(ShapeInstance::void_request_handler(R::type_expr()), move || {
			Service::RequestHandler(Arc::new(VoidService::<R, H>::new(factory())))
		})
	}

	pub fn notification_handler<N: TNotification>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self
	where
		H: TNotificationHandler<N>,
	{
		self.declare(ShapeInstance::notification_handler(N::type_expr()), move || {
			Service::NotificationHandler(Arc::new(TypedService::<N, H>::new(factory())))
		})
	}

	/// Request handler declared against the interface `I`, answering with `S`.
	///
	/// `H` receives the request as dispatched, so it serves every request implementing `I`. The
	/// typed [request_handler](Self::request_handler) only serves `I` itself.
	pub fn interface_request_handler<I: Reflect, S: Reflect>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self
	where
		H: DynRequestHandler + 'static,
	{
		self.declare_erased(ShapeInstance::request_handler(I::type_expr(), S::type_expr()), move || Service::RequestHandler(Arc::new(factory())))
	}

	/// Notification handler receiving every notification implementing the interface `I`.
	pub fn interface_notification_handler<I: Reflect>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self
	where
		H: DynNotificationHandler + 'static,
	{
		self.declare_erased(ShapeInstance::notification_handler(I::type_expr()), move || Service::NotificationHandler(Arc::new(factory())))
	}

	pub fn stream_handler<S: TStreamRequest>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self
	where
		H: TStreamRequestHandler<S>,
	{
		self.declare(ShapeInstance::stream_handler(S::type_expr(), <S::Item as Reflect>::type_expr()), move || {
			Service::StreamHandler(Arc::new(TypedService::<S, H>::new(factory())))
		})
	}

	pub fn pre_processor<R: TRequest>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self
	where
		H: TRequestPreProcessor<R>,
	{
		self.declare(ShapeInstance::pre_processor(R::type_expr()), move || Service::PreProcessor(Arc::new(TypedService::<R, H>::new(factory()))))
	}

	pub fn post_processor<R: TRequest>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self
	where
		H: TRequestPostProcessor<R>,
	{
		self.declare(ShapeInstance::post_processor(R::type_expr(), <R::Response as Reflect>::type_expr()), move || {
			Service::PostProcessor(Arc::new(TypedService::<R, H>::new(factory())))
		})
	}

	pub fn exception_handler<R: TRequest, X: TExceptionType>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self
	where
		H: TRequestExceptionHandler<R, X>,
	{
		self.declare(ShapeInstance::exception_handler(R::type_expr(), <R::Response as Reflect>::type_expr(), X::type_expr()), move || {
			Service::ExceptionHandler(Arc::new(TypedService::<(R, X), H>::new(factory())))
		})
	}

	pub fn exception_action<R: TRequest, X: TExceptionType>(self, factory: impl Fn() -> H + Send + Sync + 'static) -> Self
	where
		H: TRequestExceptionAction<R, X>,
	{
		self.declare(ShapeInstance::exception_action(R::type_expr(), X::type_expr()), move || {
			Service::ExceptionAction(Arc::new(TypedService::<(R, X), H>::new(factory())))
		})
	}
}

/// Open generic implementation, closed against the catalog at registration.
///
/// Activators receive the bindings of the template parameters and build an erased component
/// directly, since the concrete Rust types are only known at that point.
pub struct Template {
	name: TypeName,
	candidate: CandidateType,
}

impl Template {
	pub fn new(name: impl Into<TypeName>) -> Self {
		let name = name.into();
		Self {
			candidate: CandidateType::new(TypeExpr::named(name.clone()), TypeRole::Plain),
			name,
		}
	}

	pub fn param(mut self, param: TypeParam) -> Self {
		self.candidate.params.push(param);
		self
	}

	pub fn implements_raw(mut self, shape: ShapeInstance, activator: Activator) -> Self {
		self.candidate = self.candidate.implements(shape, activator);
		self
	}

	pub fn implements(self, shape: ShapeInstance, activate: impl Fn(&Bindings) -> Result<Service, ActivationError> + Send + Sync + 'static) -> Self {
		self.implements_raw(shape, Arc::new(activate))
	}

	/// Constraint across several parameters, checked for each combination.
	pub fn cross_constraint(mut self, constraint: impl Fn(&Bindings, &super::TypeCatalog) -> Result<(), String> + Send + Sync + 'static) -> Self {
		let constraint: CrossConstraint = Arc::new(constraint);
		self.candidate.cross_constraints.push(constraint);
		self
	}

	pub fn marker(mut self, marker: impl Into<TypeName>) -> Self {
		self.candidate = self.candidate.marker(marker);
		self
	}

	pub fn build(mut self) -> CandidateType {
		self.candidate.expr = TypeExpr::generic(self.name, self.candidate.params.iter().map(|param| TypeExpr::Param(param.name.clone())));
		self.candidate
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::scanner::scan;
	use crate::catalog::{ShapeKind, TypeCatalog};
	use crate::prelude::{CancellationSignal, Fault};
	use async_trait::async_trait;

	struct Ping;
	crate::reflect_named!(Ping => "tests::Ping");
	impl TRequest for Ping {
		type Response = String;
	}

	struct Pinged;
	crate::reflect_named!(Pinged => "tests::Pinged");
	impl TNotification for Pinged {}

	struct PingService;

	#[async_trait]
	impl TRequestHandler<Ping> for PingService {
		async fn handle(&self, _: &Ping, _: &CancellationSignal) -> Result<String, Fault> {
			Ok("pong".into())
		}
	}

	#[async_trait]
	impl TNotificationHandler<Pinged> for PingService {
		async fn handle(&self, _: &Pinged, _: &CancellationSignal) -> Result<(), Fault> {
			Ok(())
		}
	}

	#[tokio::test]
	async fn test_implementation_declares_every_shape() {
		let module: Arc<dyn TTypeModule> = Arc::new(
			Module::new("app")
				.request::<Ping>()
				.notification::<Pinged>()
				.implementation::<PingService>(|i| i.request_handler::<Ping>(|| PingService).notification_handler::<Pinged>(|| PingService))
				.unloadable("Broken", "cannot be loaded"),
		);
		let catalog = TypeCatalog::new(scan(&[module], None).unwrap());
		assert_eq!(catalog.len(), 3);

		let service = catalog.iter().find(|ty| ty.shapes.len() == 2).unwrap();
		assert_eq!(service.name(), "PingService");
		assert_eq!(service.shapes[0].shape.to_string(), "RequestHandler<Ping, String>");

		let Service::RequestHandler(handler) = (service.shapes[0].activator)(&Bindings::new()).unwrap() else {
			panic!("expected a request handler");
		};
		let response = handler.handle(Arc::new(Ping), CancellationSignal::new()).await.unwrap();
		assert_eq!(response.downcast_ref::<String>().unwrap(), "pong");

		let mismatch = handler.handle(Arc::new(Pinged), CancellationSignal::new()).await.unwrap_err();
		assert!(mismatch.is::<crate::responses::TypeMismatch>());
	}

	#[test]
	fn test_template_expression_lists_its_parameters() {
		let template = Template::new("Relay")
			.param(TypeParam::new("A"))
			.param(TypeParam::new("B"))
			.implements(ShapeInstance::notification_handler(TypeExpr::param("A")), |_| Err(ActivationError::new("unused")))
			.build();

		assert!(template.is_template());
		assert_eq!(template.name(), "Relay<A, B>");
		assert_eq!(template.shapes[0].shape.kind(), ShapeKind::NotificationHandler);
	}
}

//! ### Type catalog
//! Static description of every type a module contributes: messages, the handler shapes each
//! implementation satisfies and, for templates, the free type parameters still to be closed.
//!
//! The catalog is produced once by the [scanner](scanner::scan) and only read afterwards.

pub mod closing;
pub mod matcher;
pub mod module;
pub mod scanner;

use crate::bus_components::handler::Service;
use crate::reflect::{Bindings, Reflect, TypeExpr, TypeName};
use crate::responses::{ActivationError, ConfigurationError};
use hashbrown::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Handler contract kinds. Each kind has a fixed number of type arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
	/// `<Request, Response>`
	RequestHandler,
	/// `<Request>`
	VoidRequestHandler,
	/// `<Notification>`
	NotificationHandler,
	/// `<StreamRequest, Item>`
	StreamRequestHandler,
	/// `<Request>`
	RequestPreProcessor,
	/// `<Request, Response>`
	RequestPostProcessor,
	/// `<Request, Response, Exception>`
	RequestExceptionHandler,
	/// `<Request, Exception>`
	RequestExceptionAction,
	/// `<Request, Response>`
	PipelineBehavior,
	/// `<StreamRequest, Item>`
	StreamPipelineBehavior,
}

impl ShapeKind {
	pub const fn arity(self) -> usize {
		match self {
			Self::VoidRequestHandler | Self::NotificationHandler | Self::RequestPreProcessor => 1,
			Self::RequestExceptionHandler => 3,
			_ => 2,
		}
	}

	/// Multi-registration kinds keep every match. The others keep a single default resolution.
	pub const fn allows_multiple(self) -> bool {
		!matches!(self, Self::RequestHandler | Self::VoidRequestHandler | Self::StreamRequestHandler)
	}

	pub const fn is_behavior(self) -> bool {
		matches!(self, Self::PipelineBehavior | Self::StreamPipelineBehavior)
	}

	pub const fn name(self) -> &'static str {
		match self {
			Self::RequestHandler => "RequestHandler",
			Self::VoidRequestHandler => "VoidRequestHandler",
			Self::NotificationHandler => "NotificationHandler",
			Self::StreamRequestHandler => "StreamRequestHandler",
			Self::RequestPreProcessor => "RequestPreProcessor",
			Self::RequestPostProcessor => "RequestPostProcessor",
			Self::RequestExceptionHandler => "RequestExceptionHandler",
			Self::RequestExceptionAction => "RequestExceptionAction",
			Self::PipelineBehavior => "PipelineBehavior",
			Self::StreamPipelineBehavior => "StreamPipelineBehavior",
		}
	}
}

/// A shape kind applied to type arguments, e.g. `RequestHandler<Ping, String>`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ShapeInstance {
	kind: ShapeKind,
	args: Vec<TypeExpr>,
}

impl ShapeInstance {
	pub fn new(kind: ShapeKind, args: Vec<TypeExpr>) -> Result<Self, ConfigurationError> {
		if args.len() != kind.arity() {
			return Err(ConfigurationError::ShapeArity {
				kind: kind.name(),
				expected: kind.arity(),
				actual: args.len(),
			});
		}
		Ok(Self { kind, args })
	}

	pub fn request_handler(request: TypeExpr, response: TypeExpr) -> Self {
		Self::sized(ShapeKind::RequestHandler, [request, response])
	}

	pub fn void_request_handler(request: TypeExpr) -> Self {
		Self::sized(ShapeKind::VoidRequestHandler, [request])
	}

	pub fn notification_handler(notification: TypeExpr) -> Self {
		Self::sized(ShapeKind::NotificationHandler, [notification])
	}

	pub fn stream_handler(request: TypeExpr, item: TypeExpr) -> Self {
		Self::sized(ShapeKind::StreamRequestHandler, [request, item])
	}

	pub fn pre_processor(request: TypeExpr) -> Self {
		Self::sized(ShapeKind::RequestPreProcessor, [request])
	}

	pub fn post_processor(request: TypeExpr, response: TypeExpr) -> Self {
		Self::sized(ShapeKind::RequestPostProcessor, [request, response])
	}

	pub fn exception_handler(request: TypeExpr, response: TypeExpr, exception: TypeExpr) -> Self {
		Self::sized(ShapeKind::RequestExceptionHandler, [request, response, exception])
	}

	pub fn exception_action(request: TypeExpr, exception: TypeExpr) -> Self {
		Self::sized(ShapeKind::RequestExceptionAction, [request, exception])
	}

	pub fn pipeline_behavior(request: TypeExpr, response: TypeExpr) -> Self {
		Self::sized(ShapeKind::PipelineBehavior, [request, response])
	}

	pub fn stream_behavior(request: TypeExpr, item: TypeExpr) -> Self {
		Self::sized(ShapeKind::StreamPipelineBehavior, [request, item])
	}

	fn sized<const N: usize>(kind: ShapeKind, args: [TypeExpr; N]) -> Self {
		debug_assert_eq!(N, kind.arity());
		Self { kind, args: args.into() }
	}

	pub fn kind(&self) -> ShapeKind {
		self.kind
	}

	pub fn args(&self) -> &[TypeExpr] {
		&self.args
	}

	/// The handled message: first type argument of every shape.
	pub fn message(&self) -> &TypeExpr {
		&self.args[0]
	}

	pub fn is_open(&self) -> bool {
		self.args.iter().any(TypeExpr::is_open)
	}

	pub fn with_message(&self, message: TypeExpr) -> Self {
		let mut args = self.args.clone();
		args[0] = message;
		Self { kind: self.kind, args }
	}

	pub fn substitute(&self, bindings: &Bindings) -> Result<Self, TypeName> {
		Ok(Self {
			kind: self.kind,
			args: self.args.iter().map(|arg| arg.substitute(bindings)).collect::<Result<_, _>>()?,
		})
	}

	/// Contract under which the shape is registered. Void request handlers are registered as
	/// request handlers answering `()`.
	pub fn normalized(&self) -> Self {
		match self.kind {
			ShapeKind::VoidRequestHandler => Self::request_handler(self.args[0].clone(), <()>::type_expr()),
			_ => self.clone(),
		}
	}
}

impl fmt::Display for ShapeInstance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}<", self.kind.name())?;
		for (i, arg) in self.args.iter().enumerate() {
			if i > 0 {
				write!(f, ", ")?;
			}
			write!(f, "{arg}")?;
		}
		write!(f, ">")
	}
}

impl fmt::Debug for ShapeInstance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoleKind {
	Request,
	Notification,
	StreamRequest,
	Exception,
}

/// What a catalog type is, as far as dispatch is concerned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRole {
	Request { response: TypeExpr },
	Notification,
	StreamRequest { item: TypeExpr },
	Exception { parent: Option<TypeExpr> },
	/// Interface-like type other types can declare as a base.
	Interface,
	/// Handler implementations and any other type.
	Plain,
}

impl TypeRole {
	pub fn kind(&self) -> Option<RoleKind> {
		match self {
			Self::Request { .. } => Some(RoleKind::Request),
			Self::Notification => Some(RoleKind::Notification),
			Self::StreamRequest { .. } => Some(RoleKind::StreamRequest),
			Self::Exception { .. } => Some(RoleKind::Exception),
			Self::Interface | Self::Plain => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeConstraint {
	Role(RoleKind),
	Marker(TypeName),
	AssignableTo(TypeExpr),
}

/// Free type parameter of a template, with the constraints a concrete type must satisfy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParam {
	pub name: TypeName,
	pub constraints: Vec<TypeConstraint>,
}

impl TypeParam {
	pub fn new(name: impl Into<TypeName>) -> Self {
		Self {
			name: name.into(),
			constraints: vec![],
		}
	}

	pub fn constrained(mut self, constraint: TypeConstraint) -> Self {
		self.constraints.push(constraint);
		self
	}
}

/// Builds the component registered for a shape from the bindings of its free parameters.
pub type Activator = Arc<dyn Fn(&Bindings) -> Result<Service, ActivationError> + Send + Sync>;

/// Constraint spanning several parameters, checked only when a closed type is constructed.
pub type CrossConstraint = Arc<dyn Fn(&Bindings, &TypeCatalog) -> Result<(), String> + Send + Sync>;

#[derive(Clone)]
pub struct ShapeImpl {
	pub shape: ShapeInstance,
	pub activator: Activator,
	/// The component downcasts the message to the declared type. Such a declaration against an
	/// interface only serves the interface itself.
	pub typed: bool,
}

/// Concrete or template type discovered by scanning.
#[derive(Clone)]
pub struct CandidateType {
	pub expr: TypeExpr,
	pub params: Vec<TypeParam>,
	pub shapes: Vec<ShapeImpl>,
	pub role: TypeRole,
	pub markers: Vec<TypeName>,
	pub bases: Vec<TypeExpr>,
	pub cross_constraints: Vec<CrossConstraint>,
	pub module: TypeName,
}

impl CandidateType {
	pub fn new(expr: TypeExpr, role: TypeRole) -> Self {
		Self {
			expr,
			params: vec![],
			shapes: vec![],
			role,
			markers: vec![],
			bases: vec![],
			cross_constraints: vec![],
			module: TypeName::Borrowed(""),
		}
	}

	pub fn request<R: crate::message::TRequest>() -> Self {
		Self::new(R::type_expr(), TypeRole::Request { response: <R::Response as Reflect>::type_expr() })
	}

	pub fn notification<N: crate::message::TNotification>() -> Self {
		Self::new(N::type_expr(), TypeRole::Notification)
	}

	pub fn stream_request<S: crate::message::TStreamRequest>() -> Self {
		Self::new(S::type_expr(), TypeRole::StreamRequest { item: <S::Item as Reflect>::type_expr() })
	}

	pub fn exception<X: crate::responses::TExceptionType>() -> Self {
		let parent = X::parent().map(|kind| kind.type_expr());
		let mut candidate = Self::new(X::type_expr(), TypeRole::Exception { parent: parent.clone() });
		candidate.bases.extend(parent);
		candidate
	}

	pub fn interface<T: Reflect>() -> Self {
		Self::new(T::type_expr(), TypeRole::Interface)
	}

	pub fn plain<T: Reflect>() -> Self {
		Self::new(T::type_expr(), TypeRole::Plain)
	}

	pub fn base(mut self, base: TypeExpr) -> Self {
		self.bases.push(base);
		self
	}

	pub fn marker(mut self, marker: impl Into<TypeName>) -> Self {
		self.markers.push(marker.into());
		self
	}

	/// Shape whose component takes the erased message as it is dispatched.
	pub fn implements(mut self, shape: ShapeInstance, activator: Activator) -> Self {
		self.shapes.push(ShapeImpl { shape, activator, typed: false });
		self
	}

	/// Shape whose component only accepts the exact message type it declares.
	pub fn implements_typed(mut self, shape: ShapeInstance, activator: Activator) -> Self {
		self.shapes.push(ShapeImpl { shape, activator, typed: true });
		self
	}

	pub fn is_template(&self) -> bool {
		!self.params.is_empty()
	}

	pub fn name(&self) -> String {
		self.expr.to_string()
	}
}

impl fmt::Debug for CandidateType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CandidateType")
			.field("expr", &self.expr)
			.field("role", &self.role)
			.field("shapes", &self.shapes.iter().map(|s| &s.shape).collect::<Vec<_>>())
			.field("module", &self.module)
			.finish()
	}
}

/// Scanned types, indexed by their closed type expression.
#[derive(Default)]
pub struct TypeCatalog {
	types: Vec<CandidateType>,
	index: HashMap<TypeExpr, usize>,
}

impl TypeCatalog {
	pub fn new(types: Vec<CandidateType>) -> Self {
		let mut index = HashMap::new();
		for (i, ty) in types.iter().enumerate() {
			if !ty.is_template() {
				index.entry(ty.expr.clone()).or_insert(i);
			}
		}
		Self { types, index }
	}

	pub fn get(&self, expr: &TypeExpr) -> Option<&CandidateType> {
		self.index.get(expr).map(|i| &self.types[*i])
	}

	pub fn iter(&self) -> impl Iterator<Item = &CandidateType> {
		self.types.iter()
	}

	pub fn closed(&self) -> impl Iterator<Item = &CandidateType> {
		self.types.iter().filter(|ty| !ty.is_template())
	}

	pub fn templates(&self) -> impl Iterator<Item = &CandidateType> {
		self.types.iter().filter(|ty| ty.is_template())
	}

	/// Every request in the catalog with its response type.
	pub fn requests(&self) -> impl Iterator<Item = (&TypeExpr, &TypeExpr)> {
		self.closed().filter_map(|ty| match &ty.role {
			TypeRole::Request { response } => Some((&ty.expr, response)),
			_ => None,
		})
	}

	pub fn stream_requests(&self) -> impl Iterator<Item = (&TypeExpr, &TypeExpr)> {
		self.closed().filter_map(|ty| match &ty.role {
			TypeRole::StreamRequest { item } => Some((&ty.expr, item)),
			_ => None,
		})
	}

	pub fn with_role(&self, role: RoleKind) -> impl Iterator<Item = &CandidateType> {
		self.closed().filter(move |ty| ty.role.kind() == Some(role))
	}

	pub fn is_interface(&self, expr: &TypeExpr) -> bool {
		self.get(expr).is_some_and(|ty| ty.role == TypeRole::Interface)
	}

	/// `concrete` is `target` or reaches it through declared bases.
	pub fn is_assignable(&self, concrete: &TypeExpr, target: &TypeExpr) -> bool {
		let mut visited = HashSet::new();
		let mut pending = vec![concrete];
		while let Some(current) = pending.pop() {
			if current == target {
				return true;
			}
			if !visited.insert(current) {
				continue;
			}
			if let Some(ty) = self.get(current) {
				pending.extend(ty.bases.iter());
			}
		}
		false
	}

	pub fn satisfies(&self, concrete: &TypeExpr, param: &TypeParam) -> bool {
		param.constraints.iter().all(|constraint| match constraint {
			TypeConstraint::Role(role) => self.get(concrete).is_some_and(|ty| ty.role.kind() == Some(*role)),
			TypeConstraint::Marker(marker) => self.get(concrete).is_some_and(|ty| ty.markers.contains(marker)),
			TypeConstraint::AssignableTo(target) => self.is_assignable(concrete, target),
		})
	}

	pub fn len(&self) -> usize {
		self.types.len()
	}

	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn named(name: &'static str) -> TypeExpr {
		TypeExpr::named(name)
	}

	#[test]
	fn test_shape_arity_is_enforced() {
		let err = ShapeInstance::new(ShapeKind::RequestExceptionHandler, vec![named("Ping"), named("Pong")]).unwrap_err();
		assert!(matches!(err, ConfigurationError::ShapeArity { expected: 3, actual: 2, .. }));
		assert!(ShapeInstance::new(ShapeKind::NotificationHandler, vec![named("Ping")]).is_ok());
	}

	#[test]
	fn test_void_handler_normalizes_to_unit_response() {
		let shape = ShapeInstance::void_request_handler(named("Ping"));
		assert_eq!(shape.normalized(), ShapeInstance::request_handler(named("Ping"), <()>::type_expr()));
		assert_eq!(shape.normalized().to_string(), "RequestHandler<Ping, ()>");
	}

	#[test]
	fn test_assignability_is_transitive() {
		let catalog = TypeCatalog::new(vec![
			CandidateType::new(named("Auditable"), TypeRole::Interface),
			CandidateType::new(named("UserEvent"), TypeRole::Interface).base(named("Auditable")),
			CandidateType::new(named("UserCreated"), TypeRole::Notification).base(named("UserEvent")),
		]);
		assert!(catalog.is_assignable(&named("UserCreated"), &named("Auditable")));
		assert!(!catalog.is_assignable(&named("Auditable"), &named("UserCreated")));
		assert!(catalog.is_interface(&named("UserEvent")));
		assert!(!catalog.is_interface(&named("UserCreated")));
	}

	#[test]
	fn test_constraints_need_catalog_attributes() {
		let catalog = TypeCatalog::new(vec![CandidateType::new(named("UserCreated"), TypeRole::Notification).marker("audited")]);
		let param = TypeParam::new("T")
			.constrained(TypeConstraint::Role(RoleKind::Notification))
			.constrained(TypeConstraint::Marker("audited".into()));

		assert!(catalog.satisfies(&named("UserCreated"), &param));
		assert!(!catalog.satisfies(&named("Unknown"), &param));
		assert!(catalog.satisfies(&named("Unknown"), &TypeParam::new("T")));
	}
}

use crate::reflect::{Reflect, TypeExpr};
use downcast_rs::{impl_downcast, Downcast};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Kind of an exception in the exception hierarchy.
///
/// Kinds without a parent derive directly from the implicit root. Abstract kinds that are never
/// raised themselves, such as [DispatchFault], only need `Reflect` and this trait.
pub trait TExceptionType: Reflect + Send + Sync + 'static {
	fn parent() -> Option<ExceptionKind>
	where
		Self: Sized,
	{
		None
	}
}

#[derive(Clone, Copy)]
pub struct ExceptionKind {
	expr: fn() -> TypeExpr,
	parent: fn() -> Option<ExceptionKind>,
}

impl ExceptionKind {
	// Guards against cyclic parent declarations.
	const MAX_DEPTH: usize = 64;

	pub fn of<X: TExceptionType>() -> Self {
		Self {
			expr: X::type_expr,
			parent: X::parent,
		}
	}

	pub fn type_expr(&self) -> TypeExpr {
		(self.expr)()
	}

	pub fn parent(&self) -> Option<ExceptionKind> {
		(self.parent)()
	}

	/// This kind followed by its ancestors, most specific first. The root is not included.
	pub fn lineage(&self) -> Vec<TypeExpr> {
		let mut lineage = vec![self.type_expr()];
		let mut current = self.parent();
		while let Some(kind) = current {
			let expr = kind.type_expr();
			if lineage.contains(&expr) || lineage.len() >= Self::MAX_DEPTH {
				break;
			}
			lineage.push(expr);
			current = kind.parent();
		}
		lineage
	}
}

impl fmt::Debug for ExceptionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.type_expr())
	}
}

/// Raisable exception. Implemented for every error type that declares its [TExceptionType].
pub trait TException: std::error::Error + Send + Sync + Downcast {
	fn kind(&self) -> ExceptionKind;
}
impl_downcast!(TException);

impl<X> TException for X
where
	X: TExceptionType + std::error::Error,
{
	fn kind(&self) -> ExceptionKind {
		ExceptionKind::of::<X>()
	}
}

/// Fault raised while dispatching. It owns the original exception so callers can still match on
/// its concrete type.
pub struct Fault(Box<dyn TException>);

impl Fault {
	pub fn new<X: TException>(exception: X) -> Self {
		Self(Box::new(exception))
	}

	pub fn kind(&self) -> ExceptionKind {
		self.0.kind()
	}

	pub fn is<X: TException>(&self) -> bool {
		self.0.is::<X>()
	}

	pub fn downcast_ref<X: TException>(&self) -> Option<&X> {
		self.0.downcast_ref::<X>()
	}

	pub fn downcast<X: TException>(self) -> Result<X, Self> {
		self.0.downcast::<X>().map(|exception| *exception).map_err(Self)
	}

	pub fn into_inner(self) -> Box<dyn TException> {
		self.0
	}

	pub fn as_exception(&self) -> &dyn TException {
		self.0.as_ref()
	}
}

impl<X: TException> From<X> for Fault {
	fn from(exception: X) -> Self {
		Self::new(exception)
	}
}

impl fmt::Debug for Fault {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}({:?})", self.kind().type_expr(), self.0)
	}
}

impl fmt::Display for Fault {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.0, f)
	}
}

/// Abstract parent of the faults raised by the dispatcher itself.
#[derive(Debug)]
pub struct DispatchFault;

#[derive(Debug, Error)]
#[error("no handler registered for {contract}")]
pub struct HandlerNotFound {
	pub contract: String,
}

#[derive(Debug, Error)]
#[error("dispatch carried a value that is not `{expected}`")]
pub struct TypeMismatch {
	pub expected: &'static str,
}

#[derive(Debug, Error)]
#[error("could not activate `{implementation}`: {reason}")]
pub struct ActivationFailed {
	pub implementation: String,
	pub reason: String,
}

#[derive(Debug, Error)]
#[error("operation was cancelled")]
pub struct Cancelled;

/// Every failure of a concurrent publish, in handler order.
#[derive(Debug, Error)]
#[error("{} notification handler(s) failed", .0.len())]
pub struct AggregateFault(pub Vec<Fault>);

crate::reflect_named!(
	DispatchFault => "courier::DispatchFault",
	HandlerNotFound => "courier::HandlerNotFound",
	TypeMismatch => "courier::TypeMismatch",
	ActivationFailed => "courier::ActivationFailed",
	Cancelled => "courier::Cancelled",
	AggregateFault => "courier::AggregateFault",
);

crate::exception_kinds!(
	DispatchFault,
	HandlerNotFound => DispatchFault,
	TypeMismatch => DispatchFault,
	ActivationFailed => DispatchFault,
	Cancelled,
	AggregateFault,
);

/// Setup failures. These stop the mediator from being built.
#[derive(Debug, Error)]
pub enum ConfigurationError {
	#[error("no modules were supplied to scan for handlers")]
	NoModules,

	#[error("module `{module}` could not be opened: {reason}")]
	ModuleUnavailable { module: String, reason: String },

	#[error("`{template}` declares {count} type parameters, the limit is {max}")]
	TooManyTypeParameters { template: String, count: usize, max: usize },

	#[error("type parameter `{parameter}` of `{template}` has {count} candidate types, the limit is {max}")]
	TooManyTypesClosing { template: String, parameter: String, count: usize, max: usize },

	#[error("closing `{template}` needs {count} combinations, the limit is {max}")]
	TooManyCombinations { template: String, count: usize, max: usize },

	#[error("closing generic handlers exceeded the registration timeout of {0:?}")]
	RegistrationTimeout(Duration),

	#[error("shape `{kind}` takes {expected} type arguments, got {actual}")]
	ShapeArity { kind: &'static str, expected: usize, actual: usize },

	#[error("invalid settings: {0}")]
	Settings(#[from] serde_json::Error),
}

/// Failure to build a component instance from its bindings.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ActivationError(pub String);

impl ActivationError {
	pub fn new(reason: impl Into<String>) -> Self {
		Self(reason.into())
	}
}

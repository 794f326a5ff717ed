//! # Type expressions
//! Every message, response and handler that takes part in registration is described by a
//! [TypeExpr]. A type expression is either a free type parameter or a named type carrying its
//! type arguments, so `Envelope<Vec<T>>` is written as
//!
//! ```ignore
//! TypeExpr::generic("Envelope", [TypeExpr::generic("std::vec::Vec", [TypeExpr::param("T")])]);
//! ```
//!
//! Concrete Rust types expose their expression through [Reflect].

pub mod unify;

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

pub use unify::*;

pub type TypeName = Cow<'static, str>;

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeExpr {
	/// Free type parameter, bound by closing or unification.
	Param(TypeName),
	Named { name: TypeName, args: Vec<TypeExpr> },
}

impl TypeExpr {
	pub fn param(name: impl Into<TypeName>) -> Self {
		Self::Param(name.into())
	}

	pub fn named(name: impl Into<TypeName>) -> Self {
		Self::Named { name: name.into(), args: vec![] }
	}

	pub fn generic(name: impl Into<TypeName>, args: impl IntoIterator<Item = TypeExpr>) -> Self {
		Self::Named {
			name: name.into(),
			args: args.into_iter().collect(),
		}
	}

	pub fn of<T: Reflect>() -> Self {
		T::type_expr()
	}

	pub fn is_param(&self) -> bool {
		matches!(self, Self::Param(_))
	}

	/// True when a free parameter occurs anywhere in the expression.
	pub fn is_open(&self) -> bool {
		match self {
			Self::Param(_) => true,
			Self::Named { args, .. } => args.iter().any(TypeExpr::is_open),
		}
	}

	pub fn name(&self) -> &str {
		match self {
			Self::Param(name) | Self::Named { name, .. } => name,
		}
	}

	pub fn args(&self) -> &[TypeExpr] {
		match self {
			Self::Param(_) => &[],
			Self::Named { args, .. } => args,
		}
	}

	pub fn arity(&self) -> usize {
		self.args().len()
	}

	/// Both expressions are built from the same generic definition: same name and same arity.
	pub fn same_definition(&self, other: &TypeExpr) -> bool {
		match (self, other) {
			(Self::Named { name: a, args: a_args }, Self::Named { name: b, args: b_args }) => a == b && a_args.len() == b_args.len(),
			_ => false,
		}
	}

	/// Free parameters in order of first occurrence.
	pub fn free_params(&self) -> Vec<TypeName> {
		let mut found = vec![];
		self.collect_params(&mut found);
		found
	}

	fn collect_params(&self, found: &mut Vec<TypeName>) {
		match self {
			Self::Param(name) => {
				if !found.contains(name) {
					found.push(name.clone())
				}
			}
			Self::Named { args, .. } => args.iter().for_each(|arg| arg.collect_params(found)),
		}
	}

	/// Replaces every free parameter by its binding. Returns the first unbound parameter name on failure.
	pub fn substitute(&self, bindings: &Bindings) -> Result<TypeExpr, TypeName> {
		match self {
			Self::Param(name) => bindings.get(name).cloned().ok_or_else(|| name.clone()),
			Self::Named { name, args } => Ok(Self::Named {
				name: name.clone(),
				args: args.iter().map(|arg| arg.substitute(bindings)).collect::<Result<_, _>>()?,
			}),
		}
	}

	fn short_name(&self) -> &str {
		// names taken from `std::any::type_name` may carry their own generic arguments
		let name = self.name().split('<').next().unwrap_or_default();
		name.rsplit("::").next().unwrap_or(name)
	}
}

impl fmt::Display for TypeExpr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Param(name) => write!(f, "{name}"),
			Self::Named { args, .. } if args.is_empty() => write!(f, "{}", self.short_name()),
			Self::Named { args, .. } => {
				write!(f, "{}<", self.short_name())?;
				for (i, arg) in args.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{arg}")?;
				}
				write!(f, ">")
			}
		}
	}
}

impl fmt::Debug for TypeExpr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

/// Static description of a Rust type as a [TypeExpr].
pub trait Reflect {
	fn type_expr() -> TypeExpr
	where
		Self: Sized;
}

crate::reflect_named!(
	() => "()",
	bool => "bool",
	char => "char",
	i8 => "i8",
	i16 => "i16",
	i32 => "i32",
	i64 => "i64",
	i128 => "i128",
	isize => "isize",
	u8 => "u8",
	u16 => "u16",
	u32 => "u32",
	u64 => "u64",
	u128 => "u128",
	usize => "usize",
	f32 => "f32",
	f64 => "f64",
	String => "std::string::String",
	&'static str => "&str",
);

impl<T: Reflect> Reflect for Vec<T> {
	fn type_expr() -> TypeExpr {
		TypeExpr::generic("std::vec::Vec", [T::type_expr()])
	}
}

impl<T: Reflect> Reflect for Option<T> {
	fn type_expr() -> TypeExpr {
		TypeExpr::generic("std::option::Option", [T::type_expr()])
	}
}

impl<T: Reflect> Reflect for Box<T> {
	fn type_expr() -> TypeExpr {
		TypeExpr::generic("std::boxed::Box", [T::type_expr()])
	}
}

impl<T: Reflect> Reflect for Arc<T> {
	fn type_expr() -> TypeExpr {
		TypeExpr::generic("std::sync::Arc", [T::type_expr()])
	}
}

impl<T: Reflect, E: Reflect> Reflect for Result<T, E> {
	fn type_expr() -> TypeExpr {
		TypeExpr::generic("std::result::Result", [T::type_expr(), E::type_expr()])
	}
}

impl<K: Reflect, V: Reflect, S> Reflect for HashMap<K, V, S> {
	fn type_expr() -> TypeExpr {
		TypeExpr::generic("std::collections::HashMap", [K::type_expr(), V::type_expr()])
	}
}

impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
	fn type_expr() -> TypeExpr {
		TypeExpr::generic("std::collections::BTreeMap", [K::type_expr(), V::type_expr()])
	}
}

impl<A: Reflect, B: Reflect> Reflect for (A, B) {
	fn type_expr() -> TypeExpr {
		TypeExpr::generic("(,)", [A::type_expr(), B::type_expr()])
	}
}

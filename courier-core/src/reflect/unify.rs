//! ### Type unification
//! Binds the free parameters of a declared pattern by matching it against a concrete type.
//!
//! - a free parameter binds to the concrete type, or must equal what it is already bound to
//! - a constructed generic requires the same definition and recurses into each argument pair
//! - anything else requires exact equality

use super::{TypeExpr, TypeName};
use crate::responses::ActivationError;
use std::fmt;

/// Binding map from free type parameter names to concrete types, in binding order.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Bindings(Vec<(TypeName, TypeExpr)>);

impl Bindings {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, name: &str) -> Option<&TypeExpr> {
		self.0.iter().find(|(param, _)| param == name).map(|(_, ty)| ty)
	}

	/// Binding of `name` for an activator, which cannot build its component without it.
	pub fn require(&self, name: &str) -> Result<&TypeExpr, ActivationError> {
		self.get(name).ok_or_else(|| ActivationError::new(format!("type parameter `{name}` is not bound")))
	}

	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	/// Binds `name`, replacing a previous binding.
	pub fn bind(&mut self, name: impl Into<TypeName>, ty: TypeExpr) {
		let name = name.into();
		match self.0.iter_mut().find(|(param, _)| *param == name) {
			Some((_, bound)) => *bound = ty,
			None => self.0.push((name, ty)),
		}
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&TypeName, &TypeExpr)> {
		self.0.iter().map(|(param, ty)| (param, ty))
	}

	/// Parameters among `params` that have no binding yet.
	pub fn missing<'a>(&self, params: impl IntoIterator<Item = &'a TypeName>) -> Vec<TypeName> {
		params.into_iter().filter(|param| !self.contains(param)).cloned().collect()
	}
}

impl FromIterator<(TypeName, TypeExpr)> for Bindings {
	fn from_iter<I: IntoIterator<Item = (TypeName, TypeExpr)>>(iter: I) -> Self {
		let mut bindings = Bindings::new();
		iter.into_iter().for_each(|(name, ty)| bindings.bind(name, ty));
		bindings
	}
}

impl fmt::Debug for Bindings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.iter().map(|(name, ty)| (name.as_ref(), ty))).finish()
	}
}

/// Unifies `pattern` against `concrete`.
///
/// On success the new bindings are merged into `bindings`. On failure `bindings` is left untouched.
pub fn try_unify(pattern: &TypeExpr, concrete: &TypeExpr, bindings: &mut Bindings) -> bool {
	let mut scratch = bindings.clone();
	if unify_into(pattern, concrete, &mut scratch) {
		*bindings = scratch;
		true
	} else {
		false
	}
}

fn unify_into(pattern: &TypeExpr, concrete: &TypeExpr, bindings: &mut Bindings) -> bool {
	match pattern {
		TypeExpr::Param(name) => match bindings.get(name) {
			Some(bound) => bound == concrete,
			None => {
				bindings.bind(name.clone(), concrete.clone());
				true
			}
		},
		TypeExpr::Named { args, .. } if !args.is_empty() => {
			pattern.same_definition(concrete) && args.iter().zip(concrete.args()).all(|(pattern_arg, concrete_arg)| unify_into(pattern_arg, concrete_arg, bindings))
		}
		_ => pattern == concrete,
	}
}

//! ### Generic closing
//! Closes a template against the concrete types of the catalog.
//!
//! 1. For every free parameter collect the pool of catalog types satisfying its constraints.
//! 2. Check the limits. Nothing is enumerated when one of them is exceeded.
//! 3. Walk the Cartesian product of the pools and [construct] one closed type per assignment.
//!
//! A combination that cannot be constructed is skipped. Limit and timeout violations fail the
//! whole registration.

use super::{Activator, CandidateType, ShapeImpl, ShapeInstance, TypeCatalog};
use crate::reflect::{Bindings, TypeExpr, TypeName};
use crate::responses::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosingLimits {
	/// Templates with more free parameters are rejected.
	pub max_generic_type_parameters: usize,
	/// Largest candidate pool allowed for a single parameter.
	pub max_types_closing: usize,
	/// Largest Cartesian product allowed for a single template.
	pub max_generic_type_registrations: usize,
	pub registration_timeout_ms: u64,
}

impl Default for ClosingLimits {
	fn default() -> Self {
		Self {
			max_generic_type_parameters: 10,
			max_types_closing: 100,
			max_generic_type_registrations: 125_000,
			registration_timeout_ms: 15_000,
		}
	}
}

impl ClosingLimits {
	pub fn registration_timeout(&self) -> Duration {
		Duration::from_millis(self.registration_timeout_ms)
	}

	/// Validates a template and its pools before any combination is attempted.
	/// Returns the number of combinations to enumerate.
	pub fn check(&self, template: &CandidateType, pools: &[Vec<TypeExpr>]) -> Result<usize, ConfigurationError> {
		if template.params.len() > self.max_generic_type_parameters {
			return Err(ConfigurationError::TooManyTypeParameters {
				template: template.name(),
				count: template.params.len(),
				max: self.max_generic_type_parameters,
			});
		}
		if let Some((param, pool)) = template.params.iter().zip(pools).find(|(_, pool)| pool.len() > self.max_types_closing) {
			return Err(ConfigurationError::TooManyTypesClosing {
				template: template.name(),
				parameter: param.name.to_string(),
				count: pool.len(),
				max: self.max_types_closing,
			});
		}
		let combinations = pools.iter().try_fold(1usize, |acc, pool| acc.checked_mul(pool.len())).unwrap_or(usize::MAX);
		if combinations > self.max_generic_type_registrations {
			return Err(ConfigurationError::TooManyCombinations {
				template: template.name(),
				count: combinations,
				max: self.max_generic_type_registrations,
			});
		}
		Ok(combinations)
	}
}

/// Closed contract and closed implementation, ready for the registry.
#[derive(Clone)]
pub struct ClosedRegistration {
	pub contract: ShapeInstance,
	pub implementation: TypeExpr,
	pub bindings: Bindings,
	pub activator: Activator,
	/// False when the contract was reached through an interface the implementation declared.
	pub exact: bool,
}

impl ClosedRegistration {
	pub fn new(contract: ShapeInstance, implementation: TypeExpr, activator: Activator) -> Self {
		Self {
			contract,
			implementation,
			bindings: Bindings::new(),
			activator,
			exact: true,
		}
	}
}

impl fmt::Debug for ClosedRegistration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClosedRegistration")
			.field("contract", &self.contract)
			.field("implementation", &self.implementation)
			.field("bindings", &self.bindings)
			.field("exact", &self.exact)
			.finish()
	}
}

#[derive(Debug, Default)]
pub struct ClosingReport {
	pub registrations: Vec<ClosedRegistration>,
	/// Combinations enumerated.
	pub attempted: usize,
	/// Combinations that failed to construct.
	pub rejected: usize,
}

#[derive(Debug, Error)]
pub enum ConstructError {
	#[error("`{parameter}` is not bound")]
	Unbound { parameter: TypeName },
	#[error("`{ty}` does not satisfy the constraints of `{parameter}`")]
	Unsatisfied { parameter: TypeName, ty: TypeExpr },
	#[error("{0}")]
	CrossConstraint(String),
}

/// Per-parameter pools: the closed catalog types satisfying each parameter's constraints.
pub fn candidate_pools(template: &CandidateType, catalog: &TypeCatalog) -> Vec<Vec<TypeExpr>> {
	template
		.params
		.iter()
		.map(|param| catalog.closed().filter(|ty| catalog.satisfies(&ty.expr, param)).map(|ty| ty.expr.clone()).collect())
		.collect()
}

/// Closes `template` over the Cartesian product of `pools`.
///
/// `deadline` bounds the whole registration pass, not only this template.
pub fn close_template(template: &CandidateType, pools: &[Vec<TypeExpr>], limits: &ClosingLimits, deadline: Instant, catalog: &TypeCatalog) -> Result<ClosingReport, ConfigurationError> {
	limits.check(template, pools)?;

	let mut report = ClosingReport::default();
	if pools.iter().any(Vec::is_empty) {
		return Ok(report);
	}

	let mut odometer = vec![0usize; pools.len()];
	loop {
		if Instant::now() >= deadline {
			return Err(ConfigurationError::RegistrationTimeout(limits.registration_timeout()));
		}

		let bindings: Bindings = template.params.iter().zip(&odometer).zip(pools).map(|((param, i), pool)| (param.name.clone(), pool[*i].clone())).collect();
		report.attempted += 1;

		match construct(template, &template.shapes, &bindings, catalog) {
			Ok(registrations) => report.registrations.extend(registrations),
			Err(err) => {
				report.rejected += 1;
				tracing::debug!(template = %template.expr, ?bindings, %err, "skipping combination");
			}
		}

		if !advance(&mut odometer, pools) {
			break;
		}
	}
	Ok(report)
}

fn advance(odometer: &mut [usize], pools: &[Vec<TypeExpr>]) -> bool {
	for (digit, pool) in odometer.iter_mut().zip(pools).rev() {
		*digit += 1;
		if *digit < pool.len() {
			return true;
		}
		*digit = 0;
	}
	false
}

/// Builds the closed registrations of `shapes` for one complete assignment of the template's
/// parameters. Constraints are validated here again, including cross-parameter ones.
pub fn construct(template: &CandidateType, shapes: &[ShapeImpl], bindings: &Bindings, catalog: &TypeCatalog) -> Result<Vec<ClosedRegistration>, ConstructError> {
	for param in &template.params {
		let ty = bindings.get(&param.name).ok_or_else(|| ConstructError::Unbound { parameter: param.name.clone() })?;
		if !catalog.satisfies(ty, param) {
			return Err(ConstructError::Unsatisfied {
				parameter: param.name.clone(),
				ty: ty.clone(),
			});
		}
	}
	for constraint in &template.cross_constraints {
		constraint(bindings, catalog).map_err(ConstructError::CrossConstraint)?;
	}

	let implementation = template.expr.substitute(bindings).map_err(|parameter| ConstructError::Unbound { parameter })?;
	shapes
		.iter()
		.map(|shape| {
			Ok(ClosedRegistration {
				contract: shape.shape.substitute(bindings).map_err(|parameter| ConstructError::Unbound { parameter })?,
				implementation: implementation.clone(),
				bindings: bindings.clone(),
				activator: shape.activator.clone(),
				exact: true,
			})
		})
		.collect()
}

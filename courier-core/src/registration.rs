//! ### Registration
//! Turns the scanned catalog and the configured behaviors into a frozen [Registry].
//!
//! - Single-response contracts (request and stream handlers) keep one default resolution. When
//!   several implementations match, only exact matches survive; without any, the contract is
//!   rejected rather than guessed.
//! - Every other contract keeps all of its matches.
//! - Templates are closed only when generic handler registration is enabled. Their single-response
//!   contracts never replace a registration that already exists.
//! - Open behaviors are unified against each request of the catalog, in configuration order.

use crate::catalog::closing::{candidate_pools, close_template, construct, ClosedRegistration};
use crate::catalog::matcher::find_closing_types;
use crate::catalog::scanner::scan;
use crate::catalog::{CandidateType, ShapeInstance, ShapeKind, TypeCatalog};
use crate::config::{BehaviorEntry, MediatorConfiguration};
use crate::reflect::{try_unify, Bindings, TypeExpr};
use crate::registry::{Lifetime, Registry, RegistryBuilder};
use crate::responses::ConfigurationError;
use std::time::Instant;

const SINGLE_KINDS: [ShapeKind; 3] = [ShapeKind::RequestHandler, ShapeKind::VoidRequestHandler, ShapeKind::StreamRequestHandler];
const MULTI_KINDS: [ShapeKind; 5] = [
	ShapeKind::NotificationHandler,
	ShapeKind::RequestPreProcessor,
	ShapeKind::RequestPostProcessor,
	ShapeKind::RequestExceptionHandler,
	ShapeKind::RequestExceptionAction,
];

pub fn register(config: &MediatorConfiguration) -> Result<Registry, ConfigurationError> {
	let started = Instant::now();
	let deadline = started + config.limits.registration_timeout();
	let catalog = TypeCatalog::new(scan(&config.modules, config.predicate.as_ref())?);
	let mut builder = RegistryBuilder::new();

	let single: Vec<ClosedRegistration> = SINGLE_KINDS.iter().flat_map(|kind| find_closing_types(*kind, &catalog)).collect();
	for (contract, group) in group_by_contract(single) {
		register_single(&mut builder, config, &contract, group);
	}
	for kind in MULTI_KINDS {
		for registration in find_closing_types(kind, &catalog) {
			add_unique(&mut builder, config, registration);
		}
	}

	if config.register_generic_handlers {
		for template in catalog.templates() {
			let mut handlers = template.clone();
			handlers.shapes.retain(|implemented| !implemented.shape.kind().is_behavior());
			if handlers.shapes.is_empty() {
				continue;
			}
			let pools = candidate_pools(&handlers, &catalog);
			let report = close_template(&handlers, &pools, &config.limits, deadline, &catalog)?;
			tracing::debug!(template = %template.expr, attempted = report.attempted, rejected = report.rejected, "template closed");

			for registration in report.registrations {
				if registration.contract.kind().allows_multiple() {
					add_unique(&mut builder, config, registration);
				} else {
					let lifetime = config.lifetime_of_implementation(&registration.implementation);
					builder.try_add(registration, lifetime);
				}
			}
		}
	}

	register_behaviors(&mut builder, &config.behaviors, ShapeKind::PipelineBehavior, &catalog);
	register_behaviors(&mut builder, &config.stream_behaviors, ShapeKind::StreamPipelineBehavior, &catalog);

	if Instant::now() >= deadline {
		return Err(ConfigurationError::RegistrationTimeout(config.limits.registration_timeout()));
	}
	tracing::info!(types = catalog.len(), registrations = builder.len(), elapsed = ?started.elapsed(), "handler registration complete");
	Ok(builder.freeze())
}

fn group_by_contract(registrations: Vec<ClosedRegistration>) -> Vec<(ShapeInstance, Vec<ClosedRegistration>)> {
	let mut groups: Vec<(ShapeInstance, Vec<ClosedRegistration>)> = vec![];
	for registration in registrations {
		let contract = registration.contract.normalized();
		match groups.iter_mut().find(|(existing, _)| *existing == contract) {
			Some((_, group)) => group.push(registration),
			None => groups.push((contract, vec![registration])),
		}
	}
	groups
}

fn register_single(builder: &mut RegistryBuilder, config: &MediatorConfiguration, contract: &ShapeInstance, mut group: Vec<ClosedRegistration>) {
	if group.len() > 1 {
		group.retain(|registration| registration.exact);
		if group.is_empty() {
			tracing::warn!(%contract, "ambiguous handlers and none declared for the exact message, contract rejected");
			return;
		}
	}
	for registration in group {
		let lifetime = config.lifetime_of_implementation(&registration.implementation);
		builder.add(registration, lifetime);
	}
}

fn add_unique(builder: &mut RegistryBuilder, config: &MediatorConfiguration, registration: ClosedRegistration) {
	if builder.contains_implementation(&registration.contract.normalized(), &registration.implementation) {
		return;
	}
	let lifetime = config.lifetime_of_implementation(&registration.implementation);
	builder.add(registration, lifetime);
}

fn register_behaviors(builder: &mut RegistryBuilder, behaviors: &[(BehaviorEntry, Lifetime)], kind: ShapeKind, catalog: &TypeCatalog) {
	for (entry, lifetime) in behaviors {
		match entry {
			BehaviorEntry::Closed(registration) => builder.add(registration.clone(), *lifetime),
			BehaviorEntry::Open(template) => {
				for registration in close_open_behavior(template, catalog, kind) {
					builder.add(registration, *lifetime);
				}
			}
		}
	}
}

/// Closes an open behavior against every request of the catalog (every stream request for stream
/// behaviors) whose request and response types unify with the behavior's shape.
///
/// Requests that do not unify, or whose bindings leave a parameter unbound or violate a
/// constraint, are skipped.
pub fn close_open_behavior(template: &CandidateType, catalog: &TypeCatalog, kind: ShapeKind) -> Vec<ClosedRegistration> {
	let targets: Vec<(&TypeExpr, &TypeExpr)> = match kind {
		ShapeKind::PipelineBehavior => catalog.requests().collect(),
		ShapeKind::StreamPipelineBehavior => catalog.stream_requests().collect(),
		_ => return vec![],
	};

	let mut closed = vec![];
	for implemented in template.shapes.iter().filter(|implemented| implemented.shape.kind() == kind) {
		let [request_pattern, response_pattern] = implemented.shape.args() else {
			continue;
		};
		for (request, response) in &targets {
			let mut bindings = Bindings::new();
			if !try_unify(request_pattern, request, &mut bindings) || !try_unify(response_pattern, response, &mut bindings) {
				continue;
			}
			match construct(template, std::slice::from_ref(implemented), &bindings, catalog) {
				Ok(registrations) => closed.extend(registrations),
				Err(err) => tracing::debug!(behavior = %template.expr, %request, %err, "behavior does not apply"),
			}
		}
	}
	closed
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::module::Template;
	use crate::catalog::{TypeParam, TypeRole};
	use crate::prelude::{ActivationError, Service};

	fn named(name: &'static str) -> TypeExpr {
		TypeExpr::named(name)
	}

	fn result_like(inner: TypeExpr) -> TypeExpr {
		TypeExpr::generic("ResultLike", [inner])
	}

	fn inert(_: &Bindings) -> Result<Service, ActivationError> {
		Err(ActivationError::new("inert"))
	}

	#[test]
	fn test_open_behavior_binds_nested_response_parameter() {
		let catalog = TypeCatalog::new(vec![
			CandidateType::new(named("GetName"), TypeRole::Request { response: result_like(named("String")) }),
			CandidateType::new(named("GetAge"), TypeRole::Request { response: named("i32") }),
		]);
		let template = Template::new("Unwrapping")
			.param(TypeParam::new("R"))
			.param(TypeParam::new("T"))
			.implements(ShapeInstance::pipeline_behavior(TypeExpr::param("R"), result_like(TypeExpr::param("T"))), inert)
			.build();

		let closed = close_open_behavior(&template, &catalog, ShapeKind::PipelineBehavior);
		assert_eq!(closed.len(), 1);
		assert_eq!(closed[0].bindings.get("T"), Some(&named("String")));
		assert_eq!(closed[0].contract.to_string(), "PipelineBehavior<GetName, ResultLike<String>>");
		assert_eq!(closed[0].implementation.to_string(), "Unwrapping<GetName, String>");
	}

	#[test]
	fn test_open_behavior_skips_parameters_left_unbound() {
		let catalog = TypeCatalog::new(vec![CandidateType::new(named("GetAge"), TypeRole::Request { response: named("i32") })]);
		let template = Template::new("Dangling")
			.param(TypeParam::new("R"))
			.param(TypeParam::new("Extra"))
			.implements(ShapeInstance::pipeline_behavior(TypeExpr::param("R"), named("i32")), inert)
			.build();

		assert!(close_open_behavior(&template, &catalog, ShapeKind::PipelineBehavior).is_empty());
		assert!(close_open_behavior(&template, &catalog, ShapeKind::StreamPipelineBehavior).is_empty());
	}

	#[test]
	fn test_grouping_uses_normalized_contracts() {
		let activator: crate::catalog::Activator = std::sync::Arc::new(inert);
		let void = ClosedRegistration::new(ShapeInstance::void_request_handler(named("Ping")), named("A"), activator.clone());
		let unit = ClosedRegistration::new(ShapeInstance::request_handler(named("Ping"), TypeExpr::named("()")), named("B"), activator);

		let groups = group_by_contract(vec![void, unit]);
		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].1.len(), 2);
	}
}

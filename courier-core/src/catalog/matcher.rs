use super::closing::ClosedRegistration;
use super::{ShapeKind, TypeCatalog};

/// Every distinct `kind` shape instance implemented by the closed types of the catalog.
///
/// A shape whose message argument is an interface of the catalog is also offered, non-exact, for
/// every message assignable to that interface, provided its component takes erased messages.
/// Typed components and class-typed declarations only match themselves.
/// Templates are left to the [closing engine](super::closing).
pub fn find_closing_types(kind: ShapeKind, catalog: &TypeCatalog) -> Vec<ClosedRegistration> {
	let mut found: Vec<ClosedRegistration> = vec![];

	for candidate in catalog.closed() {
		for implemented in candidate.shapes.iter().filter(|implemented| implemented.shape.kind() == kind) {
			if implemented.shape.is_open() {
				tracing::debug!(candidate = %candidate.expr, shape = %implemented.shape, "closed type declares an open shape, ignored");
				continue;
			}
			push_unique(&mut found, ClosedRegistration::new(implemented.shape.clone(), candidate.expr.clone(), implemented.activator.clone()));

			let declared = implemented.shape.message();
			if !catalog.is_interface(declared) {
				continue;
			}
			if implemented.typed {
				tracing::warn!(candidate = %candidate.expr, shape = %implemented.shape, "typed component declared against an interface only serves the interface itself");
				continue;
			}
			for message in catalog.closed().filter(|ty| ty.role.kind().is_some() && ty.expr != *declared && catalog.is_assignable(&ty.expr, declared)) {
				let mut registration = ClosedRegistration::new(implemented.shape.with_message(message.expr.clone()), candidate.expr.clone(), implemented.activator.clone());
				registration.exact = false;
				push_unique(&mut found, registration);
			}
		}
	}
	found
}

fn push_unique(found: &mut Vec<ClosedRegistration>, registration: ClosedRegistration) {
	if !found.iter().any(|existing| existing.contract == registration.contract && existing.implementation == registration.implementation) {
		found.push(registration);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::{Activator, CandidateType, ShapeInstance, TypeRole};
	use crate::prelude::{ActivationError, Service};
	use crate::reflect::{Bindings, TypeExpr};
	use std::sync::Arc;

	fn named(name: &'static str) -> TypeExpr {
		TypeExpr::named(name)
	}

	fn inert() -> Activator {
		Arc::new(|_: &Bindings| -> Result<Service, ActivationError> { Err(ActivationError::new("inert")) })
	}

	fn contracts(found: &[ClosedRegistration]) -> Vec<String> {
		found.iter().map(|r| format!("{} by {}", r.contract, r.implementation)).collect()
	}

	#[test]
	fn test_one_type_handling_several_events_surfaces_each() {
		let catalog = TypeCatalog::new(vec![
			CandidateType::new(named("UserCreated"), TypeRole::Notification),
			CandidateType::new(named("UserDeleted"), TypeRole::Notification),
			CandidateType::new(named("UserProjection"), TypeRole::Plain)
				.implements(ShapeInstance::notification_handler(named("UserCreated")), inert())
				.implements(ShapeInstance::notification_handler(named("UserDeleted")), inert())
				.implements(ShapeInstance::notification_handler(named("UserCreated")), inert()),
		]);

		let found = find_closing_types(ShapeKind::NotificationHandler, &catalog);
		assert_eq!(
			contracts(&found),
			vec!["NotificationHandler<UserCreated> by UserProjection", "NotificationHandler<UserDeleted> by UserProjection"]
		);
		assert!(find_closing_types(ShapeKind::RequestHandler, &catalog).is_empty());
	}

	#[test]
	fn test_interface_declaration_is_polymorphic_class_declaration_is_exact() {
		let catalog = TypeCatalog::new(vec![
			CandidateType::new(named("Auditable"), TypeRole::Interface),
			CandidateType::new(named("BaseEvent"), TypeRole::Notification),
			CandidateType::new(named("UserCreated"), TypeRole::Notification).base(named("Auditable")).base(named("BaseEvent")),
			CandidateType::new(named("AuditTrail"), TypeRole::Plain).implements(ShapeInstance::notification_handler(named("Auditable")), inert()),
			CandidateType::new(named("BaseLogger"), TypeRole::Plain).implements(ShapeInstance::notification_handler(named("BaseEvent")), inert()),
		]);

		let found = find_closing_types(ShapeKind::NotificationHandler, &catalog);
		assert_eq!(
			contracts(&found),
			vec![
				"NotificationHandler<Auditable> by AuditTrail",
				"NotificationHandler<UserCreated> by AuditTrail",
				"NotificationHandler<BaseEvent> by BaseLogger",
			]
		);
		assert!(found[0].exact);
		assert!(!found[1].exact);
	}

	#[test]
	fn test_typed_declaration_against_interface_serves_only_the_interface() {
		let catalog = TypeCatalog::new(vec![
			CandidateType::new(named("Auditable"), TypeRole::Interface),
			CandidateType::new(named("UserCreated"), TypeRole::Notification).base(named("Auditable")),
			CandidateType::new(named("TypedTrail"), TypeRole::Plain).implements_typed(ShapeInstance::notification_handler(named("Auditable")), inert()),
		]);

		let found = find_closing_types(ShapeKind::NotificationHandler, &catalog);
		assert_eq!(contracts(&found), vec!["NotificationHandler<Auditable> by TypedTrail"]);
	}
}

//! ### Registry
//! Append-only while it is being built, read-only once frozen. Contracts are always stored
//! normalized, so a void request handler is found under `RequestHandler<R, ()>`.
//!
//! Components are built lazily by their activators, according to their [Lifetime].

use crate::bus_components::handler::Service;
use crate::catalog::closing::ClosedRegistration;
use crate::catalog::{Activator, ShapeInstance};
use crate::reflect::{Bindings, TypeExpr};
use crate::responses::{ActivationFailed, Fault};
use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
	/// New instance on every resolution.
	#[default]
	Transient,
	/// One instance per dispatch.
	Scoped,
	/// One instance per registry.
	Singleton,
}

pub struct ServiceDescriptor {
	pub contract: ShapeInstance,
	pub implementation: TypeExpr,
	pub lifetime: Lifetime,
	bindings: Bindings,
	activator: Activator,
	singleton: OnceLock<Service>,
}

impl ServiceDescriptor {
	pub fn new(registration: ClosedRegistration, lifetime: Lifetime) -> Self {
		Self {
			contract: registration.contract.normalized(),
			implementation: registration.implementation,
			lifetime,
			bindings: registration.bindings,
			activator: registration.activator,
			singleton: OnceLock::new(),
		}
	}

	fn activate(&self) -> Result<Service, Fault> {
		let service = (self.activator)(&self.bindings).map_err(|err| ActivationFailed {
			implementation: self.implementation.to_string(),
			reason: err.to_string(),
		})?;
		if !service.fits(self.contract.kind()) {
			return Err(ActivationFailed {
				implementation: self.implementation.to_string(),
				reason: format!("activator produced a {} for {}", service.variant_name(), self.contract),
			}
			.into());
		}
		Ok(service)
	}

	fn singleton(&self) -> Result<Service, Fault> {
		if let Some(service) = self.singleton.get() {
			return Ok(service.clone());
		}
		let service = self.activate()?;
		// another resolution may have won the race, keep its instance
		let _ = self.singleton.set(service.clone());
		Ok(self.singleton.get().cloned().unwrap_or(service))
	}
}

impl std::fmt::Debug for ServiceDescriptor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ServiceDescriptor")
			.field("contract", &self.contract)
			.field("implementation", &self.implementation)
			.field("lifetime", &self.lifetime)
			.finish()
	}
}

#[derive(Default)]
pub struct RegistryBuilder {
	descriptors: Vec<ServiceDescriptor>,
}

impl RegistryBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, registration: ClosedRegistration, lifetime: Lifetime) {
		let descriptor = ServiceDescriptor::new(registration, lifetime);
		tracing::debug!(contract = %descriptor.contract, implementation = %descriptor.implementation, ?lifetime, "registered");
		self.descriptors.push(descriptor);
	}

	/// Adds the registration only when nothing is registered for its contract yet.
	pub fn try_add(&mut self, registration: ClosedRegistration, lifetime: Lifetime) -> bool {
		if self.contains(&registration.contract.normalized()) {
			return false;
		}
		self.add(registration, lifetime);
		true
	}

	pub fn contains(&self, contract: &ShapeInstance) -> bool {
		self.descriptors.iter().any(|descriptor| descriptor.contract == *contract)
	}

	pub fn contains_implementation(&self, contract: &ShapeInstance, implementation: &TypeExpr) -> bool {
		self.descriptors.iter().any(|descriptor| descriptor.contract == *contract && descriptor.implementation == *implementation)
	}

	pub fn len(&self) -> usize {
		self.descriptors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.descriptors.is_empty()
	}

	pub fn freeze(self) -> Registry {
		let mut by_contract: HashMap<ShapeInstance, Vec<usize>> = HashMap::new();
		for (i, descriptor) in self.descriptors.iter().enumerate() {
			by_contract.entry(descriptor.contract.clone()).or_default().push(i);
		}
		Registry {
			inner: Arc::new(RegistryInner {
				descriptors: self.descriptors,
				by_contract,
			}),
		}
	}
}

struct RegistryInner {
	descriptors: Vec<ServiceDescriptor>,
	by_contract: HashMap<ShapeInstance, Vec<usize>>,
}

/// Frozen registry, cheap to clone.
#[derive(Clone)]
pub struct Registry {
	inner: Arc<RegistryInner>,
}

#[derive(Clone, Debug)]
pub struct Resolved {
	pub implementation: TypeExpr,
	pub service: Service,
}

impl Registry {
	/// Registrations for `contract`, in registration order.
	pub fn descriptors(&self, contract: &ShapeInstance) -> impl Iterator<Item = &ServiceDescriptor> {
		self.inner.by_contract.get(contract).into_iter().flatten().map(|i| &self.inner.descriptors[*i])
	}

	pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> {
		self.inner.descriptors.iter()
	}

	pub fn contains(&self, contract: &ShapeInstance) -> bool {
		self.inner.by_contract.contains_key(contract)
	}

	pub fn len(&self) -> usize {
		self.inner.descriptors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.descriptors.is_empty()
	}

	pub fn create_scope(&self) -> Scope {
		Scope {
			registry: self.clone(),
			instances: Arc::new(Mutex::new(HashMap::new())),
		}
	}

	/// Default resolution outside of any dispatch. Scoped components behave as transient ones.
	pub fn resolve(&self, contract: &ShapeInstance) -> Result<Option<Resolved>, Fault> {
		self.create_scope().resolve(contract)
	}
}

/// Resolution context of one dispatch.
#[derive(Clone)]
pub struct Scope {
	registry: Registry,
	instances: Arc<Mutex<HashMap<usize, Service>>>,
}

impl Scope {
	pub fn registry(&self) -> &Registry {
		&self.registry
	}

	/// The first registration of `contract`.
	pub fn resolve(&self, contract: &ShapeInstance) -> Result<Option<Resolved>, Fault> {
		let Some(i) = self.registry.inner.by_contract.get(contract).and_then(|indices| indices.first()) else {
			return Ok(None);
		};
		self.instantiate(*i).map(Some)
	}

	/// Every registration of `contract`, in registration order.
	pub fn resolve_all(&self, contract: &ShapeInstance) -> Result<Vec<Resolved>, Fault> {
		let Some(indices) = self.registry.inner.by_contract.get(contract) else {
			return Ok(vec![]);
		};
		indices.iter().map(|i| self.instantiate(*i)).collect()
	}

	fn instantiate(&self, i: usize) -> Result<Resolved, Fault> {
		let descriptor = &self.registry.inner.descriptors[i];
		let service = match descriptor.lifetime {
			Lifetime::Transient => descriptor.activate()?,
			Lifetime::Singleton => descriptor.singleton()?,
			Lifetime::Scoped => {
				let mut instances = self.instances.lock();
				match instances.get(&i) {
					Some(service) => service.clone(),
					None => {
						let service = descriptor.activate()?;
						instances.insert(i, service.clone());
						service
					}
				}
			}
		};
		Ok(Resolved {
			implementation: descriptor.implementation.clone(),
			service,
		})
	}
}

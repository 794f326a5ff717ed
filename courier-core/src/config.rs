//! ### Configuration
//! [MediatorConfiguration] gathers everything registration needs: modules to scan, the type
//! filter, closing limits, publishing strategy, exception action policy, lifetimes and the
//! explicitly registered behaviors.
//!
//! The data-only part can be loaded from JSON through [MediatorSettings]:
//! ```json
//! {
//!   "limits": { "max_types_closing": 50, "registration_timeout_ms": 5000 },
//!   "publish_strategy": "concurrent",
//!   "exception_action_policy": "always",
//!   "default_lifetime": "scoped",
//!   "register_generic_handlers": true
//! }
//! ```

use crate::bus_components::exceptions::ExceptionActionPolicy;
use crate::bus_components::handler::{Service, TPipelineBehavior, TStreamPipelineBehavior, TypedService};
use crate::bus_components::publisher::{PublishStrategyKind, TPublishStrategy};
use crate::catalog::closing::{ClosedRegistration, ClosingLimits};
use crate::catalog::module::Template;
use crate::catalog::scanner::{TTypeModule, TypePredicate};
use crate::catalog::{Activator, CandidateType, ShapeInstance};
use crate::message::{TRequest, TStreamRequest};
use crate::reflect::{Bindings, Reflect, TypeExpr};
use crate::registry::Lifetime;
use crate::responses::ConfigurationError;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Behavior registered in configuration order.
#[derive(Clone)]
pub enum BehaviorEntry {
	/// Applies to the single request of its contract.
	Closed(ClosedRegistration),
	/// Closed by unification against every request of the catalog.
	Open(CandidateType),
}

#[derive(Clone, Default)]
pub struct MediatorConfiguration {
	pub(crate) modules: Vec<Arc<dyn TTypeModule>>,
	pub(crate) predicate: Option<TypePredicate>,
	pub limits: ClosingLimits,
	pub publish_strategy: PublishStrategyKind,
	pub(crate) publisher: Option<Arc<dyn TPublishStrategy>>,
	pub exception_action_policy: ExceptionActionPolicy,
	pub default_lifetime: Lifetime,
	pub register_generic_handlers: bool,
	pub(crate) lifetimes: HashMap<String, Lifetime>,
	pub(crate) behaviors: Vec<(BehaviorEntry, Lifetime)>,
	pub(crate) stream_behaviors: Vec<(BehaviorEntry, Lifetime)>,
}

impl MediatorConfiguration {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn module(mut self, module: impl TTypeModule + 'static) -> Self {
		self.modules.push(Arc::new(module));
		self
	}

	pub fn modules(mut self, modules: impl IntoIterator<Item = Arc<dyn TTypeModule>>) -> Self {
		self.modules.extend(modules);
		self
	}

	/// Only scanned types passing `predicate` take part in registration.
	pub fn filter(mut self, predicate: impl Fn(&CandidateType) -> bool + Send + Sync + 'static) -> Self {
		self.predicate = Some(Arc::new(predicate));
		self
	}

	pub fn limits(mut self, limits: ClosingLimits) -> Self {
		self.limits = limits;
		self
	}

	pub fn publish_strategy(mut self, strategy: PublishStrategyKind) -> Self {
		self.publish_strategy = strategy;
		self
	}

	/// Strategy other than the built-in ones. Takes precedence over [Self::publish_strategy],
	/// whether it is set before or after.
	pub fn custom_publisher(mut self, publisher: impl TPublishStrategy + 'static) -> Self {
		self.publisher = Some(Arc::new(publisher));
		self
	}

	pub fn exception_action_policy(mut self, policy: ExceptionActionPolicy) -> Self {
		self.exception_action_policy = policy;
		self
	}

	pub fn default_lifetime(mut self, lifetime: Lifetime) -> Self {
		self.default_lifetime = lifetime;
		self
	}

	pub fn register_generic_handlers(mut self, enabled: bool) -> Self {
		self.register_generic_handlers = enabled;
		self
	}

	pub fn lifetime_of<H: 'static>(self, lifetime: Lifetime) -> Self {
		self.lifetime_for(std::any::type_name::<H>(), lifetime)
	}

	/// Lifetime override for an implementation, by name. Template names cover all their closed types.
	pub fn lifetime_for(mut self, implementation: impl Into<String>, lifetime: Lifetime) -> Self {
		self.lifetimes.insert(implementation.into(), lifetime);
		self
	}

	pub fn add_behavior<R: TRequest, B: TPipelineBehavior<R>>(self, factory: impl Fn() -> B + Send + Sync + 'static) -> Self {
		let lifetime = self.default_lifetime;
		self.add_behavior_with::<R, B>(factory, lifetime)
	}

	pub fn add_behavior_with<R: TRequest, B: TPipelineBehavior<R>>(mut self, factory: impl Fn() -> B + Send + Sync + 'static, lifetime: Lifetime) -> Self {
		let activator: Activator = Arc::new(move |_: &Bindings| Ok(Service::Behavior(Arc::new(TypedService::<R, B>::new(factory())))));
		let contract = ShapeInstance::pipeline_behavior(R::type_expr(), <R::Response as Reflect>::type_expr());
		let registration = ClosedRegistration::new(contract, TypeExpr::named(std::any::type_name::<B>()), activator);
		self.behaviors.push((BehaviorEntry::Closed(registration), lifetime));
		self
	}

	pub fn add_open_behavior(mut self, template: Template) -> Self {
		let lifetime = self.default_lifetime;
		self.behaviors.push((BehaviorEntry::Open(template.build()), lifetime));
		self
	}

	pub fn add_stream_behavior<S: TStreamRequest, B: TStreamPipelineBehavior<S>>(self, factory: impl Fn() -> B + Send + Sync + 'static) -> Self {
		let lifetime = self.default_lifetime;
		self.add_stream_behavior_with::<S, B>(factory, lifetime)
	}

	pub fn add_stream_behavior_with<S: TStreamRequest, B: TStreamPipelineBehavior<S>>(mut self, factory: impl Fn() -> B + Send + Sync + 'static, lifetime: Lifetime) -> Self {
		let activator: Activator = Arc::new(move |_: &Bindings| Ok(Service::StreamBehavior(Arc::new(TypedService::<S, B>::new(factory())))));
		let contract = ShapeInstance::stream_behavior(S::type_expr(), <S::Item as Reflect>::type_expr());
		let registration = ClosedRegistration::new(contract, TypeExpr::named(std::any::type_name::<B>()), activator);
		self.stream_behaviors.push((BehaviorEntry::Closed(registration), lifetime));
		self
	}

	pub fn add_open_stream_behavior(mut self, template: Template) -> Self {
		let lifetime = self.default_lifetime;
		self.stream_behaviors.push((BehaviorEntry::Open(template.build()), lifetime));
		self
	}

	pub fn settings(self, settings: MediatorSettings) -> Self {
		settings.apply(self)
	}

	pub(crate) fn lifetime_of_implementation(&self, implementation: &TypeExpr) -> Lifetime {
		self.lifetimes.get(implementation.name()).copied().unwrap_or(self.default_lifetime)
	}

	pub(crate) fn publisher(&self) -> Arc<dyn TPublishStrategy> {
		self.publisher.clone().unwrap_or_else(|| self.publish_strategy.build())
	}
}

/// Serializable part of a [MediatorConfiguration].
///
/// Absent fields leave the configuration as it is.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediatorSettings {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub limits: Option<ClosingLimits>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub publish_strategy: Option<PublishStrategyKind>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exception_action_policy: Option<ExceptionActionPolicy>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub default_lifetime: Option<Lifetime>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub register_generic_handlers: Option<bool>,
}

impl MediatorSettings {
	pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
		Ok(serde_json::from_str(json)?)
	}

	pub fn apply(self, mut config: MediatorConfiguration) -> MediatorConfiguration {
		if let Some(limits) = self.limits {
			config.limits = limits;
		}
		if let Some(strategy) = self.publish_strategy {
			config.publish_strategy = strategy;
		}
		if let Some(policy) = self.exception_action_policy {
			config.exception_action_policy = policy;
		}
		if let Some(lifetime) = self.default_lifetime {
			config.default_lifetime = lifetime;
		}
		if let Some(enabled) = self.register_generic_handlers {
			config.register_generic_handlers = enabled;
		}
		config
	}
}

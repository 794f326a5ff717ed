mod bus_components;
mod catalog;
mod config;
mod macros;
mod message;
mod reflect;
mod registration;
mod registry;
mod responses;

pub mod prelude {
	pub use crate::bus_components::contexts::CancellationSignal;
	pub use crate::bus_components::exceptions::{ExceptionActionPolicy, ExceptionResolutionChain};
	pub use crate::bus_components::handler::*;
	pub use crate::bus_components::mediator::Mediator;
	pub use crate::bus_components::pipeline::{ChainStage, ExecutionChain, StreamChain};
	pub use crate::bus_components::publisher::*;
	pub use crate::catalog::closing::{candidate_pools, close_template, construct, ClosedRegistration, ClosingLimits, ClosingReport};
	pub use crate::catalog::matcher::find_closing_types;
	pub use crate::catalog::module::{Implementation, Module, Template};
	pub use crate::catalog::scanner::{scan, TTypeModule, TypeLoad, TypeLoadError, TypePredicate};
	pub use crate::catalog::*;
	pub use crate::config::{BehaviorEntry, MediatorConfiguration, MediatorSettings};
	pub use crate::message::*;
	pub use crate::reflect::*;
	pub use crate::registration::{close_open_behavior, register};
	pub use crate::registry::{Lifetime, Registry, RegistryBuilder, Resolved, Scope, ServiceDescriptor};
	pub use crate::responses::*;

	pub use async_trait::async_trait;
	pub use futures;
	pub use tokio;
	pub use tracing;
}

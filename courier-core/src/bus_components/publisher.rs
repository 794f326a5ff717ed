//! ### Publishing strategies
//! How the handlers of one notification are invoked.
//!
//! - [SequentialPublisher] awaits each handler in registration order and stops at the first
//!   failure, which is returned unchanged.
//! - [ConcurrentPublisher] starts every handler, waits for all of them and reports every
//!   failure in one [AggregateFault].

use super::contexts::CancellationSignal;
use super::handler::{DynMessage, DynNotificationHandler};
use crate::reflect::TypeExpr;
use crate::responses::{AggregateFault, Fault};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One resolved notification handler, ready to be invoked.
#[derive(Clone)]
pub struct NotificationHandlerExecutor {
	pub implementation: TypeExpr,
	handler: Arc<dyn DynNotificationHandler>,
}

impl NotificationHandlerExecutor {
	pub fn new(implementation: TypeExpr, handler: Arc<dyn DynNotificationHandler>) -> Self {
		Self { implementation, handler }
	}

	pub async fn call(&self, notification: DynMessage, signal: CancellationSignal) -> Result<(), Fault> {
		self.handler.handle(notification, signal).await
	}
}

#[async_trait]
pub trait TPublishStrategy: Send + Sync {
	async fn publish(&self, executors: Vec<NotificationHandlerExecutor>, notification: DynMessage, signal: CancellationSignal) -> Result<(), Fault>;
}

pub struct SequentialPublisher;

#[async_trait]
impl TPublishStrategy for SequentialPublisher {
	async fn publish(&self, executors: Vec<NotificationHandlerExecutor>, notification: DynMessage, signal: CancellationSignal) -> Result<(), Fault> {
		for executor in executors {
			signal.check()?;
			if let Err(fault) = executor.call(notification.clone(), signal.clone()).await {
				tracing::error!(handler = %executor.implementation, %fault, "notification handler failed");
				return Err(fault);
			}
		}
		Ok(())
	}
}

pub struct ConcurrentPublisher;

#[async_trait]
impl TPublishStrategy for ConcurrentPublisher {
	async fn publish(&self, executors: Vec<NotificationHandlerExecutor>, notification: DynMessage, signal: CancellationSignal) -> Result<(), Fault> {
		signal.check()?;
		let outcomes = futures::future::join_all(executors.iter().map(|executor| executor.call(notification.clone(), signal.clone()))).await;

		let failures: Vec<Fault> = executors
			.iter()
			.zip(outcomes)
			.filter_map(|(executor, outcome)| {
				let fault = outcome.err()?;
				tracing::error!(handler = %executor.implementation, %fault, "notification handler failed");
				Some(fault)
			})
			.collect();
		if failures.is_empty() {
			return Ok(());
		}
		Err(AggregateFault(failures).into())
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStrategyKind {
	#[default]
	Sequential,
	Concurrent,
}

impl PublishStrategyKind {
	pub fn build(self) -> Arc<dyn TPublishStrategy> {
		match self {
			Self::Sequential => Arc::new(SequentialPublisher),
			Self::Concurrent => Arc::new(ConcurrentPublisher),
		}
	}
}

use super::{downcast_message, DynMessage, TypedService};
use crate::bus_components::contexts::CancellationSignal;
use crate::message::TNotification;
use crate::responses::Fault;
use async_trait::async_trait;

#[async_trait]
pub trait TNotificationHandler<N: TNotification>: Send + Sync + 'static {
	async fn handle(&self, notification: &N, signal: &CancellationSignal) -> Result<(), Fault>;
}

#[async_trait]
pub trait DynNotificationHandler: Send + Sync {
	async fn handle(&self, notification: DynMessage, signal: CancellationSignal) -> Result<(), Fault>;
}

#[async_trait]
impl<N, H> DynNotificationHandler for TypedService<N, H>
where
	N: TNotification,
	H: TNotificationHandler<N>,
{
	async fn handle(&self, notification: DynMessage, signal: CancellationSignal) -> Result<(), Fault> {
		let notification = downcast_message::<N>(notification)?;
		self.inner.handle(&notification, &signal).await
	}
}

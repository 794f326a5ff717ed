use crate::responses::{Cancelled, Fault};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Cooperative cancellation threaded through one dispatch.
///
/// Children are linked to their parent: cancelling the parent cancels every child, cancelling a
/// child leaves the parent untouched.
#[derive(Clone)]
pub struct CancellationSignal {
	inner: Arc<SignalNode>,
}

struct SignalNode {
	tx: watch::Sender<bool>,
	parent: Option<CancellationSignal>,
	deadline: Option<Instant>,
}

impl CancellationSignal {
	pub fn new() -> Self {
		Self::with_parent(None, None)
	}

	fn with_parent(parent: Option<CancellationSignal>, deadline: Option<Instant>) -> Self {
		let (tx, _) = watch::channel(false);
		Self {
			inner: Arc::new(SignalNode { tx, parent, deadline }),
		}
	}

	pub fn child(&self) -> Self {
		Self::with_parent(Some(self.clone()), None)
	}

	/// Linked child that also cancels itself once `timeout` elapses.
	pub fn child_with_timeout(&self, timeout: Duration) -> Self {
		Self::with_parent(Some(self.clone()), Some(Instant::now() + timeout))
	}

	pub fn cancel(&self) {
		self.inner.tx.send_replace(true);
	}

	pub fn is_cancelled(&self) -> bool {
		*self.inner.tx.borrow() || self.inner.deadline.is_some_and(|deadline| Instant::now() >= deadline) || self.inner.parent.as_ref().is_some_and(CancellationSignal::is_cancelled)
	}

	/// Raises [Cancelled] when the signal is set.
	pub fn check(&self) -> Result<(), Fault> {
		if self.is_cancelled() {
			return Err(Cancelled.into());
		}
		Ok(())
	}

	/// Resolves once the signal, one of its ancestors or its deadline fires.
	pub fn cancelled(&self) -> BoxFuture<'static, ()> {
		let node = Arc::clone(&self.inner);
		async move {
			let mut rx = node.tx.subscribe();
			let own = async move {
				let _ = rx.wait_for(|cancelled| *cancelled).await;
			};
			let parent = match &node.parent {
				Some(parent) => parent.cancelled(),
				None => futures::future::pending().boxed(),
			};
			let deadline = match node.deadline {
				Some(deadline) => tokio::time::sleep_until(deadline).boxed(),
				None => futures::future::pending().boxed(),
			};
			tokio::select! {
				_ = own => {}
				_ = parent => {}
				_ = deadline => {}
			}
		}
		.boxed()
	}
}

impl Default for CancellationSignal {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for CancellationSignal {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CancellationSignal").field("cancelled", &self.is_cancelled()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_child_follows_parent_but_not_the_reverse() {
		let parent = CancellationSignal::new();
		let child = parent.child();

		child.cancel();
		assert!(child.is_cancelled());
		assert!(!parent.is_cancelled());

		let sibling = parent.child();
		parent.cancel();
		assert!(sibling.is_cancelled());
		assert!(sibling.check().unwrap_err().is::<Cancelled>());
	}

	#[tokio::test]
	async fn test_timeout_child_cancels_itself() {
		let parent = CancellationSignal::new();
		let child = parent.child_with_timeout(Duration::from_millis(10));
		assert!(!child.is_cancelled());

		tokio::time::timeout(Duration::from_secs(1), child.cancelled()).await.expect("deadline should fire");
		assert!(child.is_cancelled());
		assert!(!parent.is_cancelled());
	}

	#[tokio::test]
	async fn test_cancelled_resolves_on_parent_cancel() {
		let parent = CancellationSignal::new();
		let child = parent.child();
		let waiter = tokio::spawn(child.cancelled());

		parent.cancel();
		tokio::time::timeout(Duration::from_secs(1), waiter).await.expect("child should observe parent").unwrap();
	}
}

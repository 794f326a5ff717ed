use courier::prelude::*;
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

#[derive(Debug, thiserror::Error, Reflect, TExceptionType)]
#[error("projection for user {0} is stale")]
struct StaleProjection(u64);

#[derive(Reflect, TNotification)]
struct UserCreated {
	id: u64,
}

struct Recorder {
	name: &'static str,
	fails: bool,
	log: Log,
}

#[async_trait]
impl TNotificationHandler<UserCreated> for Recorder {
	async fn handle(&self, notification: &UserCreated, _: &CancellationSignal) -> Result<(), Fault> {
		if self.fails {
			return Err(StaleProjection(notification.id).into());
		}
		self.log.lock().unwrap().push(format!("{} saw {}", self.name, notification.id));
		Ok(())
	}
}

// Handler types are distinct so that each one is its own registration.
macro_rules! recorders {
	($($ty:ident),*) => {
		$(
			struct $ty(Recorder);

			#[async_trait]
			impl TNotificationHandler<UserCreated> for $ty {
				async fn handle(&self, notification: &UserCreated, signal: &CancellationSignal) -> Result<(), Fault> {
					self.0.handle(notification, signal).await
				}
			}
		)*
	};
}
recorders!(Welcome, Projection, Audit);

fn user_module(log: &Log, failing: [bool; 3]) -> Module {
	let (a, b, c) = (log.clone(), log.clone(), log.clone());
	Module::new("users")
		.notification::<UserCreated>()
		.notification_handler::<UserCreated, _>(move || Welcome(Recorder { name: "welcome", fails: failing[0], log: a.clone() }))
		.notification_handler::<UserCreated, _>(move || Projection(Recorder { name: "projection", fails: failing[1], log: b.clone() }))
		.notification_handler::<UserCreated, _>(move || Audit(Recorder { name: "audit", fails: failing[2], log: c.clone() }))
}

#[tokio::test]
async fn test_sequential_publish_stops_at_failing_handler() {
	//GIVEN
	let log: Log = Default::default();
	let mediator = Mediator::build(MediatorConfiguration::new().module(user_module(&log, [false, true, false]))).unwrap();

	//WHEN
	let fault = mediator.publish(UserCreated { id: 7 }).await.unwrap_err();

	//THEN
	assert_eq!(fault.downcast_ref::<StaleProjection>().map(|stale| stale.0), Some(7));
	assert_eq!(*log.lock().unwrap(), vec!["welcome saw 7"]);
}

#[tokio::test]
async fn test_concurrent_publish_runs_every_handler() {
	//GIVEN
	let log: Log = Default::default();
	let config = MediatorConfiguration::new().module(user_module(&log, [true, false, true])).publish_strategy(PublishStrategyKind::Concurrent);
	let mediator = Mediator::build(config).unwrap();

	//WHEN
	let fault = mediator.publish(UserCreated { id: 9 }).await.unwrap_err();

	//THEN
	let aggregate = fault.downcast::<AggregateFault>().unwrap();
	assert_eq!(aggregate.0.len(), 2);
	assert!(aggregate.0.iter().all(|fault| fault.is::<StaleProjection>()));
	assert_eq!(*log.lock().unwrap(), vec!["projection saw 9"]);
}

struct Counting(Arc<std::sync::atomic::AtomicUsize>);

#[async_trait]
impl TPublishStrategy for Counting {
	async fn publish(&self, executors: Vec<NotificationHandlerExecutor>, notification: DynMessage, signal: CancellationSignal) -> Result<(), Fault> {
		self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
		SequentialPublisher.publish(executors, notification, signal).await
	}
}

#[tokio::test]
async fn test_settings_applied_later_keep_the_custom_publisher() {
	//GIVEN
	let log: Log = Default::default();
	let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
	let settings = MediatorSettings::from_json(r#"{ "exception_action_policy": "always", "publish_strategy": "concurrent" }"#).unwrap();
	let config = MediatorConfiguration::new().module(user_module(&log, [false; 3])).custom_publisher(Counting(calls.clone())).settings(settings);
	let mediator = Mediator::build(config).unwrap();

	//WHEN
	mediator.publish(UserCreated { id: 5 }).await.unwrap();

	//THEN
	assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
	assert_eq!(*log.lock().unwrap(), vec!["welcome saw 5", "projection saw 5", "audit saw 5"]);
}

#[tokio::test]
async fn test_publishing_without_handlers_is_a_no_op() {
	let mediator = Mediator::build(MediatorConfiguration::new().module(Module::new("quiet").notification::<UserCreated>())).unwrap();

	mediator.publish(UserCreated { id: 1 }).await.unwrap();
}

struct Auditable;
reflect_named!(Auditable => "users::Auditable");

#[derive(Reflect, TNotification)]
struct UserDeleted {
	id: u64,
}

struct AuditTrail {
	log: Log,
}

#[async_trait]
impl DynNotificationHandler for AuditTrail {
	async fn handle(&self, notification: DynMessage, _: CancellationSignal) -> Result<(), Fault> {
		let entry = match (notification.downcast_ref::<UserCreated>(), notification.downcast_ref::<UserDeleted>()) {
			(Some(created), _) => format!("audit created {}", created.id),
			(_, Some(deleted)) => format!("audit deleted {}", deleted.id),
			_ => "audit other".to_owned(),
		};
		self.log.lock().unwrap().push(entry);
		Ok(())
	}
}

fn auditing(module: Module) -> Module {
	module
		.interface::<Auditable>()
		.add(CandidateType::notification::<UserCreated>().base(Auditable::type_expr()))
		.add(CandidateType::notification::<UserDeleted>().base(Auditable::type_expr()))
}

#[tokio::test]
async fn test_interface_handler_receives_every_implementing_notification() {
	//GIVEN
	let log: Log = Default::default();
	let trail = log.clone();
	let module = auditing(Module::new("audit")).implementation::<AuditTrail>(move |i| i.interface_notification_handler::<Auditable>(move || AuditTrail { log: trail.clone() }));
	let mediator = Mediator::build(MediatorConfiguration::new().module(module)).unwrap();

	//WHEN
	mediator.publish(UserCreated { id: 1 }).await.unwrap();
	mediator.publish(UserDeleted { id: 2 }).await.unwrap();

	//THEN
	assert_eq!(*log.lock().unwrap(), vec!["audit created 1", "audit deleted 2"]);
}

#[tokio::test]
async fn test_raw_interface_declaration_is_offered_to_implementing_notifications() {
	let log: Log = Default::default();
	let trail = log.clone();
	let activator: Activator = Arc::new(move |_: &Bindings| Ok(Service::NotificationHandler(Arc::new(AuditTrail { log: trail.clone() }))));
	let module = auditing(Module::new("audit"))
		.add(CandidateType::new(TypeExpr::named("users::AuditTrail"), TypeRole::Plain).implements(ShapeInstance::notification_handler(Auditable::type_expr()), activator));
	let mediator = Mediator::build(MediatorConfiguration::new().module(module)).unwrap();

	mediator.publish(UserDeleted { id: 3 }).await.unwrap();

	assert_eq!(*log.lock().unwrap(), vec!["audit deleted 3"]);
}

impl TNotification for Auditable {}

struct TypedTrail {
	log: Log,
}

#[async_trait]
impl TNotificationHandler<Auditable> for TypedTrail {
	async fn handle(&self, _: &Auditable, _: &CancellationSignal) -> Result<(), Fault> {
		self.log.lock().unwrap().push("typed audit".into());
		Ok(())
	}
}

#[tokio::test]
async fn test_typed_interface_handler_is_not_offered_to_implementing_notifications() {
	//GIVEN
	let log: Log = Default::default();
	let trail = log.clone();
	let module = auditing(Module::new("audit")).notification_handler::<Auditable, _>(move || TypedTrail { log: trail.clone() });
	let mediator = Mediator::build(MediatorConfiguration::new().module(module)).unwrap();

	//WHEN
	mediator.publish(UserCreated { id: 4 }).await.unwrap();
	mediator.publish(Auditable).await.unwrap();

	//THEN
	assert_eq!(mediator.registry().descriptors(&ShapeInstance::notification_handler(UserCreated::type_expr())).count(), 0);
	assert_eq!(*log.lock().unwrap(), vec!["typed audit"]);
}

use courier::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Log = Arc<Mutex<Vec<String>>>;

fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).with_test_writer().try_init();
}

fn entries(log: &Log) -> Vec<String> {
	log.lock().unwrap().clone()
}

#[derive(Reflect, TRequest)]
#[response(i32)]
struct Sum(i32, i32);

struct SumHandler {
	log: Log,
}

#[async_trait]
impl TRequestHandler<Sum> for SumHandler {
	async fn handle(&self, request: &Sum, _: &CancellationSignal) -> Result<i32, Fault> {
		self.log.lock().unwrap().push("handler".into());
		Ok(request.0 + request.1)
	}
}

struct Doubling {
	log: Log,
}

#[async_trait]
impl TPipelineBehavior<Sum> for Doubling {
	async fn handle(&self, _: &Sum, next: TypedNext<i32>, signal: &CancellationSignal) -> Result<i32, Fault> {
		self.log.lock().unwrap().push("before".into());
		let response = next.run(signal.clone()).await?;
		self.log.lock().unwrap().push("after".into());
		Ok(response * 2)
	}
}

struct Tagged {
	tag: &'static str,
	log: Log,
}

#[async_trait]
impl TPipelineBehavior<Sum> for Tagged {
	async fn handle(&self, _: &Sum, next: TypedNext<i32>, signal: &CancellationSignal) -> Result<i32, Fault> {
		self.log.lock().unwrap().push(format!("{} in", self.tag));
		let response = next.run(signal.clone()).await;
		self.log.lock().unwrap().push(format!("{} out", self.tag));
		response
	}
}

#[async_trait]
impl TRequestPreProcessor<Sum> for Tagged {
	async fn process(&self, _: &Sum, _: &CancellationSignal) -> Result<(), Fault> {
		self.log.lock().unwrap().push(format!("{} pre", self.tag));
		Ok(())
	}
}

#[async_trait]
impl TRequestPostProcessor<Sum> for Tagged {
	async fn process(&self, _: &Sum, response: &i32, _: &CancellationSignal) -> Result<(), Fault> {
		self.log.lock().unwrap().push(format!("{} post {response}", self.tag));
		Ok(())
	}
}

fn sum_module(log: &Log) -> Module {
	let log = log.clone();
	Module::new("sums").request::<Sum>().request_handler::<Sum, _>(move || SumHandler { log: log.clone() })
}

#[tokio::test]
async fn test_doubling_behavior_wraps_handler_once() {
	//GIVEN
	init_tracing();
	let log: Log = Default::default();
	let behavior_log = log.clone();
	let mediator = Mediator::build(MediatorConfiguration::new().module(sum_module(&log)).add_behavior::<Sum, _>(move || Doubling { log: behavior_log.clone() })).unwrap();

	//WHEN
	let response = mediator.send(Sum(2, 3)).await.unwrap();

	//THEN
	assert_eq!(response, 10);
	assert_eq!(entries(&log), vec!["before", "handler", "after"]);
}

#[tokio::test]
async fn test_last_registered_behavior_is_outermost() {
	//GIVEN
	let log: Log = Default::default();
	let (first, second, processors) = (log.clone(), log.clone(), log.clone());
	let module = sum_module(&log).implementation::<Tagged>(move |implementation| {
		let post = processors.clone();
		implementation
			.pre_processor::<Sum>(move || Tagged { tag: "p", log: processors.clone() })
			.post_processor::<Sum>(move || Tagged { tag: "p", log: post.clone() })
	});
	let config = MediatorConfiguration::new()
		.module(module)
		.add_behavior::<Sum, _>(move || Tagged { tag: "first", log: first.clone() })
		.add_behavior::<Sum, _>(move || Tagged { tag: "second", log: second.clone() });
	let mediator = Mediator::build(config).unwrap();

	//WHEN
	assert_eq!(mediator.send(Sum(1, 1)).await.unwrap(), 2);

	//THEN
	assert_eq!(entries(&log), vec!["p pre", "second in", "first in", "handler", "first out", "second out", "p post 2"]);
}

#[tokio::test]
async fn test_assembled_chain_lists_stages_in_execution_order() {
	let log: Log = Default::default();
	let behavior_log = log.clone();
	let mediator = Mediator::build(MediatorConfiguration::new().module(sum_module(&log)).add_behavior::<Sum, _>(move || Doubling { log: behavior_log.clone() })).unwrap();

	let scope = mediator.registry().create_scope();
	let chain = ExecutionChain::assemble(&scope, &Sum::type_expr(), &i32::type_expr(), ExceptionActionPolicy::UnhandledOnly).unwrap();
	let stages: Vec<ChainStage> = chain.stages().into_iter().map(|(stage, _)| stage).collect();
	assert_eq!(stages, vec![ChainStage::Behavior, ChainStage::Handler]);
}

#[derive(Reflect, TRequest)]
struct Forget(u32);

struct ForgetHandler {
	log: Log,
}

#[async_trait]
impl TVoidRequestHandler<Forget> for ForgetHandler {
	async fn handle(&self, request: &Forget, _: &CancellationSignal) -> Result<(), Fault> {
		self.log.lock().unwrap().push(format!("forgot {}", request.0));
		Ok(())
	}
}

#[tokio::test]
async fn test_void_request_answers_unit() {
	let log: Log = Default::default();
	let handler_log = log.clone();
	let module = Module::new("void").request::<Forget>().void_request_handler::<Forget, _>(move || ForgetHandler { log: handler_log.clone() });
	let mediator = Mediator::build(MediatorConfiguration::new().module(module)).unwrap();

	mediator.send(Forget(4)).await.unwrap();

	assert_eq!(entries(&log), vec!["forgot 4"]);
	assert!(mediator.registry().contains(&ShapeInstance::request_handler(Forget::type_expr(), <()>::type_expr())));
}

#[tokio::test]
async fn test_missing_handler_names_the_contract() {
	let mediator = Mediator::build(MediatorConfiguration::new().module(Module::new("empty").request::<Sum>())).unwrap();

	let fault = mediator.send(Sum(1, 2)).await.unwrap_err();

	let not_found = fault.downcast_ref::<HandlerNotFound>().unwrap();
	assert_eq!(not_found.contract, "RequestHandler<Sum, i32>");
	assert!(fault.kind().lineage().contains(&DispatchFault::type_expr()));
}

#[tokio::test]
async fn test_send_dynamic_with_erased_request() {
	let log: Log = Default::default();
	let mediator = Mediator::build(MediatorConfiguration::new().module(sum_module(&log))).unwrap();

	let response = mediator.send_dynamic(Arc::new(Sum(20, 22)), Sum::type_expr(), i32::type_expr(), &CancellationSignal::new()).await.unwrap();

	assert_eq!(response.downcast_ref::<i32>(), Some(&42));
}

#[tokio::test]
async fn test_mismatched_response_type_fails_without_panicking() {
	let log: Log = Default::default();
	let mediator = Mediator::build(MediatorConfiguration::new().module(sum_module(&log))).unwrap();

	let fault = mediator.send_dynamic(Arc::new("not a sum"), Sum::type_expr(), i32::type_expr(), &CancellationSignal::new()).await.unwrap_err();

	assert!(fault.is::<TypeMismatch>());
	assert!(entries(&log).is_empty());
}

struct Slow;

#[async_trait]
impl TRequestHandler<Sum> for Slow {
	async fn handle(&self, request: &Sum, signal: &CancellationSignal) -> Result<i32, Fault> {
		tokio::select! {
			_ = signal.cancelled() => Err(Cancelled.into()),
			_ = tokio::time::sleep(Duration::from_secs(5)) => Ok(request.0 + request.1),
		}
	}
}

#[tokio::test]
async fn test_cancellation_reaches_the_handler() {
	//GIVEN
	let module = Module::new("slow").request::<Sum>().request_handler::<Sum, _>(|| Slow);
	let mediator = Mediator::build(MediatorConfiguration::new().module(module)).unwrap();
	let parent = CancellationSignal::new();

	//WHEN
	let fault = mediator.send_with(Sum(1, 1), &parent.child_with_timeout(Duration::from_millis(20))).await.unwrap_err();

	//THEN
	assert!(fault.is::<Cancelled>());
	assert!(!parent.is_cancelled());

	parent.cancel();
	assert!(mediator.send_with(Sum(1, 1), &parent).await.unwrap_err().is::<Cancelled>());
}

struct Fixed(i32);

#[async_trait]
impl TRequestHandler<Sum> for Fixed {
	async fn handle(&self, _: &Sum, _: &CancellationSignal) -> Result<i32, Fault> {
		Ok(self.0)
	}
}

struct Other;

#[async_trait]
impl TRequestHandler<Sum> for Other {
	async fn handle(&self, _: &Sum, _: &CancellationSignal) -> Result<i32, Fault> {
		Ok(-1)
	}
}

#[tokio::test]
async fn test_first_of_duplicate_handlers_is_the_default() {
	let module = Module::new("dupes").request::<Sum>().request_handler::<Sum, _>(|| Fixed(7)).request_handler::<Sum, _>(|| Other);
	let mediator = Mediator::build(MediatorConfiguration::new().module(module)).unwrap();

	assert_eq!(mediator.send(Sum(0, 0)).await.unwrap(), 7);
	assert_eq!(mediator.registry().descriptors(&ShapeInstance::request_handler(Sum::type_expr(), i32::type_expr())).count(), 2);
}

#[tokio::test]
async fn test_scoped_and_singleton_lifetimes() {
	use std::sync::atomic::{AtomicUsize, Ordering};
	static ACTIVATIONS: AtomicUsize = AtomicUsize::new(0);

	let module = Module::new("counted").request::<Sum>().request_handler::<Sum, _>(|| {
		ACTIVATIONS.fetch_add(1, Ordering::SeqCst);
		Fixed(1)
	});
	let mediator = Mediator::build(MediatorConfiguration::new().module(module).lifetime_of::<Fixed>(Lifetime::Singleton)).unwrap();

	for _ in 0..3 {
		mediator.send(Sum(0, 0)).await.unwrap();
	}
	assert_eq!(ACTIVATIONS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_building_without_modules_fails() {
	assert!(matches!(Mediator::build(MediatorConfiguration::new()), Err(ConfigurationError::NoModules)));
}

struct Lookup;
reflect_named!(Lookup => "lookups::Lookup");

#[derive(Reflect, TRequest)]
#[response(String)]
struct FindUser;

struct Answer(&'static str);

#[async_trait]
impl DynRequestHandler for Answer {
	async fn handle(&self, _: DynMessage, _: CancellationSignal) -> Result<DynResponse, Fault> {
		Ok(Box::new(self.0.to_owned()))
	}
}

fn lookup_handler(name: &'static str) -> CandidateType {
	let activator: Activator = Arc::new(move |_: &Bindings| Ok(Service::RequestHandler(Arc::new(Answer(name)))));
	CandidateType::new(TypeExpr::named(name), TypeRole::Plain).implements(ShapeInstance::request_handler(Lookup::type_expr(), String::type_expr()), activator)
}

fn lookups(handlers: &[&'static str]) -> Module {
	let module = Module::new("lookups").interface::<Lookup>().add(CandidateType::request::<FindUser>().base(Lookup::type_expr()));
	handlers.iter().fold(module, |module, name| module.add(lookup_handler(*name)))
}

#[tokio::test]
async fn test_single_interface_handler_serves_implementing_request() {
	let mediator = Mediator::build(MediatorConfiguration::new().module(lookups(&["ByEmail"]))).unwrap();

	assert_eq!(mediator.send(FindUser).await.unwrap(), "ByEmail");
}

#[tokio::test]
async fn test_ambiguous_interface_handlers_are_rejected() {
	init_tracing();
	let mediator = Mediator::build(MediatorConfiguration::new().module(lookups(&["ByEmail", "ByName"]))).unwrap();

	let fault = mediator.send(FindUser).await.unwrap_err();

	assert!(fault.is::<HandlerNotFound>());
	let interface_contract = ShapeInstance::request_handler(Lookup::type_expr(), String::type_expr());
	assert_eq!(mediator.registry().descriptors(&interface_contract).count(), 2);
}

#[tokio::test]
async fn test_interface_request_handler_built_from_module_serves_implementing_request() {
	//GIVEN
	let module = Module::new("lookups")
		.interface::<Lookup>()
		.add(CandidateType::request::<FindUser>().base(Lookup::type_expr()))
		.implementation::<Answer>(|i| i.interface_request_handler::<Lookup, String>(|| Answer("ByPhone")));
	let mediator = Mediator::build(MediatorConfiguration::new().module(module)).unwrap();

	//WHEN
	let answer = mediator.send(FindUser).await.unwrap();

	//THEN
	assert_eq!(answer, "ByPhone");
}

//! # courier
//! In-process dispatch of requests, notifications and stream requests to the handlers a set of
//! modules declares.
//!
//! Handlers, processors and exception handlers are discovered from [modules](prelude::Module) when
//! the [Mediator](prelude::Mediator) is built. Generic templates can be closed against the
//! scanned types, and behaviors wrap the handling of every request they apply to.
//!
//! ## Example
//! ```ignore
//! use courier::prelude::*;
//!
//! #[derive(Reflect, TRequest)]
//! #[response(i32)]
//! struct Sum(i32, i32);
//!
//! struct SumHandler;
//!
//! #[async_trait]
//! impl TRequestHandler<Sum> for SumHandler {
//!     async fn handle(&self, request: &Sum, _: &CancellationSignal) -> Result<i32, Fault> {
//!         Ok(request.0 + request.1)
//!     }
//! }
//!
//! let mediator = Mediator::build(MediatorConfiguration::new().module(Module::new("app").request::<Sum>().request_handler::<Sum, _>(|| SumHandler)))?;
//! assert_eq!(mediator.send(Sum(2, 3)).await?, 5);
//! ```

extern crate courier_core;
extern crate courier_macro;

pub mod prelude {
	pub use courier_core::prelude::*;
	pub use courier_core::{exception_kinds, reflect_named};
	pub use courier_macro::{Reflect, TExceptionType, TNotification, TRequest, TStreamRequest};
}

pub use courier_core::{exception_kinds, reflect_named};

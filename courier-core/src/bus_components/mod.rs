pub mod contexts;
pub mod exceptions;
pub mod handler;
pub mod mediator;
pub mod pipeline;
pub mod publisher;

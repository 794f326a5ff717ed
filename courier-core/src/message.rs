use crate::reflect::Reflect;

/// Request handled by exactly one handler and answered with `Response`.
///
/// Requests without a meaningful answer use `()` as the response.
pub trait TRequest: Reflect + Send + Sync + 'static {
	type Response: Reflect + Send + Sync + 'static;
}

/// Event delivered to zero or more handlers.
pub trait TNotification: Reflect + Send + Sync + 'static {}

/// Request answered with a stream of `Item`s.
pub trait TStreamRequest: Reflect + Send + Sync + 'static {
	type Item: Reflect + Send + Sync + 'static;
}

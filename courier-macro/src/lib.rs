use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

#[macro_use]
extern crate quote;

mod exception;
mod generics;
mod message;
mod reflect;
mod utils;

/// Describes the type as a `TypeExpr`.
///
/// Type parameters become type arguments of the expression, so they must implement `Reflect` too.
///
/// ## Attributes
/// - `#[crates(...)]` - path of the courier crate. (Default is `::courier`)
/// - `#[reflect(name = "...")]` - name of the type expression. (Default is the module path followed by the type name)
///
/// ## Example
/// ```ignore
/// #[derive(Reflect)]
/// struct ResultLike<T> {
///     value: Option<T>,
/// }
///
/// assert_eq!(ResultLike::<String>::type_expr().to_string(), "ResultLike<String>");
/// ```
#[proc_macro_derive(Reflect, attributes(crates, reflect))]
pub fn reflect_derive(input: TokenStream) -> TokenStream {
	let ast = parse_macro_input!(input as DeriveInput);
	reflect::render_reflect_token(&ast).unwrap_or_else(syn::Error::into_compile_error).into()
}

/// Request answered with the type given in `#[response(...)]`, `()` when omitted.
///
/// ## Example
/// ```ignore
/// #[derive(Reflect, TRequest)]
/// #[response(i32)]
/// struct Sum(i32, i32);
/// ```
#[proc_macro_derive(TRequest, attributes(crates, response))]
pub fn request_derive(input: TokenStream) -> TokenStream {
	let ast = parse_macro_input!(input as DeriveInput);
	message::render_request_token(&ast).unwrap_or_else(syn::Error::into_compile_error).into()
}

#[proc_macro_derive(TNotification, attributes(crates))]
pub fn notification_derive(input: TokenStream) -> TokenStream {
	let ast = parse_macro_input!(input as DeriveInput);
	message::render_notification_token(&ast).into()
}

/// Request answered with a stream of the type given in `#[item(...)]`.
#[proc_macro_derive(TStreamRequest, attributes(crates, item))]
pub fn stream_request_derive(input: TokenStream) -> TokenStream {
	let ast = parse_macro_input!(input as DeriveInput);
	message::render_stream_request_token(&ast).unwrap_or_else(syn::Error::into_compile_error).into()
}

/// Declares the type as an exception kind. The type still needs `std::error::Error` to be raised.
///
/// ## Attributes
/// - `#[exception(parent = ...)]` - parent kind in the exception hierarchy. Kinds without one derive from the root.
///
/// ## Example
/// ```ignore
/// #[derive(Debug, thiserror::Error, Reflect, TExceptionType)]
/// #[error("user {0} already exists")]
/// #[exception(parent = ValidationFailed)]
/// struct DuplicateUser(String);
/// ```
#[proc_macro_derive(TExceptionType, attributes(crates, exception))]
pub fn exception_derive(input: TokenStream) -> TokenStream {
	let ast = parse_macro_input!(input as DeriveInput);
	exception::render_exception_token(&ast).unwrap_or_else(syn::Error::into_compile_error).into()
}

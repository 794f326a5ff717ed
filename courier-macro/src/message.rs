use crate::generics::add_message_bounds;
use crate::utils::{find_attribute, locate_crate_on_derive_macro};
use proc_macro2::TokenStream;
use syn::{DeriveInput, Type};

fn attribute_type(ast: &DeriveInput, name: &str) -> syn::Result<Option<Type>> {
	find_attribute(&ast.attrs, name).map(|attr| attr.parse_args::<Type>()).transpose()
}

pub(crate) fn render_request_token(ast: &DeriveInput) -> syn::Result<TokenStream> {
	let name = &ast.ident;
	let crates = locate_crate_on_derive_macro(ast)?;
	let response = attribute_type(ast, "response")?.unwrap_or_else(|| syn::parse_quote!(()));

	let mut generics = ast.generics.clone();
	add_message_bounds(&mut generics, &crates);
	let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

	Ok(quote! {
		impl #impl_generics #crates::prelude::TRequest for #name #ty_generics #where_clause {
			type Response = #response;
		}
	})
}

pub(crate) fn render_notification_token(ast: &DeriveInput) -> TokenStream {
	let name = &ast.ident;
	let crates = match locate_crate_on_derive_macro(ast) {
		Ok(crates) => crates,
		Err(err) => return err.into_compile_error(),
	};

	let mut generics = ast.generics.clone();
	add_message_bounds(&mut generics, &crates);
	let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

	quote! {
		impl #impl_generics #crates::prelude::TNotification for #name #ty_generics #where_clause {}
	}
}

pub(crate) fn render_stream_request_token(ast: &DeriveInput) -> syn::Result<TokenStream> {
	let name = &ast.ident;
	let crates = locate_crate_on_derive_macro(ast)?;
	let item = attribute_type(ast, "item")?.ok_or_else(|| syn::Error::new_spanned(name, "stream requests need `#[item(...)]`"))?;

	let mut generics = ast.generics.clone();
	add_message_bounds(&mut generics, &crates);
	let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

	Ok(quote! {
		impl #impl_generics #crates::prelude::TStreamRequest for #name #ty_generics #where_clause {
			type Item = #item;
		}
	})
}

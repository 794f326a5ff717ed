use crate::generics::add_message_bounds;
use crate::utils::{find_attribute, locate_crate_on_derive_macro};
use proc_macro2::TokenStream;
use syn::{DeriveInput, Type};

pub(crate) fn render_exception_token(ast: &DeriveInput) -> syn::Result<TokenStream> {
	let name = &ast.ident;
	let crates = locate_crate_on_derive_macro(ast)?;

	let mut parent: Option<Type> = None;
	if let Some(attr) = find_attribute(&ast.attrs, "exception") {
		attr.parse_nested_meta(|meta| {
			if meta.path.is_ident("parent") {
				parent = Some(meta.value()?.parse()?);
				return Ok(());
			}
			Err(meta.error("expected `parent = ...`"))
		})?;
	}
	let parent = parent.map(|parent| {
		quote! {
			fn parent() -> Option<#crates::prelude::ExceptionKind> {
				Some(#crates::prelude::ExceptionKind::of::<#parent>())
			}
		}
	});

	let mut generics = ast.generics.clone();
	add_message_bounds(&mut generics, &crates);
	let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

	Ok(quote! {
		impl #impl_generics #crates::prelude::TExceptionType for #name #ty_generics #where_clause {
			#parent
		}
	})
}

use crate::generics::add_reflect_bounds;
use crate::utils::{find_attribute, locate_crate_on_derive_macro};
use proc_macro2::TokenStream;
use syn::{DeriveInput, LitStr};

pub(crate) fn render_reflect_token(ast: &DeriveInput) -> syn::Result<TokenStream> {
	let name = &ast.ident;
	let crates = locate_crate_on_derive_macro(ast)?;
	let type_name = match find_attribute(&ast.attrs, "reflect") {
		Some(attr) => {
			let mut renamed = None;
			attr.parse_nested_meta(|meta| {
				if meta.path.is_ident("name") {
					renamed = Some(meta.value()?.parse::<LitStr>()?);
					return Ok(());
				}
				Err(meta.error("expected `name = \"...\"`"))
			})?;
			let renamed = renamed.ok_or_else(|| syn::Error::new_spanned(attr, "expected `name = \"...\"`"))?;
			quote!(#renamed)
		}
		None => quote!(concat!(module_path!(), "::", stringify!(#name))),
	};

	let mut generics = ast.generics.clone();
	add_reflect_bounds(&mut generics, &crates);
	let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
	let args = ast.generics.type_params().map(|param| {
		let ident = &param.ident;
		quote!(<#ident as #crates::prelude::Reflect>::type_expr())
	});

	Ok(quote! {
		impl #impl_generics #crates::prelude::Reflect for #name #ty_generics #where_clause {
			fn type_expr() -> #crates::prelude::TypeExpr {
				let args: ::std::vec::Vec<#crates::prelude::TypeExpr> = ::std::vec![#(#args),*];
				#crates::prelude::TypeExpr::generic(#type_name, args)
			}
		}
	})
}

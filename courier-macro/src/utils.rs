use syn::{Attribute, DeriveInput, Path};

/// Path of the courier crate, taken from `#[crates(...)]` when given.
pub(crate) fn locate_crate_on_derive_macro(ast: &DeriveInput) -> syn::Result<Path> {
	match find_attribute(&ast.attrs, "crates") {
		Some(crates) => crates.parse_args::<Path>(),
		None => Ok(syn::parse_quote!(::courier)),
	}
}

pub(crate) fn find_attribute<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
	attrs.iter().find(|attr| attr.path().is_ident(name))
}

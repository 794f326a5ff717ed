use syn::{parse_quote, Generics, Path};

// Every type parameter must be describable and shareable between tasks for the type to be a message.
pub(crate) fn add_message_bounds(generics: &mut Generics, crates: &Path) {
	add_bounds(generics, |ident| parse_quote!(#ident: #crates::prelude::Reflect + Send + Sync + 'static));
}

pub(crate) fn add_reflect_bounds(generics: &mut Generics, crates: &Path) {
	add_bounds(generics, |ident| parse_quote!(#ident: #crates::prelude::Reflect));
}

fn add_bounds(generics: &mut Generics, predicate: impl Fn(&syn::Ident) -> syn::WherePredicate) {
	let predicates: Vec<_> = generics.type_params().map(|param| predicate(&param.ident)).collect();
	if !predicates.is_empty() {
		generics.make_where_clause().predicates.extend(predicates);
	}
}

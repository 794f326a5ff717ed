use super::CandidateType;
use crate::reflect::TypeName;
use crate::responses::ConfigurationError;
use hashbrown::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("type `{type_name}` could not be loaded: {reason}")]
pub struct TypeLoadError {
	pub type_name: String,
	pub reason: String,
}

pub type TypeLoad = Result<CandidateType, TypeLoadError>;

pub type TypePredicate = Arc<dyn Fn(&CandidateType) -> bool + Send + Sync>;

/// Source of candidate types, the unit handed to the scanner.
pub trait TTypeModule: Send + Sync {
	fn name(&self) -> &str;

	/// Loads every type of the module. Individual loads may fail; opening the module itself may not.
	fn load_types(&self) -> Result<Vec<TypeLoad>, ConfigurationError>;
}

/// Enumerates the loadable types of `modules` that pass `predicate`.
///
/// Types that fail to load are dropped. Modules listed twice under the same name are scanned once.
pub fn scan(modules: &[Arc<dyn TTypeModule>], predicate: Option<&TypePredicate>) -> Result<Vec<CandidateType>, ConfigurationError> {
	if modules.is_empty() {
		return Err(ConfigurationError::NoModules);
	}

	let mut seen = HashSet::new();
	let mut candidates = vec![];
	for module in modules.iter().filter(|module| seen.insert(module.name().to_owned())) {
		let module_name: TypeName = module.name().to_owned().into();
		let loads = module.load_types()?;
		let total = loads.len();

		for load in loads {
			match load {
				Ok(mut candidate) => {
					candidate.module = module_name.clone();
					if predicate.map_or(true, |keep| keep(&candidate)) {
						candidates.push(candidate);
					}
				}
				Err(err) => tracing::debug!(module = %module_name, %err, "dropping unloadable type"),
			}
		}
		tracing::debug!(module = %module_name, total, "module scanned");
	}
	Ok(candidates)
}

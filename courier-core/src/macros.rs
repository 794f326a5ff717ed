/// Implements [`Reflect`](crate::reflect::Reflect) for non-generic types under a fixed name.
#[macro_export]
macro_rules! reflect_named {
	($($ty:ty => $name:expr),* $(,)?) => {
		$(
			impl $crate::prelude::Reflect for $ty {
				fn type_expr() -> $crate::prelude::TypeExpr {
					$crate::prelude::TypeExpr::named($name)
				}
			}
		)*
	};
}

/// Declares types as exception kinds, optionally naming the parent kind.
///
/// ```ignore
/// exception_kinds!(StorageFailure, DiskFull => StorageFailure);
/// ```
#[macro_export]
macro_rules! exception_kinds {
	($($ty:ty $(=> $parent:ty)?),* $(,)?) => {
		$(
			impl $crate::prelude::TExceptionType for $ty {
				$(
					fn parent() -> Option<$crate::prelude::ExceptionKind> {
						Some($crate::prelude::ExceptionKind::of::<$parent>())
					}
				)?
			}
		)*
	};
}

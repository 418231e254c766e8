//! Resolution errors.
//!
//! Every error names the method or member it concerns so the interop layer
//! can report it to the caller as-is. None of these are retried: resolution
//! is pure, and a caller may simply try again.

use std::fmt;

use dynbind_reflect::{SubstitutionError, Ty};

use crate::overload::SelectBy;

#[derive(Clone, Debug, PartialEq)]
pub enum ResolveError {
    /// No overload matched the requested arity. Under the fallback policy
    /// this is only reported as a warning and the first overload is used.
    OverloadNotFound {
        method: String,
        by: SelectBy,
        wanted: usize,
        /// The arities (or generic arities) on offer, in group order.
        available: Vec<usize>,
    },
    /// A generic parameter could not be inferred from any argument.
    GenericArgumentUnresolved { method: String, param: String },
    /// The foreign runtime rejected a type substitution.
    ConstraintViolation {
        method: String,
        source: SubstitutionError,
    },
    /// The receiver type, its interfaces and its base chain declare no
    /// extension with this name.
    ExtensionMemberNotFound { ty: Ty, member: String },
    /// Every member strategy fell through.
    MemberNotFound { ty: Ty, member: String },
    /// `overload(index)` past the end of the group.
    InvalidOverloadIndex {
        method: String,
        index: usize,
        len: usize,
    },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::OverloadNotFound {
                method,
                by,
                wanted,
                available,
            } => {
                let available: Vec<String> = available.iter().map(|n| n.to_string()).collect();
                write!(
                    f,
                    "no overload of `{}` takes {} {} (available: {})",
                    method,
                    wanted,
                    by,
                    if available.is_empty() {
                        "none".to_string()
                    } else {
                        available.join(", ")
                    }
                )
            }
            ResolveError::GenericArgumentUnresolved { method, param } => write!(
                f,
                "cannot infer type argument `{}` of `{}` from the call arguments",
                param, method
            ),
            ResolveError::ConstraintViolation { method, source } => {
                write!(f, "cannot specialize `{}`: {}", method, source)
            }
            ResolveError::ExtensionMemberNotFound { ty, member } => {
                write!(f, "no extension method `{}` found for `{}`", member, ty)
            }
            ResolveError::MemberNotFound { ty, member } => {
                write!(f, "`{}` has no member `{}`", ty, member)
            }
            ResolveError::InvalidOverloadIndex { method, index, len } => write!(
                f,
                "overload index {} out of range for `{}` ({} overload(s))",
                index, method, len
            ),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::ConstraintViolation { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overload_not_found_display() {
        let err = ResolveError::OverloadNotFound {
            method: "Combine".to_string(),
            by: SelectBy::Arity,
            wanted: 4,
            available: vec![2, 3],
        };
        insta::assert_snapshot!(err.to_string(), @"no overload of `Combine` takes 4 argument(s) (available: 2, 3)");

        let err = ResolveError::OverloadNotFound {
            method: "Cast".to_string(),
            by: SelectBy::TypeArity,
            wanted: 2,
            available: vec![],
        };
        insta::assert_snapshot!(err.to_string(), @"no overload of `Cast` takes 2 type argument(s) (available: none)");
    }

    #[test]
    fn constraint_violation_exposes_source() {
        use std::error::Error;

        let err = ResolveError::ConstraintViolation {
            method: "Max".to_string(),
            source: SubstitutionError::ArityMismatch {
                method: "Max".to_string(),
                expected: 1,
                found: 2,
            },
        };
        insta::assert_snapshot!(err.to_string(), @"cannot specialize `Max`: `Max` takes 1 type argument(s), 2 supplied");
        assert!(err.source().is_some());
    }

    #[test]
    fn member_errors_display() {
        let err = ResolveError::ExtensionMemberNotFound {
            ty: Ty::named("Demo.Widget"),
            member: "Describe".to_string(),
        };
        insta::assert_snapshot!(err.to_string(), @"no extension method `Describe` found for `Demo.Widget`");

        let err = ResolveError::GenericArgumentUnresolved {
            method: "Empty".to_string(),
            param: "T".to_string(),
        };
        insta::assert_snapshot!(err.to_string(), @"cannot infer type argument `T` of `Empty` from the call arguments");
    }
}

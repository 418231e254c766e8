//! The seams to the foreign runtime.
//!
//! The resolution engine never talks to a foreign runtime directly. It asks a
//! `ReflectionProvider` about types and methods and a `NamespaceEnumerator`
//! for the types a namespace declares. Calling the resolved method is the
//! native invoker's job and has no trait here.

use std::fmt;

use crate::method::{MethodDescriptor, MethodRef};
use crate::ty::Ty;

/// Reflection over the foreign runtime's types and methods.
pub trait ReflectionProvider: Send + Sync {
    /// Interfaces directly implemented by `ty`, in declaration order.
    fn interfaces(&self, ty: &Ty) -> Vec<Ty>;

    /// The base type of `ty`; `None` at the root of a chain and for interfaces.
    fn base_type(&self, ty: &Ty) -> Option<Ty>;

    /// Methods declared directly on `ty`, in declaration order.
    fn methods(&self, ty: &Ty) -> Vec<MethodRef>;

    /// Substitute `type_args` into a generic method definition.
    fn make_generic(
        &self,
        method: &MethodDescriptor,
        type_args: &[Ty],
    ) -> Result<MethodRef, SubstitutionError>;
}

/// Enumerates the types declared directly in a namespace.
pub trait NamespaceEnumerator: Send + Sync {
    fn types_in(&self, namespace: &str) -> Vec<Ty>;
}

/// The foreign runtime refused a type substitution.
#[derive(Clone, Debug, PartialEq)]
pub enum SubstitutionError {
    /// The method has no unbound generic parameters.
    NotGeneric { method: String },
    /// Wrong number of type arguments.
    ArityMismatch {
        method: String,
        expected: usize,
        found: usize,
    },
    /// A type argument does not satisfy a constraint on its parameter.
    ConstraintNotSatisfied {
        method: String,
        param: String,
        argument: Ty,
        constraint: Ty,
    },
    /// A type argument the runtime cannot represent (a host type or an
    /// unbound placeholder).
    InvalidTypeArgument {
        method: String,
        param: String,
        argument: Ty,
    },
}

impl fmt::Display for SubstitutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubstitutionError::NotGeneric { method } => {
                write!(f, "`{}` is not a generic method definition", method)
            }
            SubstitutionError::ArityMismatch {
                method,
                expected,
                found,
            } => write!(
                f,
                "`{}` takes {} type argument(s), {} supplied",
                method, expected, found
            ),
            SubstitutionError::ConstraintNotSatisfied {
                method,
                param,
                argument,
                constraint,
            } => write!(
                f,
                "type argument `{}` for `{}` of `{}` does not satisfy constraint `{}`",
                argument, param, method, constraint
            ),
            SubstitutionError::InvalidTypeArgument {
                method,
                param,
                argument,
            } => write!(
                f,
                "`{}` is not a valid type argument for `{}` of `{}`",
                argument, param, method
            ),
        }
    }
}

impl std::error::Error for SubstitutionError {}

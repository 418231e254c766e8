//! Method specialization.
//!
//! Substitution itself belongs to the foreign runtime. This module asks for
//! it, turns a rejection into `ConstraintViolation`, and defines the shapes a
//! resolved call can take.

use dynbind_reflect::{ForeignObject, MethodDescriptor, MethodGroup, MethodRef, ReflectionProvider, Ty};

use crate::error::ResolveError;
use crate::value::Value;

/// Outcome of the specialization pipeline for one key. This is what the
/// specialization caches store.
#[derive(Clone, Debug, PartialEq)]
pub enum Specialization {
    /// The selected overload is not generic; the group is used as-is.
    Passthrough,
    /// A concrete method produced by substitution.
    Method(MethodRef),
}

/// A concrete method, optionally bound to a receiver.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundMethod {
    pub method: MethodRef,
    pub receiver: Option<ForeignObject>,
}

impl BoundMethod {
    pub fn new(method: MethodRef, receiver: Option<ForeignObject>) -> Self {
        BoundMethod { method, receiver }
    }
}

/// Which method the native invoker should call.
#[derive(Clone, Debug, PartialEq)]
pub enum CallTarget {
    /// A whole (non-generic) group; the invoker picks the overload.
    Group(MethodGroup),
    Method(BoundMethod),
}

impl CallTarget {
    /// The target as a method group, unbound.
    pub fn into_group(self) -> MethodGroup {
        match self {
            CallTarget::Group(mut group) => {
                group.receiver = None;
                group
            }
            CallTarget::Method(bound) => MethodGroup::single(bound.method),
        }
    }

    pub fn method(&self) -> Option<&MethodRef> {
        match self {
            CallTarget::Group(_) => None,
            CallTarget::Method(bound) => Some(&bound.method),
        }
    }
}

/// Everything the native invoker needs for one call.
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    pub target: CallTarget,
    pub args: Vec<Value>,
}

/// Ask the foreign runtime to substitute `type_args` into `method`.
pub fn specialize(
    provider: &dyn ReflectionProvider,
    method: &MethodDescriptor,
    type_args: &[Ty],
) -> Result<MethodRef, ResolveError> {
    let specialized = provider
        .make_generic(method, type_args)
        .map_err(|source| ResolveError::ConstraintViolation {
            method: method.name.clone(),
            source,
        })?;
    tracing::debug!(method = %method, "specialized to {}", specialized);
    Ok(specialized)
}

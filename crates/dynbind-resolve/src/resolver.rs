//! Extension member resolution.
//!
//! Finds the extension methods a receiver type answers to under a member
//! name. The type itself is consulted first, then its interfaces in
//! declaration order (depth first, so interfaces of interfaces come before
//! the next sibling), then its base type. Extensions on the universal object
//! type apply to every receiver and are consulted last.
//!
//! Successful resolutions are memoized per (extended type, member name).
//! Failures are not, so a namespace loaded later can still satisfy a lookup
//! that failed earlier.

use std::sync::Arc;

use dynbind_reflect::{ForeignObject, MethodRef, ReflectionProvider, Ty};
use rustc_hash::FxHashSet;

use crate::cache::ComputeOnceMap;
use crate::error::ResolveError;
use crate::extension::{ExtendedTypeKey, ExtensionRegistry};
use crate::generic::GenericMethod;
use crate::specialize::{CallTarget, Invocation};
use crate::value::Value;

type MemoKey = (ExtendedTypeKey, String);

#[derive(Default)]
pub struct ExtensionResolver {
    memo: ComputeOnceMap<MemoKey, Vec<MethodRef>>,
}

impl ExtensionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The extension methods named `member` that apply to `ty`.
    pub fn resolve(
        &self,
        registry: &ExtensionRegistry,
        provider: &dyn ReflectionProvider,
        ty: &Ty,
        member: &str,
    ) -> Result<Vec<MethodRef>, ResolveError> {
        let not_found = || ResolveError::ExtensionMemberNotFound {
            ty: ty.clone(),
            member: member.to_string(),
        };
        let key = ExtendedTypeKey::of(ty).ok_or_else(not_found)?;

        self.memo.get_or_create((key, member.to_string()), || {
            let mut seen = FxHashSet::default();
            walk(registry, provider, ty, member, &mut seen)
                .or_else(|| {
                    let object = ExtendedTypeKey::of(registry.object())?;
                    registry.lookup(&object, member)
                })
                .ok_or_else(not_found)
        })
    }

    /// Number of memoized (type, member) pairs.
    pub fn memoized(&self) -> usize {
        self.memo.len()
    }
}

fn walk(
    registry: &ExtensionRegistry,
    provider: &dyn ReflectionProvider,
    ty: &Ty,
    member: &str,
    seen: &mut FxHashSet<ExtendedTypeKey>,
) -> Option<Vec<MethodRef>> {
    let key = ExtendedTypeKey::of(ty)?;
    if !seen.insert(key.clone()) {
        return None;
    }
    if let Some(found) = registry.lookup(&key, member) {
        tracing::trace!(%ty, extended = %key, member, "extension found");
        return Some(found);
    }
    for iface in provider.interfaces(ty) {
        if let Some(found) = walk(registry, provider, &iface, member, seen) {
            return Some(found);
        }
    }
    let base = provider.base_type(ty)?;
    walk(registry, provider, &base, member, seen)
}

/// An extension method bound to the receiver it was looked up on.
///
/// Calls pass the receiver as the first argument of the static extension
/// method, so generic extensions infer from it like any other argument.
#[derive(Clone, Debug)]
pub struct ExtensionMethod {
    method: Arc<GenericMethod>,
    receiver: ForeignObject,
}

impl ExtensionMethod {
    pub fn new(method: Arc<GenericMethod>, receiver: ForeignObject) -> Self {
        ExtensionMethod { method, receiver }
    }

    pub fn method(&self) -> &Arc<GenericMethod> {
        &self.method
    }

    pub fn receiver(&self) -> &ForeignObject {
        &self.receiver
    }

    pub fn resolve_call(&self, args: &[Value]) -> Result<CallTarget, ResolveError> {
        self.method.resolve_call(&self.with_receiver(args), None)
    }

    pub fn call(&self, args: &[Value]) -> Result<Invocation, ResolveError> {
        self.method.call(&self.with_receiver(args), None)
    }

    /// Explicitly specialize the extension, keeping the receiver.
    pub fn instantiate(&self, type_args: &[Ty]) -> Result<ExtensionMethod, ResolveError> {
        let target = self.method.instantiate(type_args, None)?;
        Ok(ExtensionMethod {
            method: Arc::new(self.method.rewrap(target.into_group())),
            receiver: self.receiver.clone(),
        })
    }

    fn with_receiver(&self, args: &[Value]) -> Vec<Value> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(self.receiver.clone().into());
        full.extend_from_slice(args);
        full
    }
}

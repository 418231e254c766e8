//! Generic method proxies.
//!
//! A `GenericMethod` wraps one method group and runs the specialization
//! pipeline for it: overload selection, inference, substitution and caching.
//! It keeps two caches, one keyed by mapped argument types for calls and one
//! keyed by supplied type arguments for explicit instantiation, so the two
//! key spaces can never collide. Both live as long as the proxy.

use std::sync::Arc;

use dynbind_reflect::{ForeignObject, MethodGroup, ReflectionProvider, Ty};

use crate::cache::SpecializationCache;
use crate::config::OverloadPolicy;
use crate::error::ResolveError;
use crate::infer::infer_generic_args;
use crate::overload::{choose, SelectBy};
use crate::specialize::{specialize, BoundMethod, CallTarget, Invocation, Specialization};
use crate::type_map::TypeMapper;
use crate::value::Value;

pub struct GenericMethod {
    /// The wrapped overloads, unbound.
    group: MethodGroup,
    provider: Arc<dyn ReflectionProvider>,
    mapper: Arc<TypeMapper>,
    policy: OverloadPolicy,
    by_args: SpecializationCache,
    by_types: SpecializationCache,
}

impl std::fmt::Debug for GenericMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericMethod")
            .field("group", &self.group)
            .field("policy", &self.policy)
            .field("call_cache", &self.by_args.len())
            .field("type_cache", &self.by_types.len())
            .finish()
    }
}

impl GenericMethod {
    pub fn new(
        mut group: MethodGroup,
        provider: Arc<dyn ReflectionProvider>,
        mapper: Arc<TypeMapper>,
        policy: OverloadPolicy,
    ) -> Self {
        group.receiver = None;
        GenericMethod {
            group,
            provider,
            mapper,
            policy,
            by_args: SpecializationCache::new(),
            by_types: SpecializationCache::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.group.name
    }

    pub fn group(&self) -> &MethodGroup {
        &self.group
    }

    pub fn contains_generic(&self) -> bool {
        self.group.contains_generic()
    }

    /// Cache of call-based specializations.
    pub fn call_cache(&self) -> &SpecializationCache {
        &self.by_args
    }

    /// Cache of explicit instantiations.
    pub fn type_cache(&self) -> &SpecializationCache {
        &self.by_types
    }

    /// Resolve the target for a call with `args`.
    pub fn resolve_call(
        &self,
        args: &[Value],
        receiver: Option<&ForeignObject>,
    ) -> Result<CallTarget, ResolveError> {
        let arg_types = self.mapper.map_values(args);
        self.resolve_call_types(&arg_types, receiver)
    }

    /// Resolve the target for a call whose arguments map to `arg_types`.
    pub fn resolve_call_types(
        &self,
        arg_types: &[Ty],
        receiver: Option<&ForeignObject>,
    ) -> Result<CallTarget, ResolveError> {
        let entry = self
            .by_args
            .get_or_create(arg_types.to_vec(), || self.specialize_for_args(arg_types))?;
        Ok(self.target(entry, receiver))
    }

    /// Resolve the target for a call and package it with its arguments.
    pub fn call(
        &self,
        args: &[Value],
        receiver: Option<&ForeignObject>,
    ) -> Result<Invocation, ResolveError> {
        let target = self.resolve_call(args, receiver)?;
        Ok(Invocation {
            target,
            args: args.to_vec(),
        })
    }

    /// Explicit instantiation with `type_args`.
    pub fn instantiate(
        &self,
        type_args: &[Ty],
        receiver: Option<&ForeignObject>,
    ) -> Result<CallTarget, ResolveError> {
        let entry = self
            .by_types
            .get_or_create(type_args.to_vec(), || self.specialize_for_types(type_args))?;
        Ok(self.target(entry, receiver))
    }

    /// A proxy over the single overload at `index`, with fresh caches.
    pub fn overload(&self, index: usize) -> Result<GenericMethod, ResolveError> {
        let method = self
            .group
            .methods
            .get(index)
            .cloned()
            .ok_or_else(|| ResolveError::InvalidOverloadIndex {
                method: self.group.name.clone(),
                index,
                len: self.group.len(),
            })?;
        Ok(self.rewrap(MethodGroup::single(method)))
    }

    /// A proxy over another group sharing this one's provider, mapper and policy.
    pub(crate) fn rewrap(&self, group: MethodGroup) -> GenericMethod {
        GenericMethod::new(group, self.provider.clone(), self.mapper.clone(), self.policy)
    }

    fn specialize_for_args(&self, arg_types: &[Ty]) -> Result<Specialization, ResolveError> {
        let selection = choose(&self.group, arg_types.len(), SelectBy::Arity, self.policy)?;
        let method = selection.method;
        if !method.is_generic() {
            tracing::debug!(method = %method, "not generic, passing the group through");
            return Ok(Specialization::Passthrough);
        }

        let inferred = infer_generic_args(&method, arg_types);
        let type_args = method
            .generic_params
            .iter()
            .zip(inferred)
            .map(|(param, ty)| {
                ty.ok_or_else(|| ResolveError::GenericArgumentUnresolved {
                    method: method.name.clone(),
                    param: param.name.clone(),
                })
            })
            .collect::<Result<Vec<Ty>, ResolveError>>()?;
        tracing::debug!(method = %method, ?type_args, "inferred generic arguments");

        specialize(&*self.provider, &method, &type_args).map(Specialization::Method)
    }

    fn specialize_for_types(&self, type_args: &[Ty]) -> Result<Specialization, ResolveError> {
        let selection = choose(&self.group, type_args.len(), SelectBy::TypeArity, self.policy)?;
        if !selection.method.is_generic() {
            return Ok(Specialization::Passthrough);
        }
        specialize(&*self.provider, &selection.method, type_args).map(Specialization::Method)
    }

    fn target(&self, entry: Specialization, receiver: Option<&ForeignObject>) -> CallTarget {
        match entry {
            Specialization::Passthrough => {
                let mut group = self.group.clone();
                group.receiver = receiver.cloned();
                CallTarget::Group(group)
            }
            Specialization::Method(method) => {
                CallTarget::Method(BoundMethod::new(method, receiver.cloned()))
            }
        }
    }
}

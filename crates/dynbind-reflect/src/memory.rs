//! A table-driven foreign runtime.
//!
//! `InMemoryRuntime` implements `ReflectionProvider` and `NamespaceEnumerator`
//! over type and method tables filled through a small builder API. Embedders
//! use it to mirror a foreign runtime's metadata; the test suites use it as
//! the runtime under test. Type substitution follows the usual rules: the
//! method must be an open generic definition, the type argument count must
//! match, and every constraint must be implemented by its argument.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::method::{MethodDescriptor, MethodHandle, MethodRef, ParamInfo};
use crate::provider::{NamespaceEnumerator, ReflectionProvider, SubstitutionError};
use crate::ty::{GenericParam, Ty, TypeName};

/// A type definition: its self type, direct interfaces and base type.
#[derive(Clone, Debug)]
pub struct TypeDef {
    pub name: TypeName,
    /// `Con(name)` for plain types, `App(name, [T0, ..])` for generic ones.
    pub ty: Ty,
    pub interfaces: Vec<Ty>,
    pub base: Option<Ty>,
}

impl TypeDef {
    pub fn class(qualified: &str) -> Self {
        let name = TypeName::parse(qualified);
        TypeDef {
            ty: Ty::Con(name.clone()),
            name,
            interfaces: Vec::new(),
            base: None,
        }
    }

    /// Interfaces are stored like classes; they matter only where other
    /// definitions list them in `implements`.
    pub fn interface(qualified: &str) -> Self {
        TypeDef::class(qualified)
    }

    /// Make the definition generic over the named type-level parameters.
    pub fn generic(mut self, params: &[&str]) -> Self {
        let args = params
            .iter()
            .enumerate()
            .map(|(i, p)| Ty::type_param(p, i))
            .collect();
        self.ty = Ty::App(self.name.clone(), args);
        self
    }

    pub fn extends(mut self, base: Ty) -> Self {
        self.base = Some(base);
        self
    }

    pub fn implements(mut self, iface: Ty) -> Self {
        self.interfaces.push(iface);
        self
    }
}

/// Builder for a method declared on a runtime type.
#[derive(Clone, Debug)]
pub struct MethodSig {
    name: String,
    generic_params: Vec<GenericParam>,
    params: Vec<ParamInfo>,
    return_type: Ty,
    is_static: bool,
    is_extension: bool,
}

impl MethodSig {
    pub fn new(name: impl Into<String>) -> Self {
        MethodSig {
            name: name.into(),
            generic_params: Vec::new(),
            params: Vec::new(),
            return_type: Ty::named("System.Void"),
            is_static: false,
            is_extension: false,
        }
    }

    /// Declare method-level generic parameters, in order.
    pub fn generic(mut self, names: &[&str]) -> Self {
        let start = self.generic_params.len();
        self.generic_params.extend(
            names
                .iter()
                .enumerate()
                .map(|(i, n)| GenericParam::method(*n, start + i)),
        );
        self
    }

    /// Add a constraint to an already declared generic parameter.
    pub fn constrain(mut self, param: &str, constraint: Ty) -> Self {
        if let Some(p) = self.generic_params.iter_mut().find(|p| p.name == param) {
            p.constraints.push(constraint);
        }
        self
    }

    pub fn param(mut self, name: impl Into<String>, ty: Ty) -> Self {
        self.params.push(ParamInfo::new(name, ty));
        self
    }

    pub fn returns(mut self, ty: Ty) -> Self {
        self.return_type = ty;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark as an extension method. Extension methods are static and their
    /// first parameter is the receiver.
    pub fn extension(mut self) -> Self {
        self.is_static = true;
        self.is_extension = true;
        self
    }
}

#[derive(Debug)]
struct TypeEntry {
    def: TypeDef,
    methods: Vec<MethodRef>,
}

/// Type and method tables behind the reflection traits.
#[derive(Default, Debug)]
pub struct InMemoryRuntime {
    types: RwLock<FxHashMap<TypeName, TypeEntry>>,
    /// Namespace -> declared type names, in definition order.
    namespaces: RwLock<FxHashMap<String, Vec<TypeName>>>,
    next_handle: AtomicU64,
    substitutions: AtomicUsize,
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) a type and return its self type.
    ///
    /// Redefinition replaces the hierarchy but keeps declared methods.
    pub fn define(&self, def: TypeDef) -> Ty {
        let ty = def.ty.clone();
        let name = def.name.clone();
        let mut types = self.types.write();
        match types.get_mut(&name) {
            Some(entry) => entry.def = def,
            None => {
                types.insert(
                    name.clone(),
                    TypeEntry {
                        def,
                        methods: Vec::new(),
                    },
                );
                self.namespaces
                    .write()
                    .entry(name.namespace.clone())
                    .or_default()
                    .push(name);
            }
        }
        ty
    }

    /// Declare a method on `owner`. An undefined owner is defined as a plain
    /// class first.
    pub fn add_method(&self, owner: &Ty, sig: MethodSig) -> MethodRef {
        let name = match owner.type_name() {
            Some(name) => name.clone(),
            None => TypeName::new("", owner.to_string()),
        };
        if !self.types.read().contains_key(&name) {
            self.define(TypeDef::class(&name.to_string()));
        }
        let method = Arc::new(MethodDescriptor {
            handle: MethodHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1),
            name: sig.name,
            declaring_type: owner.clone(),
            params: sig.params,
            generic_params: sig.generic_params,
            generic_args: Vec::new(),
            return_type: sig.return_type,
            is_static: sig.is_static,
            is_extension: sig.is_extension,
        });
        if let Some(entry) = self.types.write().get_mut(&name) {
            entry.methods.push(method.clone());
        }
        method
    }

    /// Whether `ty` is, inherits from, or implements the type named `target`.
    pub fn implements(&self, ty: &Ty, target: &TypeName) -> bool {
        let mut seen = FxHashSet::default();
        self.implements_inner(ty, target, &mut seen)
    }

    fn implements_inner(&self, ty: &Ty, target: &TypeName, seen: &mut FxHashSet<TypeName>) -> bool {
        let name = match ty.type_name() {
            Some(name) => name,
            None => return false,
        };
        if name == target {
            return true;
        }
        if !seen.insert(name.clone()) {
            return false;
        }
        let parents: Vec<Ty> = self
            .interfaces(ty)
            .into_iter()
            .chain(self.base_type(ty))
            .collect();
        parents
            .iter()
            .any(|parent| self.implements_inner(parent, target, seen))
    }

    /// How many substitutions `make_generic` has performed.
    pub fn substitution_count(&self) -> usize {
        self.substitutions.load(Ordering::SeqCst)
    }
}

impl ReflectionProvider for InMemoryRuntime {
    fn interfaces(&self, ty: &Ty) -> Vec<Ty> {
        ty.type_name()
            .and_then(|name| {
                self.types
                    .read()
                    .get(name)
                    .map(|entry| entry.def.interfaces.clone())
            })
            .unwrap_or_default()
    }

    fn base_type(&self, ty: &Ty) -> Option<Ty> {
        let name = ty.type_name()?;
        self.types.read().get(name).and_then(|entry| entry.def.base.clone())
    }

    fn methods(&self, ty: &Ty) -> Vec<MethodRef> {
        ty.type_name()
            .and_then(|name| self.types.read().get(name).map(|entry| entry.methods.clone()))
            .unwrap_or_default()
    }

    fn make_generic(
        &self,
        method: &MethodDescriptor,
        type_args: &[Ty],
    ) -> Result<MethodRef, SubstitutionError> {
        if !method.is_generic() {
            return Err(SubstitutionError::NotGeneric {
                method: method.name.clone(),
            });
        }
        if method.generic_params.len() != type_args.len() {
            return Err(SubstitutionError::ArityMismatch {
                method: method.name.clone(),
                expected: method.generic_params.len(),
                found: type_args.len(),
            });
        }

        for (param, arg) in method.generic_params.iter().zip(type_args) {
            if matches!(arg, Ty::Host(_)) || arg.contains_generic_params() {
                return Err(SubstitutionError::InvalidTypeArgument {
                    method: method.name.clone(),
                    param: param.name.clone(),
                    argument: arg.clone(),
                });
            }
            for constraint in &param.constraints {
                let satisfied = constraint
                    .type_name()
                    .is_some_and(|target| self.implements(arg, target));
                if !satisfied {
                    return Err(SubstitutionError::ConstraintNotSatisfied {
                        method: method.name.clone(),
                        param: param.name.clone(),
                        argument: arg.clone(),
                        constraint: constraint.clone(),
                    });
                }
            }
        }

        self.substitutions.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MethodDescriptor {
            params: method
                .params
                .iter()
                .map(|p| ParamInfo::new(p.name.clone(), p.ty.substitute_method_params(type_args)))
                .collect(),
            return_type: method.return_type.substitute_method_params(type_args),
            generic_args: type_args.to_vec(),
            ..method.clone()
        }))
    }
}

impl NamespaceEnumerator for InMemoryRuntime {
    fn types_in(&self, namespace: &str) -> Vec<Ty> {
        let names = match self.namespaces.read().get(namespace) {
            Some(names) => names.clone(),
            None => return Vec::new(),
        };
        let types = self.types.read();
        names
            .iter()
            .filter_map(|name| types.get(name).map(|entry| entry.def.ty.clone()))
            .collect()
    }
}

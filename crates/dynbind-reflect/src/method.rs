//! Method descriptors and method groups.
//!
//! A `MethodDescriptor` is what the foreign runtime reports about one method:
//! its formal parameters, generic parameters, return type and flags. Groups
//! collect the overloads that share one public name on a type.

use std::fmt;
use std::sync::Arc;

use crate::ty::{GenericParam, Ty};

/// Opaque foreign handle for a method definition.
///
/// Specializations of one generic method share the handle of their
/// definition; `MethodDescriptor::generic_args` tells them apart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodHandle(pub u64);

/// A formal parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamInfo {
    pub name: String,
    pub ty: Ty,
}

impl ParamInfo {
    pub fn new(name: impl Into<String>, ty: Ty) -> Self {
        ParamInfo { name: name.into(), ty }
    }
}

#[derive(Clone, Debug)]
pub struct MethodDescriptor {
    pub handle: MethodHandle,
    pub name: String,
    pub declaring_type: Ty,
    pub params: Vec<ParamInfo>,
    /// Generic parameters declared by the method definition, in order.
    pub generic_params: Vec<GenericParam>,
    /// Concrete types substituted for `generic_params`. Empty until the
    /// method has been specialized.
    pub generic_args: Vec<Ty>,
    pub return_type: Ty,
    pub is_static: bool,
    /// Carries the runtime's extension-method marker. The first formal
    /// parameter of an extension method is the implicit receiver.
    pub is_extension: bool,
}

impl PartialEq for MethodDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle && self.generic_args == other.generic_args
    }
}

impl Eq for MethodDescriptor {}

impl std::hash::Hash for MethodDescriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
        self.generic_args.hash(state);
    }
}

impl MethodDescriptor {
    /// Number of formal parameters (the receiver of an extension method counts).
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// True while the method still has unbound generic parameters.
    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty() && self.generic_args.is_empty()
    }

    /// The parameter that designates the implicit receiver, for extension methods.
    pub fn receiver_param(&self) -> Option<&ParamInfo> {
        if self.is_extension {
            self.params.first()
        } else {
            None
        }
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        let type_list: Vec<String> = if self.generic_args.is_empty() {
            self.generic_params.iter().map(|p| p.name.clone()).collect()
        } else {
            self.generic_args.iter().map(|a| a.to_string()).collect()
        };
        if !type_list.is_empty() {
            write!(f, "<{}>", type_list.join(", "))?;
        }
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", p.ty, p.name)?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

/// Shared, immutable method descriptor.
pub type MethodRef = Arc<MethodDescriptor>;

/// A foreign object as seen by the caller: its runtime type plus an opaque
/// handle owned by the native invoker.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ForeignObject {
    pub ty: Ty,
    pub handle: u64,
}

impl ForeignObject {
    pub fn new(ty: Ty, handle: u64) -> Self {
        ForeignObject { ty, handle }
    }
}

/// The overloads sharing one public name on a type, optionally bound to a
/// receiver.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodGroup {
    pub name: String,
    pub methods: Vec<MethodRef>,
    pub receiver: Option<ForeignObject>,
}

impl MethodGroup {
    pub fn new(name: impl Into<String>, methods: Vec<MethodRef>) -> Self {
        MethodGroup {
            name: name.into(),
            methods,
            receiver: None,
        }
    }

    /// A group holding exactly one method.
    pub fn single(method: MethodRef) -> Self {
        MethodGroup {
            name: method.name.clone(),
            methods: vec![method],
            receiver: None,
        }
    }

    pub fn bind(mut self, receiver: ForeignObject) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Whether any overload still has unbound generic parameters.
    pub fn contains_generic(&self) -> bool {
        self.methods.iter().any(|m| m.is_generic())
    }
}

//! Type descriptors for the foreign runtime.
//!
//! Defines the type identity (`TypeName`), generic placeholders
//! (`GenericParam`) and the `Ty` descriptor passed between every stage of
//! method resolution. Descriptors are plain values: they carry no handle into
//! the foreign runtime, so they can be hashed, compared and used as cache keys.

use std::fmt;

/// The identity of a foreign type definition: its namespace plus its
/// unqualified name.
///
/// Generic instantiations share the `TypeName` of their definition, so
/// `IList<Int32>` and `IList<String>` both carry `System.Collections.Generic.IList`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName {
    pub namespace: String,
    pub name: String,
}

impl TypeName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeName {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Split a dotted name at its last `.` (`System.Collections.Generic.IList`).
    /// A name without dots lands in the empty namespace.
    pub fn parse(qualified: &str) -> Self {
        match qualified.rsplit_once('.') {
            Some((namespace, name)) => TypeName::new(namespace, name),
            None => TypeName::new("", qualified),
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

/// Which declaration introduced a generic placeholder.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParamOwner {
    /// A type-level parameter, e.g. the `T` of `IList<T>`.
    Type,
    /// A method-level parameter, e.g. the `T` of `First<T>(...)`.
    Method,
}

/// A generic placeholder.
///
/// The `constraints` field lists the types a type argument must implement.
/// It is excluded from `PartialEq` and `Hash`: a placeholder is identified by
/// its owner, position and name only.
#[derive(Clone, Debug)]
pub struct GenericParam {
    pub name: String,
    pub position: usize,
    pub owner: ParamOwner,
    pub constraints: Vec<Ty>,
}

impl PartialEq for GenericParam {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.position == other.position && self.owner == other.owner
    }
}

impl Eq for GenericParam {}

impl std::hash::Hash for GenericParam {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.position.hash(state);
        self.owner.hash(state);
    }
}

impl GenericParam {
    pub fn method(name: impl Into<String>, position: usize) -> Self {
        GenericParam {
            name: name.into(),
            position,
            owner: ParamOwner::Method,
            constraints: Vec::new(),
        }
    }

    pub fn of_type(name: impl Into<String>, position: usize) -> Self {
        GenericParam {
            name: name.into(),
            position,
            owner: ParamOwner::Type,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: Ty) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// A foreign type descriptor.
///
/// - `Con`: a closed, non-generic type (`System.Int32`)
/// - `App`: a generic type applied to arguments (`IList<Int32>`, or
///   `IList<T>` when the arguments are still placeholders)
/// - `Param`: a generic placeholder
/// - `Host`: a caller-side type with no foreign counterpart. The type mapper
///   passes unrecognized value categories through as `Host`; the foreign
///   runtime rejects them when asked to substitute one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Con(TypeName),
    App(TypeName, Vec<Ty>),
    Param(GenericParam),
    Host(String),
}

impl Ty {
    /// Create a non-generic type from a dotted name.
    pub fn named(qualified: &str) -> Ty {
        Ty::Con(TypeName::parse(qualified))
    }

    /// Create a generic application from a dotted name.
    pub fn generic(qualified: &str, args: Vec<Ty>) -> Ty {
        Ty::App(TypeName::parse(qualified), args)
    }

    /// Create a method-level placeholder.
    pub fn method_param(name: &str, position: usize) -> Ty {
        Ty::Param(GenericParam::method(name, position))
    }

    /// Create a type-level placeholder.
    pub fn type_param(name: &str, position: usize) -> Ty {
        Ty::Param(GenericParam::of_type(name, position))
    }

    /// `System.Object`, the root of every base chain.
    pub fn object() -> Ty {
        Ty::named("System.Object")
    }

    /// `System.Int32`.
    pub fn int32() -> Ty {
        Ty::named("System.Int32")
    }

    /// `System.Int64`.
    pub fn int64() -> Ty {
        Ty::named("System.Int64")
    }

    /// `System.Double`.
    pub fn double() -> Ty {
        Ty::named("System.Double")
    }

    /// `System.String`.
    pub fn string() -> Ty {
        Ty::named("System.String")
    }

    /// `IList<T>`.
    pub fn list(elem: Ty) -> Ty {
        Ty::generic("System.Collections.Generic.IList", vec![elem])
    }

    /// `IDictionary<K, V>`.
    pub fn dictionary(key: Ty, value: Ty) -> Ty {
        Ty::generic("System.Collections.Generic.IDictionary", vec![key, value])
    }

    /// The definition name, if this is a foreign type.
    pub fn type_name(&self) -> Option<&TypeName> {
        match self {
            Ty::Con(name) | Ty::App(name, _) => Some(name),
            Ty::Param(_) | Ty::Host(_) => None,
        }
    }

    pub fn is_generic_param(&self) -> bool {
        matches!(self, Ty::Param(_))
    }

    /// Whether any placeholder occurs anywhere inside this type.
    pub fn contains_generic_params(&self) -> bool {
        match self {
            Ty::Param(_) => true,
            Ty::App(_, args) => args.iter().any(Ty::contains_generic_params),
            Ty::Con(_) | Ty::Host(_) => false,
        }
    }

    /// Whether `param` occurs anywhere inside this type.
    pub fn mentions(&self, param: &GenericParam) -> bool {
        match self {
            Ty::Param(p) => p == param,
            Ty::App(_, args) => args.iter().any(|a| a.mentions(param)),
            Ty::Con(_) | Ty::Host(_) => false,
        }
    }

    /// Replace method-level placeholders by position with `args`.
    ///
    /// Placeholders whose position is out of range, and type-level
    /// placeholders, are left untouched.
    pub fn substitute_method_params(&self, args: &[Ty]) -> Ty {
        match self {
            Ty::Param(p) if p.owner == ParamOwner::Method => match args.get(p.position) {
                Some(arg) => arg.clone(),
                None => self.clone(),
            },
            Ty::App(name, inner) => Ty::App(
                name.clone(),
                inner.iter().map(|a| a.substitute_method_params(args)).collect(),
            ),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Con(name) => write!(f, "{}", name),
            Ty::App(name, args) => {
                write!(f, "{}<", name)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ">")
            }
            Ty::Param(p) => write!(f, "{}", p.name),
            Ty::Host(name) => write!(f, "<host {}>", name),
        }
    }
}

//! Extension method registry.
//!
//! Scans namespaces for extension methods and indexes them by the type they
//! extend and their member name. The table only grows: namespaces are
//! scanned once, registration appends, and nothing is de-duplicated.
//!
//! The extended type of an extension method is the type of its receiver
//! parameter, with two adjustments:
//! - a generic placeholder receiver (`Describe<T>(T self)`) extends the
//!   universal object type;
//! - a generic application (`IList<T>`, `IList<Int32>`) is keyed by its
//!   definition, so the extension applies to every instantiation.

use std::fmt;

use dynbind_reflect::{MethodDescriptor, MethodRef, NamespaceEnumerator, ReflectionProvider, Ty};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};

/// (namespace, unqualified name) of an extended type, instantiation
/// arguments stripped.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtendedTypeKey {
    pub namespace: String,
    pub name: String,
}

impl ExtendedTypeKey {
    /// The key for `ty`; `None` for placeholders and host types.
    pub fn of(ty: &Ty) -> Option<Self> {
        ty.type_name().map(|name| ExtendedTypeKey {
            namespace: name.namespace.clone(),
            name: name.name.clone(),
        })
    }
}

impl fmt::Display for ExtendedTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

/// Extended type -> member name -> candidate methods, in registration order.
pub type ExtensionTable = FxHashMap<ExtendedTypeKey, FxHashMap<String, Vec<MethodRef>>>;

/// One row of `ExtensionRegistry::entries`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtensionEntry {
    pub extended: ExtendedTypeKey,
    pub member: String,
    pub methods: Vec<MethodRef>,
}

/// The type an extension method extends, or `None` if `method` is not an
/// extension method.
pub fn extended_type(method: &MethodDescriptor, object: &Ty) -> Option<Ty> {
    let receiver = method.receiver_param()?;
    Some(if receiver.ty.is_generic_param() {
        object.clone()
    } else {
        receiver.ty.clone()
    })
}

/// Every extension method declared by `types`, with its key.
pub fn find_extension_methods(
    provider: &dyn ReflectionProvider,
    types: &[Ty],
    object: &Ty,
) -> Vec<(ExtendedTypeKey, MethodRef)> {
    let mut found = Vec::new();
    for ty in types {
        for method in provider.methods(ty) {
            let key = extended_type(&method, object).and_then(|t| ExtendedTypeKey::of(&t));
            if let Some(key) = key {
                tracing::trace!(extends = %key, method = %method, "found extension method");
                found.push((key, method));
            }
        }
    }
    found
}

/// Group found extension methods into a table.
pub fn build_extension_table(found: Vec<(ExtendedTypeKey, MethodRef)>) -> ExtensionTable {
    let mut table = ExtensionTable::default();
    for (key, method) in found {
        table
            .entry(key)
            .or_default()
            .entry(method.name.clone())
            .or_default()
            .push(method);
    }
    table
}

#[derive(Debug)]
pub struct ExtensionRegistry {
    object: Ty,
    table: RwLock<ExtensionTable>,
    scanned: Mutex<FxHashSet<String>>,
}

impl ExtensionRegistry {
    /// `object` is the universal object type that placeholder receivers extend.
    pub fn new(object: Ty) -> Self {
        ExtensionRegistry {
            object,
            table: RwLock::new(ExtensionTable::default()),
            scanned: Mutex::new(FxHashSet::default()),
        }
    }

    pub fn object(&self) -> &Ty {
        &self.object
    }

    /// Scan `namespace` and register its extension methods.
    ///
    /// A namespace is scanned at most once; later calls return 0. The scan
    /// itself runs without holding the table lock, and its result is merged
    /// in one step, so namespaces may be scanned from several threads.
    pub fn build(
        &self,
        namespace: &str,
        provider: &dyn ReflectionProvider,
        enumerator: &dyn NamespaceEnumerator,
    ) -> usize {
        if !self.scanned.lock().insert(namespace.to_string()) {
            return 0;
        }
        let types = enumerator.types_in(namespace);
        let found = find_extension_methods(provider, &types, &self.object);
        let count = found.len();
        self.merge(build_extension_table(found));
        tracing::debug!(namespace, types = types.len(), extensions = count, "scanned namespace");
        count
    }

    /// Append `method` to the candidates for (`extended`, `member`).
    pub fn register(&self, extended: ExtendedTypeKey, member: &str, method: MethodRef) {
        self.table
            .write()
            .entry(extended)
            .or_default()
            .entry(member.to_string())
            .or_default()
            .push(method);
    }

    /// Append every candidate list of `table` to this registry.
    pub fn merge(&self, table: ExtensionTable) {
        let mut current = self.table.write();
        for (key, members) in table {
            let slot = current.entry(key).or_default();
            for (member, methods) in members {
                slot.entry(member).or_default().extend(methods);
            }
        }
    }

    /// Candidates registered directly on `extended` for `member`.
    pub fn lookup(&self, extended: &ExtendedTypeKey, member: &str) -> Option<Vec<MethodRef>> {
        self.table
            .read()
            .get(extended)
            .and_then(|members| members.get(member))
            .filter(|methods| !methods.is_empty())
            .cloned()
    }

    /// All registered extensions, sorted by namespace, then type name, then
    /// member name.
    pub fn entries(&self) -> Vec<ExtensionEntry> {
        let table = self.table.read();
        let mut entries: Vec<ExtensionEntry> = table
            .iter()
            .flat_map(|(key, members)| {
                members.iter().map(move |(member, methods)| ExtensionEntry {
                    extended: key.clone(),
                    member: member.clone(),
                    methods: methods.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| (&a.extended, &a.member).cmp(&(&b.extended, &b.member)));
        entries
    }

    pub fn scanned_namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scanned.lock().iter().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}

//! Foreign runtime model for dynbind.
//!
//! Describes what the resolution engine knows about a statically-typed
//! foreign runtime, without binding to any particular one:
//!
//! - [`ty`]: type descriptors (`Ty`, `TypeName`, `GenericParam`)
//! - [`method`]: method descriptors, method groups and foreign objects
//! - [`provider`]: the reflection and namespace traits the engine consumes
//! - [`memory`]: a table-driven runtime implementing those traits

pub mod memory;
pub mod method;
pub mod provider;
pub mod ty;

pub use memory::{InMemoryRuntime, MethodSig, TypeDef};
pub use method::{ForeignObject, MethodDescriptor, MethodGroup, MethodHandle, MethodRef, ParamInfo};
pub use provider::{NamespaceEnumerator, ReflectionProvider, SubstitutionError};
pub use ty::{GenericParam, ParamOwner, Ty, TypeName};

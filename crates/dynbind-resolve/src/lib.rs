//! Generic method specialization and extension method resolution.
//!
//! The resolution core of a dynamic-to-static interop bridge. Given a
//! foreign method group and the caller's argument values it decides which
//! concrete method the native invoker should call: it picks an overload,
//! infers generic arguments, asks the foreign runtime to specialize, and
//! caches the result. It also indexes extension methods by the type they
//! extend and resolves them through a receiver's interfaces and base chain.
//!
//! Everything hangs off a [`Session`](session::Session); there is no global
//! state.

pub mod cache;
pub mod config;
pub mod error;
pub mod extension;
pub mod generic;
pub mod infer;
pub mod overload;
pub mod resolver;
pub mod session;
pub mod specialize;
pub mod type_map;
pub mod value;

pub use cache::{ComputeOnceMap, SpecializationCache, SpecializationKey};
pub use config::{ConfigError, ExtensionConfig, OverloadConfig, OverloadPolicy, SessionConfig, TypeMapConfig};
pub use error::ResolveError;
pub use extension::{ExtendedTypeKey, ExtensionEntry, ExtensionRegistry, ExtensionTable};
pub use generic::GenericMethod;
pub use infer::infer_generic_args;
pub use overload::{choose, select, SelectBy, Selection};
pub use resolver::{ExtensionMethod, ExtensionResolver};
pub use session::{DeclaredMembers, ExtensionMembers, Member, MemberStrategy, Session, SessionBuilder};
pub use specialize::{specialize, BoundMethod, CallTarget, Invocation, Specialization};
pub use type_map::TypeMapper;
pub use value::Value;

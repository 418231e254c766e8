//! End-to-end tests for extension methods through a `Session`.
//!
//! These tests verify that:
//! - extensions are found on the receiver, its interfaces, then its bases
//! - interface declaration order decides between competing extensions
//! - extensions on a generic definition apply to every instantiation
//! - generic extensions infer from the receiver like any other argument
//! - namespaces can be loaded and resolved from several threads

use std::sync::Arc;

use dynbind_reflect::{ForeignObject, InMemoryRuntime, MethodRef, MethodSig, Ty, TypeDef};
use dynbind_resolve::{CallTarget, Member, ResolveError, Session, SessionConfig, Value};
use tracing_subscriber::EnvFilter;

// ── Helpers ────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn session(rt: &Arc<InMemoryRuntime>) -> Session {
    Session::builder(rt.clone(), rt.clone()).build()
}

fn object_of(qualified: &str) -> ForeignObject {
    ForeignObject::new(Ty::named(qualified), 1)
}

fn extension(rt: &InMemoryRuntime, owner: &str, name: &str, receiver: Ty) -> MethodRef {
    rt.add_method(
        &Ty::named(owner),
        MethodSig::new(name)
            .param("self", receiver)
            .returns(Ty::string())
            .extension(),
    )
}

fn extension_group(member: &Member) -> Vec<MethodRef> {
    match member {
        Member::Extension(ext) => ext.method().group().methods.clone(),
        other => panic!("expected an extension member, got {:?}", other),
    }
}

// ── Hierarchy Walk ─────────────────────────────────────────────────────

#[test]
fn test_describe_found_through_base_chain() {
    init_tracing();
    let rt = Arc::new(InMemoryRuntime::new());
    let root = rt.define(TypeDef::class("Demo.Root"));
    let base = rt.define(TypeDef::class("Demo.Base").extends(root.clone()));
    rt.define(TypeDef::class("Demo.Derived").extends(base));
    let describe = extension(&rt, "Ext.Describers", "Describe", root);

    let s = session(&rt);
    assert_eq!(s.namespace_loaded("Ext"), 1);

    let member = s.resolve_member(&object_of("Demo.Derived"), "Describe").unwrap();
    assert_eq!(extension_group(&member), vec![describe]);

    let invocation = member.call(&[]).unwrap();
    assert_eq!(invocation.args, vec![Value::Foreign(object_of("Demo.Derived"))]);
}

#[test]
fn test_first_interface_wins() {
    let rt = Arc::new(InMemoryRuntime::new());
    let i1 = rt.define(TypeDef::interface("Demo.IFirst"));
    let i2 = rt.define(TypeDef::interface("Demo.ISecond"));
    rt.define(TypeDef::class("Demo.Thing").implements(i1.clone()).implements(i2.clone()));
    // Registered in the opposite order to the interface list.
    extension(&rt, "Ext.SecondExtensions", "Describe", i2);
    let on_first = extension(&rt, "Ext.FirstExtensions", "Describe", i1);

    let s = session(&rt);
    s.namespace_loaded("Ext");

    let member = s.resolve_member(&object_of("Demo.Thing"), "Describe").unwrap();
    assert_eq!(extension_group(&member), vec![on_first]);
}

#[test]
fn test_interfaces_of_interfaces_before_base() {
    let rt = Arc::new(InMemoryRuntime::new());
    let inner = rt.define(TypeDef::interface("Demo.IInner"));
    let outer = rt.define(TypeDef::interface("Demo.IOuter").implements(inner.clone()));
    let parent = rt.define(TypeDef::class("Demo.Parent"));
    rt.define(TypeDef::class("Demo.Child").extends(parent.clone()).implements(outer));
    extension(&rt, "Ext.ParentExtensions", "Describe", parent);
    let on_inner = extension(&rt, "Ext.InnerExtensions", "Describe", inner);

    let s = session(&rt);
    s.namespace_loaded("Ext");

    let member = s.resolve_member(&object_of("Demo.Child"), "Describe").unwrap();
    assert_eq!(extension_group(&member), vec![on_inner]);
}

#[test]
fn test_resolution_is_deterministic() {
    let rt = Arc::new(InMemoryRuntime::new());
    let root = rt.define(TypeDef::class("Demo.Root"));
    rt.define(TypeDef::class("Demo.Leaf").extends(root.clone()));
    extension(&rt, "Ext.A", "Describe", root.clone());
    extension(&rt, "Ext.B", "Describe", root);

    let s = session(&rt);
    s.namespace_loaded("Ext");
    let leaf = Ty::named("Demo.Leaf");

    let first = s.resolver().resolve(s.registry(), s.provider(), &leaf, "Describe").unwrap();
    let second = s.resolver().resolve(s.registry(), s.provider(), &leaf, "Describe").unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[test]
fn test_missing_extension_falls_through() {
    let rt = Arc::new(InMemoryRuntime::new());
    rt.define(TypeDef::class("Demo.Lonely"));
    let s = session(&rt);

    let err = s.resolve_extension(&object_of("Demo.Lonely"), "Describe").unwrap_err();
    assert!(matches!(err, ResolveError::ExtensionMemberNotFound { .. }));

    let err = s.resolve_member(&object_of("Demo.Lonely"), "Describe").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"`Demo.Lonely` has no member `Describe`");
}

// ── Generic Extensions ─────────────────────────────────────────────────

fn linq_runtime() -> Arc<InMemoryRuntime> {
    let rt = Arc::new(InMemoryRuntime::new());
    rt.define(TypeDef::interface("System.Collections.Generic.IList").generic(&["T"]));
    let t = Ty::method_param("T", 0);
    rt.add_method(
        &Ty::named("System.Linq.Enumerable"),
        MethodSig::new("First")
            .generic(&["T"])
            .param("source", Ty::list(t.clone()))
            .returns(t)
            .extension(),
    );
    let result = Ty::method_param("TResult", 0);
    rt.add_method(
        &Ty::named("System.Linq.Enumerable"),
        MethodSig::new("Cast")
            .generic(&["TResult"])
            .param("source", Ty::list(Ty::object()))
            .returns(Ty::list(result))
            .extension(),
    );
    rt
}

#[test]
fn test_generic_definition_covers_instantiations() {
    init_tracing();
    let rt = linq_runtime();
    let config = SessionConfig::from_str("[extensions]\npreload = [\"System.Linq\"]").unwrap();
    let s = Session::builder(rt.clone(), rt.clone()).config(config).build();

    let ints = ForeignObject::new(Ty::list(Ty::int32()), 7);
    let texts = ForeignObject::new(Ty::list(Ty::string()), 8);

    let on_ints = s.call_member(&ints, "First", &[]).unwrap();
    let on_texts = s.call_member(&texts, "First", &[]).unwrap();
    assert_eq!(on_ints.target.method().unwrap().return_type, Ty::int32());
    assert_eq!(on_texts.target.method().unwrap().return_type, Ty::string());

    // One proxy for the whole definition; one specialization per element type.
    let member = s.resolve_extension(&ints, "First").unwrap();
    assert_eq!(member.method().call_cache().len(), 2);
    assert_eq!(rt.substitution_count(), 2);
}

#[test]
fn test_generic_extension_explicit_instantiation() {
    let rt = linq_runtime();
    let s = session(&rt);
    s.namespace_loaded("System.Linq");

    let items = ForeignObject::new(Ty::list(Ty::object()), 9);
    let cast = s.resolve_member(&items, "Cast").unwrap();

    // TResult appears in no parameter, so a plain call cannot infer it.
    let err = cast.call(&[]).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"cannot infer type argument `TResult` of `Cast` from the call arguments");

    let as_doubles = cast.instantiate(&[Ty::double()]).unwrap();
    assert!(as_doubles.is_extension());
    assert_eq!(as_doubles.receiver(), &items);
    let invocation = as_doubles.call(&[]).unwrap();
    assert_eq!(invocation.args, vec![Value::Foreign(items.clone())]);
    match invocation.target {
        CallTarget::Group(group) => {
            assert_eq!(group.methods[0].generic_args, vec![Ty::double()]);
            assert_eq!(group.methods[0].return_type, Ty::list(Ty::double()));
        }
        other => panic!("expected the instantiated group, got {:?}", other),
    }
}

// ── Concurrency ────────────────────────────────────────────────────────

#[test]
fn test_concurrent_loads_and_lookups() {
    init_tracing();
    let rt = linq_runtime();
    let root = rt.define(TypeDef::class("Demo.Root"));
    extension(&rt, "Ext.Describers", "Describe", root);
    let s = session(&rt);

    std::thread::scope(|scope| {
        for ns in ["System.Linq", "Ext", "System.Linq", "Ext"] {
            let s = &s;
            scope.spawn(move || s.namespace_loaded(ns));
        }
    });
    assert_eq!(s.registry().scanned_namespaces(), vec!["Ext", "System.Linq"]);
    assert_eq!(s.registry().entries().len(), 3);

    let ints = ForeignObject::new(Ty::list(Ty::int32()), 1);
    let targets: Vec<CallTarget> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let (s, ints) = (&s, &ints);
                scope.spawn(move || s.call_member(ints, "First", &[]).unwrap().target)
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(targets.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(rt.substitution_count(), 1);
}

//! Interop sessions.
//!
//! A `Session` owns everything member resolution needs for one interop
//! session: configuration, the foreign runtime handles, the extension
//! registry and resolver, and the generic proxies handed out so far. Member
//! lookup runs an ordered list of `MemberStrategy`s; the first one that
//! returns a member wins, and a strategy that returns `Ok(None)` lets the
//! next one try.

use std::convert::Infallible;
use std::sync::Arc;

use dynbind_reflect::{ForeignObject, MethodGroup, MethodRef, NamespaceEnumerator, ReflectionProvider, Ty};
use rustc_hash::FxHashSet;

use crate::cache::ComputeOnceMap;
use crate::config::SessionConfig;
use crate::error::ResolveError;
use crate::extension::{ExtendedTypeKey, ExtensionRegistry};
use crate::generic::GenericMethod;
use crate::resolver::{ExtensionMethod, ExtensionResolver};
use crate::specialize::Invocation;
use crate::type_map::TypeMapper;
use crate::value::Value;

/// One way of finding a member on a foreign object.
pub trait MemberStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` when this strategy does not know the member.
    fn try_resolve(
        &self,
        session: &Session,
        receiver: &ForeignObject,
        member: &str,
    ) -> Result<Option<Member>, ResolveError>;
}

/// Instance methods declared on the receiver's type or its base chain. The
/// first type that declares the name supplies all of its overloads.
pub struct DeclaredMembers;

impl MemberStrategy for DeclaredMembers {
    fn name(&self) -> &'static str {
        "declared"
    }

    fn try_resolve(
        &self,
        session: &Session,
        receiver: &ForeignObject,
        member: &str,
    ) -> Result<Option<Member>, ResolveError> {
        let provider = session.provider();
        let mut current = Some(receiver.ty.clone());
        let mut seen = FxHashSet::default();
        while let Some(ty) = current {
            if !seen.insert(ty.clone()) {
                break;
            }
            let methods: Vec<MethodRef> = provider
                .methods(&ty)
                .into_iter()
                .filter(|m| !m.is_static && m.name == member)
                .collect();
            if !methods.is_empty() {
                let key = ProxyKey::Declared(receiver.ty.clone(), member.to_string());
                let method = session.intern(key, || MethodGroup::new(member, methods));
                return Ok(Some(Member::Method {
                    method,
                    receiver: receiver.clone(),
                }));
            }
            current = provider.base_type(&ty);
        }
        Ok(None)
    }
}

/// Extension methods from the session's registry.
pub struct ExtensionMembers;

impl MemberStrategy for ExtensionMembers {
    fn name(&self) -> &'static str {
        "extension"
    }

    fn try_resolve(
        &self,
        session: &Session,
        receiver: &ForeignObject,
        member: &str,
    ) -> Result<Option<Member>, ResolveError> {
        match session.resolve_extension(receiver, member) {
            Ok(ext) => Ok(Some(Member::Extension(ext))),
            Err(ResolveError::ExtensionMemberNotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// A resolved member, ready to call.
#[derive(Clone, Debug)]
pub enum Member {
    /// An ordinary instance method group.
    Method {
        method: Arc<GenericMethod>,
        receiver: ForeignObject,
    },
    Extension(ExtensionMethod),
}

impl Member {
    pub fn call(&self, args: &[Value]) -> Result<Invocation, ResolveError> {
        match self {
            Member::Method { method, receiver } => method.call(args, Some(receiver)),
            Member::Extension(ext) => ext.call(args),
        }
    }

    /// Explicitly specialize the member with `type_args`.
    pub fn instantiate(&self, type_args: &[Ty]) -> Result<Member, ResolveError> {
        match self {
            Member::Method { method, receiver } => {
                let target = method.instantiate(type_args, None)?;
                Ok(Member::Method {
                    method: Arc::new(method.rewrap(target.into_group())),
                    receiver: receiver.clone(),
                })
            }
            Member::Extension(ext) => ext.instantiate(type_args).map(Member::Extension),
        }
    }

    pub fn is_extension(&self) -> bool {
        matches!(self, Member::Extension(_))
    }

    pub fn group(&self) -> &MethodGroup {
        match self {
            Member::Method { method, .. } => method.group(),
            Member::Extension(ext) => ext.method().group(),
        }
    }

    pub fn receiver(&self) -> &ForeignObject {
        match self {
            Member::Method { receiver, .. } => receiver,
            Member::Extension(ext) => ext.receiver(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ProxyKey {
    /// Declared members, per receiver type.
    Declared(Ty, String),
    /// Extension members, per extended type definition like the resolver memo.
    Extension(ExtendedTypeKey, String),
}

pub struct Session {
    config: SessionConfig,
    provider: Arc<dyn ReflectionProvider>,
    namespaces: Arc<dyn NamespaceEnumerator>,
    mapper: Arc<TypeMapper>,
    registry: ExtensionRegistry,
    resolver: ExtensionResolver,
    proxies: ComputeOnceMap<ProxyKey, Arc<GenericMethod>>,
    strategies: Vec<Box<dyn MemberStrategy>>,
}

impl Session {
    pub fn builder(
        provider: Arc<dyn ReflectionProvider>,
        namespaces: Arc<dyn NamespaceEnumerator>,
    ) -> SessionBuilder {
        SessionBuilder {
            provider,
            namespaces,
            config: SessionConfig::default(),
            strategies: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn provider(&self) -> &dyn ReflectionProvider {
        &*self.provider
    }

    pub fn mapper(&self) -> &TypeMapper {
        &self.mapper
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &ExtensionResolver {
        &self.resolver
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Called by the module loader whenever a foreign namespace is loaded.
    /// Returns the number of extension methods registered; repeat loads of
    /// the same namespace register nothing.
    pub fn namespace_loaded(&self, namespace: &str) -> usize {
        if !self.config.extensions.enabled {
            return 0;
        }
        self.registry
            .build(namespace, &*self.provider, &*self.namespaces)
    }

    /// Find `member` on `receiver`, trying each strategy in order.
    pub fn resolve_member(
        &self,
        receiver: &ForeignObject,
        member: &str,
    ) -> Result<Member, ResolveError> {
        for strategy in &self.strategies {
            if let Some(found) = strategy.try_resolve(self, receiver, member)? {
                tracing::debug!(ty = %receiver.ty, member, strategy = strategy.name(), "member resolved");
                return Ok(found);
            }
        }
        Err(ResolveError::MemberNotFound {
            ty: receiver.ty.clone(),
            member: member.to_string(),
        })
    }

    /// Resolve `member` on `receiver` and resolve a call to it with `args`.
    pub fn call_member(
        &self,
        receiver: &ForeignObject,
        member: &str,
        args: &[Value],
    ) -> Result<Invocation, ResolveError> {
        self.resolve_member(receiver, member)?.call(args)
    }

    /// Find the extension method `member` for `receiver`.
    pub fn resolve_extension(
        &self,
        receiver: &ForeignObject,
        member: &str,
    ) -> Result<ExtensionMethod, ResolveError> {
        let methods = self
            .resolver
            .resolve(&self.registry, &*self.provider, &receiver.ty, member)?;
        let key = ExtendedTypeKey::of(&receiver.ty).ok_or_else(|| {
            ResolveError::ExtensionMemberNotFound {
                ty: receiver.ty.clone(),
                member: member.to_string(),
            }
        })?;
        let method = self.intern(ProxyKey::Extension(key, member.to_string()), || {
            MethodGroup::new(member, methods)
        });
        Ok(ExtensionMethod::new(method, receiver.clone()))
    }

    /// A fresh proxy over `group` using this session's runtime and policy.
    /// Proxies from `wrap` are not interned.
    pub fn wrap(&self, group: MethodGroup) -> GenericMethod {
        GenericMethod::new(
            group,
            self.provider.clone(),
            self.mapper.clone(),
            self.config.overloads.policy,
        )
    }

    fn intern(&self, key: ProxyKey, group: impl FnOnce() -> MethodGroup) -> Arc<GenericMethod> {
        let result = self
            .proxies
            .get_or_create(key, || Ok::<_, Infallible>(Arc::new(self.wrap(group()))));
        match result {
            Ok(proxy) => proxy,
            Err(never) => match never {},
        }
    }
}

pub struct SessionBuilder {
    provider: Arc<dyn ReflectionProvider>,
    namespaces: Arc<dyn NamespaceEnumerator>,
    config: SessionConfig,
    strategies: Option<Vec<Box<dyn MemberStrategy>>>,
}

impl SessionBuilder {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a strategy after the current list (the defaults, unless
    /// `strategies` replaced them).
    pub fn strategy(mut self, strategy: Box<dyn MemberStrategy>) -> Self {
        let config = &self.config;
        self.strategies
            .get_or_insert_with(|| default_strategies(config))
            .push(strategy);
        self
    }

    /// Replace the strategy list.
    pub fn strategies(mut self, strategies: Vec<Box<dyn MemberStrategy>>) -> Self {
        self.strategies = Some(strategies);
        self
    }

    /// Build the session and scan the configured preload namespaces.
    pub fn build(self) -> Session {
        let strategies = match self.strategies {
            Some(strategies) => strategies,
            None => default_strategies(&self.config),
        };
        let mapper = Arc::new(TypeMapper::new(&self.config.type_map));
        let session = Session {
            registry: ExtensionRegistry::new(mapper.object().clone()),
            resolver: ExtensionResolver::new(),
            proxies: ComputeOnceMap::new(),
            mapper,
            provider: self.provider,
            namespaces: self.namespaces,
            config: self.config,
            strategies,
        };
        for namespace in &session.config.extensions.preload {
            session.namespace_loaded(namespace);
        }
        tracing::debug!(
            strategies = ?session.strategy_names(),
            preloaded = session.config.extensions.preload.len(),
            "session ready"
        );
        session
    }
}

fn default_strategies(config: &SessionConfig) -> Vec<Box<dyn MemberStrategy>> {
    let mut strategies: Vec<Box<dyn MemberStrategy>> = vec![Box::new(DeclaredMembers)];
    if config.extensions.enabled {
        strategies.push(Box::new(ExtensionMembers));
    }
    strategies
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynbind_reflect::{InMemoryRuntime, MethodSig, TypeDef};

    use crate::config::OverloadPolicy;
    use crate::specialize::CallTarget;

    fn runtime() -> Arc<InMemoryRuntime> {
        let rt = Arc::new(InMemoryRuntime::new());
        let widget = rt.define(TypeDef::class("Demo.Widget"));
        rt.add_method(&widget, MethodSig::new("Render").returns(Ty::string()));
        rt.add_method(&widget, MethodSig::new("Create").static_method());
        rt.add_method(
            &Ty::named("Ext.WidgetExtensions"),
            MethodSig::new("Tag").param("self", widget).param("label", Ty::string()).extension(),
        );
        rt
    }

    fn session(rt: &Arc<InMemoryRuntime>, config: SessionConfig) -> Session {
        Session::builder(rt.clone(), rt.clone()).config(config).build()
    }

    fn widget() -> ForeignObject {
        ForeignObject::new(Ty::named("Demo.Widget"), 10)
    }

    #[test]
    fn declared_members_come_first() {
        let rt = runtime();
        let s = session(&rt, SessionConfig::default());
        s.namespace_loaded("Ext");

        let render = s.resolve_member(&widget(), "Render").unwrap();
        assert!(!render.is_extension());
        let tag = s.resolve_member(&widget(), "Tag").unwrap();
        assert!(tag.is_extension());
    }

    #[test]
    fn static_methods_are_not_instance_members() {
        let rt = runtime();
        let s = session(&rt, SessionConfig::default());
        let err = s.resolve_member(&widget(), "Create").unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"`Demo.Widget` has no member `Create`");
    }

    #[test]
    fn cyclic_base_chain_terminates() {
        let rt = Arc::new(InMemoryRuntime::new());
        let b = Ty::named("Demo.B");
        rt.define(TypeDef::class("Demo.A").extends(b.clone()));
        rt.define(TypeDef::class("Demo.B").extends(Ty::named("Demo.A")));
        rt.add_method(&b, MethodSig::new("Ping"));
        let s = session(&rt, SessionConfig::default());
        let a = ForeignObject::new(Ty::named("Demo.A"), 3);

        assert!(!s.resolve_member(&a, "Ping").unwrap().is_extension());
        let err = s.resolve_member(&a, "Missing").unwrap_err();
        assert!(matches!(err, ResolveError::MemberNotFound { .. }));
    }

    #[test]
    fn extension_call_prepends_receiver() {
        let rt = runtime();
        let s = session(&rt, SessionConfig::default());
        s.namespace_loaded("Ext");

        let invocation = s
            .call_member(&widget(), "Tag", &[Value::Text("x".into())])
            .unwrap();
        assert_eq!(
            invocation.args,
            vec![Value::Foreign(widget()), Value::Text("x".into())]
        );
        assert!(matches!(invocation.target, CallTarget::Group(ref g) if g.receiver.is_none()));
    }

    #[test]
    fn proxies_are_interned() {
        let rt = runtime();
        let s = session(&rt, SessionConfig::default());
        s.namespace_loaded("Ext");
        let other = ForeignObject::new(Ty::named("Demo.Widget"), 11);

        let a = s.resolve_extension(&widget(), "Tag").unwrap();
        let b = s.resolve_extension(&other, "Tag").unwrap();
        assert!(Arc::ptr_eq(a.method(), b.method()));
        assert_eq!(b.receiver(), &other);
    }

    #[test]
    fn disabled_extensions() {
        let rt = runtime();
        let config = SessionConfig::from_str("[extensions]\nenabled = false\npreload = [\"Ext\"]").unwrap();
        let s = session(&rt, config);
        assert_eq!(s.strategy_names(), vec!["declared"]);
        assert!(s.registry().is_empty());
        assert_eq!(s.namespace_loaded("Ext"), 0);
        assert!(matches!(
            s.resolve_member(&widget(), "Tag"),
            Err(ResolveError::MemberNotFound { .. })
        ));
    }

    #[test]
    fn preload_scans_on_build() {
        let rt = runtime();
        let config = SessionConfig::from_str("[extensions]\npreload = [\"Ext\"]").unwrap();
        let s = session(&rt, config);
        assert_eq!(s.registry().scanned_namespaces(), vec!["Ext"]);
        assert_eq!(s.namespace_loaded("Ext"), 0);
        assert!(s.resolve_member(&widget(), "Tag").unwrap().is_extension());
    }

    struct Fixed;

    impl MemberStrategy for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn try_resolve(
            &self,
            session: &Session,
            receiver: &ForeignObject,
            member: &str,
        ) -> Result<Option<Member>, ResolveError> {
            if member != "Answer" {
                return Ok(None);
            }
            let group = MethodGroup::new("Answer", vec![]);
            Ok(Some(Member::Method {
                method: Arc::new(session.wrap(group)),
                receiver: receiver.clone(),
            }))
        }
    }

    #[test]
    fn custom_strategies() {
        let rt = runtime();
        let appended = Session::builder(rt.clone(), rt.clone()).strategy(Box::new(Fixed)).build();
        assert_eq!(appended.strategy_names(), vec!["declared", "extension", "fixed"]);
        assert_eq!(appended.resolve_member(&widget(), "Answer").unwrap().group().name, "Answer");

        let replaced = Session::builder(rt.clone(), rt.clone())
            .strategies(vec![Box::new(Fixed)])
            .build();
        assert_eq!(replaced.strategy_names(), vec!["fixed"]);
        assert!(replaced.resolve_member(&widget(), "Render").is_err());
    }

    #[test]
    fn member_instantiation_keeps_receiver() {
        let rt = runtime();
        let u = Ty::method_param("U", 0);
        rt.add_method(
            &Ty::named("Demo.Widget"),
            MethodSig::new("As").generic(&["U"]).returns(u),
        );
        let config = SessionConfig::from_str("[overloads]\npolicy = \"strict\"").unwrap();
        let s = session(&rt, config);
        assert_eq!(s.config().overloads.policy, OverloadPolicy::Strict);

        let member = s.resolve_member(&widget(), "As").unwrap();
        let closed = member.instantiate(&[Ty::string()]).unwrap();
        assert_eq!(closed.receiver(), &widget());
        assert_eq!(closed.group().methods[0].return_type, Ty::string());

        // A lone overload is always selected; the runtime rejects the arity.
        let err = member.instantiate(&[Ty::string(), Ty::int32()]).unwrap_err();
        assert!(matches!(err, ResolveError::ConstraintViolation { .. }));
    }
}

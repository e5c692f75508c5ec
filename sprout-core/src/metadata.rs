//! 类型元数据 - 反射的等价物
//!
//! Rust 没有运行时反射，容器需要的一切信息（组件标记、构造函数、字段、
//! 方法、实现的接口、生命周期方法）都通过 [`BeanClass`] 描述符在启动时
//! 显式登记，容器在运行时按 `TypeId` 查询。

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Context as _;
use parking_lot::RwLock;

use crate::bean::{Instance, RawInstance};
use crate::utils::naming;
use crate::Scope;

/// 类型种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// 具体类型（struct / enum）
    Concrete,
    /// 接口（trait object）
    Interface,
    /// 任意类型，不做类型检查
    Any,
}

/// 类型信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    id: TypeId,
    /// 该类型的值在 `Instance` 中的实际类型：具体类型为 `T`，接口为 `Arc<dyn Trait>`
    value_id: TypeId,
    name: &'static str,
    kind: TypeKind,
}

impl TypeInfo {
    /// 具体类型
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            value_id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: TypeKind::Concrete,
        }
    }

    /// 接口类型，例如 `TypeInfo::interface::<dyn UserRepository>()`
    pub fn interface<I: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<I>(),
            value_id: TypeId::of::<Arc<I>>(),
            name: type_name::<I>(),
            kind: TypeKind::Interface,
        }
    }

    /// 接受任意值
    pub fn any() -> Self {
        Self {
            id: TypeId::of::<dyn Any + Send + Sync>(),
            value_id: TypeId::of::<dyn Any + Send + Sync>(),
            name: "any",
            kind: TypeKind::Any,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn value_type_id(&self) -> TypeId {
        self.value_id
    }

    /// 完整类型名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// 简单名称（去掉模块路径）
    pub fn simple_name(&self) -> &'static str {
        naming::simple_type_name(self.name)
    }

    /// 模块路径，作为扫描时的"包名"
    pub fn module_path(&self) -> &'static str {
        naming::module_path_of(self.name)
    }

    /// 规范 Bean 名称：简单名称的小驼峰形式
    pub fn bean_name(&self) -> String {
        naming::to_camel_case(self.simple_name())
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ========== 声明式标记 ==========

/// 组件的构造型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stereotype {
    Component,
    Service,
    Controller,
    Repository,
}

/// 组件标记（类似 `@Component` / `@Service` / `@Controller` / `@Repository`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentMarker {
    pub stereotype: Stereotype,
    /// 显式 Bean 名称，为空时使用类型名的小驼峰形式
    pub name: Option<&'static str>,
    pub scope: Scope,
    pub init_method: Option<&'static str>,
    pub destroy_method: Option<&'static str>,
}

impl ComponentMarker {
    fn with_stereotype(stereotype: Stereotype) -> Self {
        Self {
            stereotype,
            name: None,
            scope: Scope::Singleton,
            init_method: None,
            destroy_method: None,
        }
    }

    pub fn component() -> Self {
        Self::with_stereotype(Stereotype::Component)
    }

    pub fn service() -> Self {
        Self::with_stereotype(Stereotype::Service)
    }

    pub fn controller() -> Self {
        Self::with_stereotype(Stereotype::Controller)
    }

    pub fn repository() -> Self {
        Self::with_stereotype(Stereotype::Repository)
    }

    pub fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_init(mut self, method: &'static str) -> Self {
        self.init_method = Some(method);
        self
    }

    pub fn with_destroy(mut self, method: &'static str) -> Self {
        self.destroy_method = Some(method);
        self
    }
}

/// 依赖注入标记（类似 `@Autowired`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Autowired {
    /// 显式指定的 Bean 名称
    pub name: Option<&'static str>,
}

impl Autowired {
    /// 按类型注入
    pub fn by_type() -> Self {
        Self { name: None }
    }

    /// 按名称注入
    pub fn named(name: &'static str) -> Self {
        Self { name: Some(name) }
    }
}

/// "生产一个 Bean" 的方法标记（类似 `@Bean`）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BeanMarker {
    /// Bean 名称，为空时使用返回类型的小驼峰形式
    pub name: Option<&'static str>,
    pub scope: Scope,
    pub init_method: Option<&'static str>,
    pub destroy_method: Option<&'static str>,
}

impl BeanMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: &'static str) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_init(mut self, method: &'static str) -> Self {
        self.init_method = Some(method);
        self
    }

    pub fn with_destroy(mut self, method: &'static str) -> Self {
        self.destroy_method = Some(method);
        self
    }
}

// ========== 可调用元数据 ==========

pub type ConstructorFn = Arc<dyn Fn(&[Instance]) -> anyhow::Result<RawInstance> + Send + Sync>;
pub type StaticMethodFn = Arc<dyn Fn(&[Instance]) -> anyhow::Result<RawInstance> + Send + Sync>;
pub type InstanceMethodFn =
    Arc<dyn Fn(&(dyn Any + Send + Sync), &[Instance]) -> anyhow::Result<RawInstance> + Send + Sync>;
pub type FieldInjector =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync), Instance) -> anyhow::Result<()> + Send + Sync>;
pub type LifecycleFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync)) -> anyhow::Result<()> + Send + Sync>;
pub type InterfaceCast = Arc<dyn Fn(Instance) -> Option<Instance> + Send + Sync>;

/// 参数元数据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamMeta {
    pub ty: TypeInfo,
    /// 显式指定注入的 Bean 名称
    pub qualifier: Option<&'static str>,
}

impl ParamMeta {
    pub fn new(ty: TypeInfo) -> Self {
        Self { ty, qualifier: None }
    }

    pub fn of<T: Any>() -> Self {
        Self::new(TypeInfo::of::<T>())
    }

    pub fn interface<I: ?Sized + 'static>() -> Self {
        Self::new(TypeInfo::interface::<I>())
    }

    pub fn any() -> Self {
        Self::new(TypeInfo::any())
    }

    pub fn qualified(mut self, bean_name: &'static str) -> Self {
        self.qualifier = Some(bean_name);
        self
    }
}

/// 构造函数元数据
#[derive(Clone)]
pub struct ConstructorMeta {
    params: Vec<ParamMeta>,
    call: ConstructorFn,
}

impl ConstructorMeta {
    pub fn new<T, F>(params: Vec<ParamMeta>, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&[Instance]) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            params,
            call: Arc::new(move |args| Ok(Box::new(constructor(args)?) as RawInstance)),
        }
    }

    pub fn params(&self) -> &[ParamMeta] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn invoke(&self, args: &[Instance]) -> anyhow::Result<RawInstance> {
        (self.call)(args)
    }
}

impl fmt::Debug for ConstructorMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorMeta")
            .field("params", &self.params)
            .finish()
    }
}

/// 方法种类
#[derive(Clone)]
pub enum MethodKind {
    /// 关联函数（静态方法），没有接收者
    Static(StaticMethodFn),
    /// 实例方法
    Instance(InstanceMethodFn),
}

/// 方法元数据
#[derive(Clone)]
pub struct MethodMeta {
    owner: &'static str,
    name: &'static str,
    params: Vec<ParamMeta>,
    returns: TypeInfo,
    kind: MethodKind,
    bean: Option<BeanMarker>,
}

impl MethodMeta {
    /// 实例方法：`f(&self, args)`
    pub fn instance<S, R, F>(name: &'static str, params: Vec<ParamMeta>, method: F) -> Self
    where
        S: Any + Send + Sync,
        R: Any + Send + Sync,
        F: Fn(&S, &[Instance]) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        let call: InstanceMethodFn = Arc::new(move |receiver, args| {
            let receiver = receiver
                .downcast_ref::<S>()
                .with_context(|| format!("receiver of '{}' is not a {}", name, type_name::<S>()))?;
            Ok(Box::new(method(receiver, args)?) as RawInstance)
        });

        Self {
            owner: type_name::<S>(),
            name,
            params,
            returns: TypeInfo::of::<R>(),
            kind: MethodKind::Instance(call),
            bean: None,
        }
    }

    /// 静态方法：`f(args)`
    pub fn static_fn<R, F>(name: &'static str, params: Vec<ParamMeta>, method: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&[Instance]) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        Self {
            owner: "",
            name,
            params,
            returns: TypeInfo::of::<R>(),
            kind: MethodKind::Static(Arc::new(move |args| {
                Ok(Box::new(method(args)?) as RawInstance)
            })),
            bean: None,
        }
    }

    /// 覆盖返回类型，例如方法返回 `Arc<dyn Trait>` 时声明为接口
    pub fn returning(mut self, ty: TypeInfo) -> Self {
        self.returns = ty;
        self
    }

    /// 标记该方法生产一个 Bean
    pub fn with_bean(mut self, marker: BeanMarker) -> Self {
        self.bean = Some(marker);
        self
    }

    /// 声明该方法的类型名称
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[ParamMeta] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn returns(&self) -> TypeInfo {
        self.returns
    }

    pub fn is_static(&self) -> bool {
        matches!(self.kind, MethodKind::Static(_))
    }

    pub fn bean_marker(&self) -> Option<&BeanMarker> {
        self.bean.as_ref()
    }

    /// 调用方法；实例方法需要接收者
    pub fn invoke(&self, receiver: Option<&Instance>, args: &[Instance]) -> anyhow::Result<RawInstance> {
        match &self.kind {
            MethodKind::Static(call) => call(args),
            MethodKind::Instance(call) => {
                let receiver = receiver
                    .with_context(|| format!("instance method '{}' called without a receiver", self.name))?;
                call(&**receiver, args)
            }
        }
    }
}

impl fmt::Debug for MethodMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodMeta")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns.name())
            .field("static", &self.is_static())
            .field("bean", &self.bean)
            .finish()
    }
}

/// 字段元数据
#[derive(Clone)]
pub struct FieldMeta {
    name: &'static str,
    ty: TypeInfo,
    autowired: Option<Autowired>,
    inject: FieldInjector,
}

impl FieldMeta {
    pub fn new<S, F>(name: &'static str, ty: TypeInfo, injector: F) -> Self
    where
        S: Any + Send + Sync,
        F: Fn(&mut S, Instance) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name,
            ty,
            autowired: None,
            inject: Arc::new(move |target, value| {
                let target = target
                    .downcast_mut::<S>()
                    .with_context(|| format!("field owner is not a {}", type_name::<S>()))?;
                injector(target, value)
            }),
        }
    }

    pub fn autowired(mut self, marker: Autowired) -> Self {
        self.autowired = Some(marker);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ty(&self) -> TypeInfo {
        self.ty
    }

    pub fn autowired_marker(&self) -> Option<&Autowired> {
        self.autowired.as_ref()
    }

    pub fn inject(&self, target: &mut (dyn Any + Send + Sync), value: Instance) -> anyhow::Result<()> {
        (self.inject)(target, value)
    }
}

impl fmt::Debug for FieldMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMeta")
            .field("name", &self.name)
            .field("ty", &self.ty.name())
            .field("autowired", &self.autowired)
            .finish()
    }
}

/// 按名称调用的生命周期方法（init / destroy）
#[derive(Clone)]
pub struct LifecycleMethod {
    name: &'static str,
    call: LifecycleFn,
}

impl LifecycleMethod {
    pub fn new<S, F>(name: &'static str, hook: F) -> Self
    where
        S: Any + Send + Sync,
        F: Fn(&mut S) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name,
            call: Arc::new(move |target| {
                let target = target
                    .downcast_mut::<S>()
                    .with_context(|| format!("lifecycle target is not a {}", type_name::<S>()))?;
                hook(target)
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn invoke(&self, target: &mut (dyn Any + Send + Sync)) -> anyhow::Result<()> {
        (self.call)(target)
    }
}

impl fmt::Debug for LifecycleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LifecycleMethod({})", self.name)
    }
}

/// 实现的接口，以及把具体实例转换为 `Arc<dyn Trait>` 的函数
///
/// 通常通过 [`interface!`](crate::interface) 宏创建。
#[derive(Clone)]
pub struct InterfaceMeta {
    ty: TypeInfo,
    cast: InterfaceCast,
}

impl InterfaceMeta {
    pub fn new<I, F>(cast: F) -> Self
    where
        I: ?Sized + 'static,
        F: Fn(Instance) -> Option<Instance> + Send + Sync + 'static,
    {
        Self {
            ty: TypeInfo::interface::<I>(),
            cast: Arc::new(cast),
        }
    }

    pub fn ty(&self) -> TypeInfo {
        self.ty
    }

    /// 转换成功时返回的实例内部是 `Arc<dyn Trait>`
    pub fn cast(&self, bean: Instance) -> Option<Instance> {
        (self.cast)(bean)
    }
}

impl fmt::Debug for InterfaceMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterfaceMeta({})", self.ty.name())
    }
}

/// 声明一个类型实现了某个接口
///
/// ```ignore
/// BeanClass::builder::<MemoryUserRepository>()
///     .implements(interface!(MemoryUserRepository => dyn UserRepository))
/// ```
#[macro_export]
macro_rules! interface {
    ($concrete:ty => $iface:ty) => {
        $crate::metadata::InterfaceMeta::new::<$iface, _>(|bean: $crate::Instance| {
            bean.downcast::<$concrete>().ok().map(|concrete| {
                let upcast: ::std::sync::Arc<$iface> = concrete;
                ::std::sync::Arc::new(upcast) as $crate::Instance
            })
        })
    };
}

// ========== 类描述符 ==========

/// 一个类型的全部元数据
pub struct BeanClass {
    ty: TypeInfo,
    component: Option<ComponentMarker>,
    interfaces: Vec<InterfaceMeta>,
    constructors: Vec<ConstructorMeta>,
    fields: Vec<FieldMeta>,
    methods: Vec<MethodMeta>,
    lifecycle: Vec<LifecycleMethod>,
}

impl BeanClass {
    pub fn builder<T: Any + Send + Sync>() -> BeanClassBuilder {
        BeanClassBuilder {
            class: BeanClass {
                ty: TypeInfo::of::<T>(),
                component: None,
                interfaces: Vec::new(),
                constructors: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                lifecycle: Vec::new(),
            },
        }
    }

    pub fn ty(&self) -> TypeInfo {
        self.ty
    }

    pub fn type_id(&self) -> TypeId {
        self.ty.id()
    }

    pub fn name(&self) -> &'static str {
        self.ty.name()
    }

    pub fn simple_name(&self) -> &'static str {
        self.ty.simple_name()
    }

    pub fn module_path(&self) -> &'static str {
        self.ty.module_path()
    }

    pub fn component(&self) -> Option<&ComponentMarker> {
        self.component.as_ref()
    }

    /// 组件 Bean 名称：没有组件标记时为 `None`，
    /// 标记上名称为空时使用类型名的小驼峰形式
    pub fn component_name(&self) -> Option<String> {
        let marker = self.component.as_ref()?;
        match marker.name {
            Some(name) if !naming::is_blank(name) => Some(name.to_string()),
            _ => Some(self.ty.bean_name()),
        }
    }

    pub fn interfaces(&self) -> &[InterfaceMeta] {
        &self.interfaces
    }

    pub fn interface(&self, ty: &TypeInfo) -> Option<&InterfaceMeta> {
        self.interfaces.iter().find(|i| i.ty().id() == ty.id())
    }

    pub fn implements(&self, ty: &TypeInfo) -> bool {
        self.interface(ty).is_some()
    }

    pub fn constructors(&self) -> &[ConstructorMeta] {
        &self.constructors
    }

    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn methods(&self) -> &[MethodMeta] {
        &self.methods
    }

    /// 按名称和参数个数查找方法，多个重载时取第一个声明的
    pub fn find_method(&self, name: &str, arity: usize, is_static: bool) -> Option<&MethodMeta> {
        self.methods
            .iter()
            .find(|m| m.name() == name && m.arity() == arity && m.is_static() == is_static)
    }

    pub fn lifecycle_method(&self, name: &str) -> Option<&LifecycleMethod> {
        self.lifecycle.iter().find(|m| m.name() == name)
    }
}

impl fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanClass")
            .field("name", &self.ty.name())
            .field("component", &self.component)
            .field("interfaces", &self.interfaces)
            .field("constructors", &self.constructors.len())
            .field("fields", &self.fields)
            .field("methods", &self.methods)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

/// [`BeanClass`] 构建器
pub struct BeanClassBuilder {
    class: BeanClass,
}

impl BeanClassBuilder {
    pub fn component(mut self, marker: ComponentMarker) -> Self {
        self.class.component = Some(marker);
        self
    }

    pub fn implements(mut self, interface: InterfaceMeta) -> Self {
        self.class.interfaces.push(interface);
        self
    }

    pub fn constructor(mut self, constructor: ConstructorMeta) -> Self {
        self.class.constructors.push(constructor);
        self
    }

    pub fn field(mut self, field: FieldMeta) -> Self {
        self.class.fields.push(field);
        self
    }

    pub fn method(mut self, mut method: MethodMeta) -> Self {
        method.owner = self.class.ty.name();
        self.class.methods.push(method);
        self
    }

    pub fn lifecycle(mut self, method: LifecycleMethod) -> Self {
        self.class.lifecycle.push(method);
        self
    }

    pub fn build(self) -> BeanClass {
        self.class
    }
}

/// 运行时类型索引：`TypeId` -> [`BeanClass`]
#[derive(Default)]
pub struct ClassIndex {
    classes: RwLock<HashMap<TypeId, Arc<BeanClass>>>,
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记类描述符，同一类型只保留第一次登记的描述符
    pub fn register(&self, class: Arc<BeanClass>) {
        self.classes.write().entry(class.type_id()).or_insert(class);
    }

    pub fn get(&self, type_id: TypeId) -> Option<Arc<BeanClass>> {
        self.classes.read().get(&type_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeting: Send + Sync {
        fn greet(&self) -> String;
    }

    #[derive(Default)]
    struct Greeter {
        prefix: String,
        ready: bool,
    }

    impl Greeting for Greeter {
        fn greet(&self) -> String {
            format!("{}, world", self.prefix)
        }
    }

    fn greeter_class() -> BeanClass {
        BeanClass::builder::<Greeter>()
            .component(ComponentMarker::service())
            .implements(crate::interface!(Greeter => dyn Greeting))
            .constructor(ConstructorMeta::new(vec![], |_| Ok(Greeter::default())))
            .field(FieldMeta::new("prefix", TypeInfo::of::<String>(), |g: &mut Greeter, value| {
                g.prefix = crate::bean::cast_cloned::<String>(&value)?;
                Ok(())
            }))
            .method(MethodMeta::instance("greet", vec![], |g: &Greeter, _| Ok(g.greet())))
            .method(MethodMeta::instance("greet", vec![ParamMeta::of::<String>()], |g: &Greeter, args| {
                let name = crate::bean::arg::<String>(args, 0)?;
                Ok(format!("{}, {}", g.prefix, name))
            }))
            .lifecycle(LifecycleMethod::new("init", |g: &mut Greeter| {
                g.ready = true;
                Ok(())
            }))
            .build()
    }

    #[test]
    fn test_type_info_names() {
        let concrete = TypeInfo::of::<Greeter>();
        assert_eq!(concrete.simple_name(), "Greeter");
        assert_eq!(concrete.bean_name(), "greeter");
        assert!(!concrete.is_interface());

        let iface = TypeInfo::interface::<dyn Greeting>();
        assert!(iface.is_interface());
        assert_eq!(iface.simple_name(), "Greeting");
        assert_eq!(iface.bean_name(), "greeting");
    }

    #[test]
    fn test_component_name_derivation() {
        let class = greeter_class();
        assert_eq!(class.component_name().as_deref(), Some("greeter"));

        let named = BeanClass::builder::<Greeter>()
            .component(ComponentMarker::component().named("hello"))
            .build();
        assert_eq!(named.component_name().as_deref(), Some("hello"));

        let blank = BeanClass::builder::<Greeter>()
            .component(ComponentMarker::component().named("  "))
            .build();
        assert_eq!(blank.component_name().as_deref(), Some("greeter"));

        let plain = BeanClass::builder::<Greeter>().build();
        assert_eq!(plain.component_name(), None);
    }

    #[test]
    fn test_find_method_uses_arity() {
        let class = greeter_class();
        let greeter: Instance = Arc::new(Greeter {
            prefix: "hi".to_string(),
            ready: false,
        });

        let no_args = class.find_method("greet", 0, false).unwrap();
        let out = no_args.invoke(Some(&greeter), &[]).unwrap();
        assert_eq!(out.downcast_ref::<String>().unwrap(), "hi, world");

        let one_arg = class.find_method("greet", 1, false).unwrap();
        let name: Instance = Arc::new("bob".to_string());
        let out = one_arg.invoke(Some(&greeter), &[name]).unwrap();
        assert_eq!(out.downcast_ref::<String>().unwrap(), "hi, bob");

        assert!(class.find_method("greet", 2, false).is_none());
        assert!(class.find_method("greet", 0, true).is_none());
        assert!(no_args.invoke(None, &[]).is_err());
    }

    #[test]
    fn test_field_and_lifecycle_invocation() {
        let class = greeter_class();
        let mut raw: RawInstance = class.constructors()[0].invoke(&[]).unwrap();

        let value: Instance = Arc::new("hello".to_string());
        class.field("prefix").unwrap().inject(raw.as_mut(), value).unwrap();
        class.lifecycle_method("init").unwrap().invoke(raw.as_mut()).unwrap();

        let greeter = raw.downcast_ref::<Greeter>().unwrap();
        assert_eq!(greeter.prefix, "hello");
        assert!(greeter.ready);
        assert!(class.lifecycle_method("missing").is_none());
    }

    #[test]
    fn test_interface_cast() {
        let class = greeter_class();
        let iface = TypeInfo::interface::<dyn Greeting>();
        assert!(class.implements(&iface));

        let bean: Instance = Arc::new(Greeter {
            prefix: "yo".to_string(),
            ready: true,
        });
        let cast = class.interface(&iface).unwrap().cast(bean).unwrap();
        let greeting = cast.downcast_ref::<Arc<dyn Greeting>>().unwrap();
        assert_eq!(greeting.greet(), "yo, world");
    }

    #[test]
    fn test_class_index_keeps_first_registration() {
        let index = ClassIndex::new();
        index.register(Arc::new(greeter_class()));
        index.register(Arc::new(BeanClass::builder::<Greeter>().build()));

        assert_eq!(index.len(), 1);
        let class = index.get(TypeId::of::<Greeter>()).unwrap();
        assert!(class.component().is_some());
    }
}

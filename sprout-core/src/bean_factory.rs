//! Bean Factory - 核心容器接口
//!
//! 参考 Spring 的 BeanFactory 架构设计

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{
    bean::{type_id_of, BeanDefinition, BeanValue, Instance, RawInstance},
    bean_post_processor::BeanPostProcessor,
    context::TypeResolution,
    error::{ContainerError, ContainerResult},
    instance::select_strategy,
    metadata::{BeanClass, ClassIndex, ParamMeta, TypeInfo, TypeKind},
    proxy::{invoke_direct, unwrap_proxy, ProxyObject},
    utils::{dependency::CreationTracker, naming::is_blank},
};

/// BeanFactory - 最基础的容器接口
///
/// 注意：此 trait 不包含泛型方法，因此可以作为 trait object 使用
pub trait BeanFactory: Send + Sync {
    /// 通过名称获取 Bean
    fn get_bean(&self, name: &str) -> ContainerResult<Instance>;

    /// 检查是否包含指定名称的 Bean
    fn contains_bean(&self, name: &str) -> bool;

    /// 通过类型获取 Bean
    ///
    /// 接口类型交给类型解析器（声明式上下文）查找唯一实现；
    /// 具体类型使用规范名称（类型简单名称的小驼峰形式）。
    fn get_bean_by_type(&self, ty: &TypeInfo) -> ContainerResult<Instance>;

    /// 获取实例的运行时类描述符，代理返回目标对象的描述符
    fn resolve_class(&self, bean: &Instance) -> Option<Arc<BeanClass>>;

    /// 按名称调用 Bean 的实例方法，Bean 被代理时经过代理
    fn invoke(&self, bean: &Instance, method: &str, args: Vec<Instance>) -> ContainerResult<RawInstance>;

    /// 将值转换为目标类型在 `Instance` 中的形态
    ///
    /// - 接口类型：通过运行时类的接口元数据转换为 `Arc<dyn Trait>`
    /// - 具体类型：穿透代理后检查类型
    fn coerce(&self, value: Instance, ty: &TypeInfo) -> ContainerResult<Instance> {
        if ty.kind() == TypeKind::Any || type_id_of(value.as_ref()) == ty.value_type_id() {
            return Ok(value);
        }

        let target = unwrap_proxy(&value);
        match ty.kind() {
            TypeKind::Interface => {
                let class = self.resolve_class(&target).ok_or_else(|| ContainerError::TypeMismatch {
                    expected: ty.name().to_string(),
                    found: "unregistered type".to_string(),
                })?;
                class
                    .interface(ty)
                    .and_then(|iface| iface.cast(target))
                    .ok_or_else(|| ContainerError::TypeMismatch {
                        expected: ty.name().to_string(),
                        found: class.name().to_string(),
                    })
            }
            _ if type_id_of(target.as_ref()) == ty.value_type_id() => Ok(target),
            _ => Err(ContainerError::TypeMismatch {
                expected: ty.name().to_string(),
                found: self
                    .resolve_class(&target)
                    .map(|c| c.name().to_string())
                    .unwrap_or_else(|| "unregistered type".to_string()),
            }),
        }
    }
}

/// BeanFactoryExt - BeanFactory 的扩展 trait
///
/// 提供泛型方法，不能作为 trait object 使用
pub trait BeanFactoryExt: BeanFactory {
    /// 通过名称获取具体类型的 Bean，代理会被穿透
    fn get_bean_of<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        let bean = self.get_bean(name)?;
        downcast_bean::<T>(&bean)
    }

    /// 通过类型获取 Bean
    fn get_bean_by_type_of<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        let bean = self.get_bean_by_type(&TypeInfo::of::<T>())?;
        downcast_bean::<T>(&bean)
    }

    /// 通过接口获取 Bean，例如 `factory.get_interface::<dyn UserRepository>()`
    fn get_interface<I: ?Sized + Send + Sync + 'static>(&self) -> ContainerResult<Arc<I>> {
        let ty = TypeInfo::interface::<I>();
        let bean = self.get_bean_by_type(&ty)?;
        let value = self.coerce(bean, &ty)?;
        value
            .downcast_ref::<Arc<I>>()
            .cloned()
            .ok_or_else(|| ContainerError::TypeMismatch {
                expected: ty.name().to_string(),
                found: "unknown".to_string(),
            })
    }
}

impl<F: BeanFactory + ?Sized> BeanFactoryExt for F {}

fn downcast_bean<T: Any + Send + Sync>(bean: &Instance) -> ContainerResult<Arc<T>> {
    unwrap_proxy(bean)
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeMismatch {
            expected: type_name::<T>().to_string(),
            found: "unknown".to_string(),
        })
}

/// ListableBeanFactory - 可列举的 Bean 工厂
pub trait ListableBeanFactory: BeanFactory {
    /// 获取所有 Bean 的名称（按注册顺序）
    fn get_bean_names(&self) -> Vec<String>;

    /// 获取 Bean 定义的数量
    fn get_bean_definition_count(&self) -> usize;
}

/// ConfigurableBeanFactory - 可配置的 Bean 工厂
pub trait ConfigurableBeanFactory: BeanFactory {
    /// 注册 Bean 定义
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()>;

    /// 检查是否包含指定的 Bean 定义
    fn contains_bean_definition(&self, name: &str) -> bool;

    /// 获取单个 Bean 定义
    fn get_bean_definition(&self, name: &str) -> Option<BeanDefinition>;

    /// 修改 Bean 定义，缓存的构造函数 / 方法会被丢弃
    fn modify_bean_definition<F>(&self, name: &str, modifier: F) -> ContainerResult<()>
    where
        F: FnOnce(&mut BeanDefinition);

    /// 添加 BeanPostProcessor，按注册顺序执行
    fn register_post_processor(&self, processor: Arc<dyn BeanPostProcessor>);

    /// 获取所有 BeanPostProcessor
    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>>;

    /// 登记类描述符，用于运行时类型查找
    fn register_class(&self, class: Arc<BeanClass>);
}

/// ConfigurableListableBeanFactory - 可配置且可列举的 Bean 工厂
pub trait ConfigurableListableBeanFactory: ListableBeanFactory + ConfigurableBeanFactory {
    /// 预实例化所有单例 Bean
    fn preinstantiate_singletons(&self) -> ContainerResult<()>;

    /// 销毁所有单例 Bean（调用 destroy 方法）
    fn destroy_singletons(&self) -> ContainerResult<()>;
}

/// 接口类型解析器，由声明式上下文提供
pub trait TypeResolver: Send + Sync {
    fn resolve(&self, ty: &TypeInfo) -> TypeResolution;
}

/// DefaultBeanFactory - ConfigurableListableBeanFactory 的默认实现
///
/// 单例创建是"先检查后创建"：两个线程同时第一次请求同一个单例时，
/// 可能各自构建一个实例，缓存中保留最后写入的那个。
pub struct DefaultBeanFactory {
    /// Bean 定义存储
    definitions: RwLock<HashMap<String, BeanDefinition>>,

    /// 注册顺序
    bean_names: RwLock<Vec<String>>,

    /// 单例 Bean 缓存
    singletons: RwLock<HashMap<String, Instance>>,

    /// 运行时类型索引
    classes: ClassIndex,

    /// 循环依赖检测
    creation_tracker: CreationTracker,

    /// Bean 后置处理器列表（按注册顺序）
    bean_post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,

    type_resolver: RwLock<Option<Arc<dyn TypeResolver>>>,
}

struct CreationGuard<'a> {
    tracker: &'a CreationTracker,
    name: &'a str,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        self.tracker.finish_creating(self.name);
    }
}

impl DefaultBeanFactory {
    /// 创建新的 Bean 工厂
    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
            bean_names: RwLock::new(Vec::new()),
            singletons: RwLock::new(HashMap::new()),
            classes: ClassIndex::new(),
            creation_tracker: CreationTracker::new(),
            bean_post_processors: RwLock::new(Vec::new()),
            type_resolver: RwLock::new(None),
        }
    }

    /// 安装接口类型解析器
    pub fn set_type_resolver(&self, resolver: Arc<dyn TypeResolver>) {
        *self.type_resolver.write() = Some(resolver);
    }

    /// 没有安装类型解析器时，按注册顺序查找实现了接口的定义
    fn resolve_by_definitions(&self, ty: &TypeInfo) -> TypeResolution {
        let definitions = self.definitions.read();
        let candidates = self
            .bean_names
            .read()
            .iter()
            .filter(|name| {
                definitions.get(*name).is_some_and(|d| {
                    d.bean_class.as_ref().is_some_and(|c| c.implements(ty) && d.factory_method_name.is_none())
                        || d.return_type.is_some_and(|r| r.id() == ty.id())
                })
            })
            .cloned()
            .collect();
        TypeResolution::from_candidates(candidates)
    }

    /// 单例是否已经创建
    pub fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.read().contains_key(name)
    }

    /// 解析参数值：字面量原样返回，引用递归获取 Bean
    pub fn resolve_value(&self, value: &BeanValue) -> ContainerResult<Instance> {
        match value {
            BeanValue::Literal(literal) => Ok(Arc::clone(literal)),
            BeanValue::Reference(reference) => self.get_bean(reference.name()),
        }
    }

    /// 解析定义的全部参数值
    pub fn resolve_arguments(&self, definition: &BeanDefinition) -> ContainerResult<Vec<Instance>> {
        definition
            .argument_values
            .iter()
            .map(|value| self.resolve_value(value))
            .collect()
    }

    /// 将参数转换为参数声明的类型
    pub fn coerce_arguments(&self, params: &[ParamMeta], args: Vec<Instance>) -> ContainerResult<Vec<Instance>> {
        params
            .iter()
            .zip(args)
            .map(|(param, arg)| self.coerce(arg, &param.ty))
            .collect()
    }

    /// 创建 Bean 实例并调用生命周期回调
    ///
    /// 1. 实例化（构造函数 / 静态工厂方法 / 工厂 Bean 方法）
    /// 2. 属性注入
    /// 3. init 方法
    /// 4. BeanPostProcessor.post_process_after_initialization
    fn create_bean(&self, name: &str, definition: &BeanDefinition) -> ContainerResult<Instance> {
        if !self.creation_tracker.start_creating(name) {
            let chain = self.creation_tracker.current_creating();
            return Err(ContainerError::CircularDependency(format!(
                "{} -> {}",
                chain.join(" -> "),
                name
            )));
        }

        let _guard = CreationGuard {
            tracker: &self.creation_tracker,
            name,
        };

        let strategy = select_strategy(definition);
        tracing::debug!("Creating bean '{}' via {}", name, strategy.name());

        let mut raw = strategy.instantiate(name, definition, self)?;
        self.populate_properties(name, definition, raw.as_mut())?;
        self.invoke_init_method(name, definition, raw.as_mut())?;

        let mut bean: Instance = Arc::from(raw);
        for processor in self.get_bean_post_processors() {
            tracing::trace!("Applying post processor '{}' to '{}'", processor.name(), name);
            bean = processor.post_process_after_initialization(bean, name)?;
        }

        Ok(bean)
    }

    /// 实例的类描述符
    ///
    /// 同一类型可以有多个描述符，定义自带且类型一致的描述符优先，
    /// 工厂方法产出的实例才回退到类索引
    fn runtime_class(&self, definition: &BeanDefinition, raw: &(dyn Any + Send + Sync)) -> Option<Arc<BeanClass>> {
        let type_id = type_id_of(raw);
        match &definition.bean_class {
            Some(class) if class.type_id() == type_id => Some(Arc::clone(class)),
            _ => self.classes.get(type_id),
        }
    }

    fn populate_properties(
        &self,
        name: &str,
        definition: &BeanDefinition,
        raw: &mut (dyn Any + Send + Sync),
    ) -> ContainerResult<()> {
        if definition.property_values.is_empty() {
            return Ok(());
        }

        let injection_error = |field: &str, message: String| ContainerError::PropertyInjection {
            bean: name.to_string(),
            field: field.to_string(),
            message,
        };

        let class = self.runtime_class(definition, raw).ok_or_else(|| {
            injection_error(
                &definition.property_values[0].name,
                "runtime type has no registered class metadata".to_string(),
            )
        })?;

        for property in &definition.property_values {
            let field = class
                .field(&property.name)
                .ok_or_else(|| injection_error(&property.name, format!("no such field on '{}'", class.name())))?;

            let value = self.resolve_value(&property.value)?;
            let value = self
                .coerce(value, &field.ty())
                .map_err(|e| injection_error(&property.name, e.to_string()))?;

            field
                .inject(raw, value)
                .map_err(|e| injection_error(&property.name, format!("{:#}", e)))?;
            tracing::trace!("Injected property '{}' of bean '{}'", property.name, name);
        }

        Ok(())
    }

    fn invoke_init_method(
        &self,
        name: &str,
        definition: &BeanDefinition,
        raw: &mut (dyn Any + Send + Sync),
    ) -> ContainerResult<()> {
        let Some(method) = definition.init_method_name.as_deref().filter(|m| !is_blank(m)) else {
            return Ok(());
        };

        let init_error = |message: String| ContainerError::InitInvocationError {
            bean: name.to_string(),
            method: method.to_string(),
            message,
        };

        let hook = self
            .runtime_class(definition, raw)
            .and_then(|class| class.lifecycle_method(method).cloned())
            .ok_or_else(|| init_error("method not found".to_string()))?;

        hook.invoke(raw).map_err(|e| init_error(format!("{:#}", e)))?;
        tracing::debug!("Invoked init method '{}' of bean '{}'", method, name);
        Ok(())
    }
}

impl Default for DefaultBeanFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanFactory for DefaultBeanFactory {
    fn get_bean(&self, name: &str) -> ContainerResult<Instance> {
        tracing::trace!("Requesting bean: '{}'", name);

        if let Some(bean) = self.singletons.read().get(name) {
            tracing::trace!("Returning cached instance of singleton bean '{}'", name);
            return Ok(Arc::clone(bean));
        }

        // 不持有锁调用用户代码
        let definition = self
            .definitions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| {
                tracing::debug!("Bean '{}' not found in container", name);
                ContainerError::UnknownBean(name.to_string())
            })?;

        let bean = self.create_bean(name, &definition)?;

        if definition.is_singleton() {
            self.singletons.write().insert(name.to_string(), Arc::clone(&bean));
            tracing::debug!("Singleton bean '{}' created and cached", name);
        }

        Ok(bean)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    fn get_bean_by_type(&self, ty: &TypeInfo) -> ContainerResult<Instance> {
        if !ty.is_interface() {
            return self.get_bean(&ty.bean_name());
        }

        let resolver = self.type_resolver.read().clone();
        let resolution = match resolver {
            Some(resolver) => resolver.resolve(ty),
            None => self.resolve_by_definitions(ty),
        };
        match resolution {
            TypeResolution::Unique(name) => self.get_bean(&name),
            TypeResolution::Ambiguous(candidates) => Err(ContainerError::AmbiguousType {
                type_name: ty.name().to_string(),
                candidates,
            }),
            TypeResolution::None => Err(ContainerError::AmbiguousType {
                type_name: ty.name().to_string(),
                candidates: Vec::new(),
            }),
        }
    }

    fn resolve_class(&self, bean: &Instance) -> Option<Arc<BeanClass>> {
        match bean.downcast_ref::<ProxyObject>() {
            Some(proxy) => Some(Arc::clone(proxy.class())),
            None => self.classes.get(type_id_of(bean.as_ref())),
        }
    }

    fn invoke(&self, bean: &Instance, method: &str, args: Vec<Instance>) -> ContainerResult<RawInstance> {
        if let Some(proxy) = bean.downcast_ref::<ProxyObject>() {
            return proxy.invoke(method, args);
        }

        let class = self.resolve_class(bean).ok_or_else(|| ContainerError::NoSuchMethod {
            class: "unregistered type".to_string(),
            method: method.to_string(),
            arity: args.len(),
        })?;
        let meta = class
            .find_method(method, args.len(), false)
            .ok_or_else(|| ContainerError::NoSuchMethod {
                class: class.name().to_string(),
                method: method.to_string(),
                arity: args.len(),
            })?;

        invoke_direct(bean, meta, &args)
    }
}

impl ListableBeanFactory for DefaultBeanFactory {
    fn get_bean_names(&self) -> Vec<String> {
        self.bean_names.read().clone()
    }

    fn get_bean_definition_count(&self) -> usize {
        self.definitions.read().len()
    }
}

impl ConfigurableBeanFactory for DefaultBeanFactory {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()> {
        tracing::trace!(
            "Attempting to register bean: name='{}', type='{}', scope={}",
            name,
            definition.return_type.map(|t| t.name()).unwrap_or("<unset>"),
            definition.scope
        );

        if let Some(reason) = definition.validation_error() {
            return Err(ContainerError::InvalidDefinition {
                name: name.to_string(),
                reason: reason.to_string(),
            });
        }

        let class = definition.bean_class.clone();
        {
            let mut definitions = self.definitions.write();
            if definitions.contains_key(name) {
                tracing::warn!("Bean '{}' already exists, registration failed", name);
                return Err(ContainerError::DuplicateRegistration(name.to_string()));
            }
            definitions.insert(name.to_string(), definition);
            self.bean_names.write().push(name.to_string());
        }

        if let Some(class) = class {
            self.classes.register(class);
        }

        tracing::debug!("Bean definition registered successfully: '{}'", name);
        Ok(())
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    fn get_bean_definition(&self, name: &str) -> Option<BeanDefinition> {
        self.definitions.read().get(name).cloned()
    }

    fn modify_bean_definition<F>(&self, name: &str, modifier: F) -> ContainerResult<()>
    where
        F: FnOnce(&mut BeanDefinition),
    {
        let mut definitions = self.definitions.write();
        let definition = definitions
            .get_mut(name)
            .ok_or_else(|| ContainerError::UnknownBean(name.to_string()))?;

        modifier(definition);
        definition.reset_resolved();
        tracing::debug!("Bean definition '{}' modified", name);
        Ok(())
    }

    fn register_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        tracing::debug!("Registered bean post processor '{}'", processor.name());
        self.bean_post_processors.write().push(processor);
    }

    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.bean_post_processors.read().clone()
    }

    fn register_class(&self, class: Arc<BeanClass>) {
        self.classes.register(class);
    }
}

impl ConfigurableListableBeanFactory for DefaultBeanFactory {
    fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        let bean_names: Vec<String> = {
            let definitions = self.definitions.read();
            self.bean_names
                .read()
                .iter()
                .filter(|name| definitions.get(*name).is_some_and(|d| d.is_singleton()))
                .cloned()
                .collect()
        };

        tracing::debug!("Pre-instantiating {} singleton beans", bean_names.len());

        for name in bean_names {
            self.get_bean(&name)?;
        }

        Ok(())
    }

    fn destroy_singletons(&self) -> ContainerResult<()> {
        tracing::info!("Destroying singleton beans");

        let mut singletons: HashMap<String, Instance> = self.singletons.write().drain().collect();
        let order = self.bean_names.read().clone();

        // 按注册的逆序销毁
        for name in order.iter().rev() {
            let Some(bean) = singletons.remove(name) else {
                continue;
            };
            let Some(definition) = self.definitions.read().get(name).cloned() else {
                continue;
            };
            let Some(method) = definition.destroy_method_name.clone().filter(|m| !is_blank(m)) else {
                continue;
            };

            let mut target = unwrap_proxy(&bean);
            drop(bean);

            let Some(hook) = self
                .runtime_class(&definition, target.as_ref())
                .and_then(|class| class.lifecycle_method(&method).cloned())
            else {
                tracing::warn!("Destroy method '{}' not found on bean '{}'", method, name);
                continue;
            };

            match Arc::get_mut(&mut target) {
                Some(bean_mut) => match hook.invoke(bean_mut) {
                    Ok(()) => tracing::debug!("Bean '{}' destroyed successfully", name),
                    Err(e) => tracing::error!("Failed to destroy bean '{}': {:#}", name, e),
                },
                None => tracing::warn!("Cannot destroy bean '{}': still has active references", name),
            }
        }

        tracing::info!("Singleton beans destruction completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::{arg, cast_cloned, PropertyValue};
    use crate::bean_post_processor::FnPostProcessor;
    use crate::metadata::{ConstructorMeta, FieldMeta, LifecycleMethod, MethodMeta};
    use crate::Scope;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Engine {
        power: u32,
    }

    struct Car {
        engine: Arc<Engine>,
        name: String,
        started: bool,
    }

    fn engine_class() -> Arc<BeanClass> {
        Arc::new(
            BeanClass::builder::<Engine>()
                .constructor(ConstructorMeta::new(vec![], |_| Ok(Engine { power: 100 })))
                .field(FieldMeta::new("power", TypeInfo::of::<u32>(), |e: &mut Engine, v| {
                    e.power = cast_cloned::<u32>(&v)?;
                    Ok(())
                }))
                .build(),
        )
    }

    fn car_class() -> Arc<BeanClass> {
        Arc::new(
            BeanClass::builder::<Car>()
                .constructor(ConstructorMeta::new(vec![ParamMeta::of::<Engine>()], |args| {
                    Ok(Car {
                        engine: arg::<Engine>(args, 0)?,
                        name: String::new(),
                        started: false,
                    })
                }))
                .field(FieldMeta::new("name", TypeInfo::of::<String>(), |c: &mut Car, v| {
                    c.name = cast_cloned::<String>(&v)?;
                    Ok(())
                }))
                .method(MethodMeta::instance("describe", vec![], |c: &Car, _| {
                    Ok(format!("{} ({})", c.name, c.engine.power))
                }))
                .lifecycle(LifecycleMethod::new("start", |c: &mut Car| {
                    c.started = true;
                    Ok(())
                }))
                .lifecycle(LifecycleMethod::new("explode", |_: &mut Car| {
                    anyhow::bail!("boom")
                }))
                .build(),
        )
    }

    fn factory_with_car() -> DefaultBeanFactory {
        let factory = DefaultBeanFactory::new();
        factory
            .register_bean_definition("engine", BeanDefinition::for_class(engine_class()))
            .unwrap();
        factory
            .register_bean_definition(
                "car",
                BeanDefinition::for_class(car_class())
                    .with_argument(BeanValue::reference("engine"))
                    .with_property(PropertyValue::literal("name", "roadster".to_string()))
                    .with_init_method("start"),
            )
            .unwrap();
        factory
    }

    #[test]
    fn test_register_and_get_definition() {
        let factory = DefaultBeanFactory::new();
        let def = BeanDefinition::for_class(engine_class());
        factory.register_bean_definition("engine", def.clone()).unwrap();

        assert!(factory.contains_bean_definition("engine"));
        assert_eq!(factory.get_bean_definition("engine"), Some(def.clone()));
        assert!(factory.get_bean_definition("missing").is_none());

        let err = factory.register_bean_definition("engine", def).unwrap_err();
        assert!(matches!(err, ContainerError::DuplicateRegistration(name) if name == "engine"));
    }

    #[test]
    fn test_register_invalid_definition() {
        let factory = DefaultBeanFactory::new();
        let err = factory
            .register_bean_definition("broken", BeanDefinition::new())
            .unwrap_err();
        assert!(matches!(err, ContainerError::InvalidDefinition { .. }));
        assert!(!factory.contains_bean_definition("broken"));
    }

    #[test]
    fn test_get_bean_full_lifecycle() {
        let factory = factory_with_car();
        let car = factory.get_bean_of::<Car>("car").unwrap();

        assert!(car.started);
        assert_eq!(car.name, "roadster");
        assert_eq!(car.engine.power, 100);

        let engine = factory.get_bean_of::<Engine>("engine").unwrap();
        assert!(Arc::ptr_eq(&engine, &car.engine));
    }

    #[test]
    fn test_unknown_bean() {
        let factory = DefaultBeanFactory::new();
        let err = factory.get_bean("nope").unwrap_err();
        assert!(matches!(err, ContainerError::UnknownBean(name) if name == "nope"));
    }

    #[test]
    fn test_unknown_reference_fails_at_build_time() {
        let factory = DefaultBeanFactory::new();
        factory
            .register_bean_definition(
                "car",
                BeanDefinition::for_class(car_class()).with_argument(BeanValue::reference("engine")),
            )
            .unwrap();

        let err = factory.get_bean("car").unwrap_err();
        assert!(matches!(err, ContainerError::UnknownBean(name) if name == "engine"));
    }

    #[test]
    fn test_init_method_errors() {
        let factory = DefaultBeanFactory::new();
        factory
            .register_bean_definition("engine", BeanDefinition::for_class(engine_class()))
            .unwrap();
        factory
            .register_bean_definition(
                "missingInit",
                BeanDefinition::for_class(car_class())
                    .with_argument(BeanValue::reference("engine"))
                    .with_init_method("warmUp"),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "failingInit",
                BeanDefinition::for_class(car_class())
                    .with_argument(BeanValue::reference("engine"))
                    .with_init_method("explode"),
            )
            .unwrap();

        let err = factory.get_bean("missingInit").unwrap_err();
        assert!(matches!(err, ContainerError::InitInvocationError { ref method, .. } if method == "warmUp"));

        let err = factory.get_bean("failingInit").unwrap_err();
        assert!(matches!(err, ContainerError::InitInvocationError { ref message, .. } if message.contains("boom")));
    }

    #[test]
    fn test_prototype_scope_builds_each_time() {
        let factory = DefaultBeanFactory::new();
        factory
            .register_bean_definition(
                "engine",
                BeanDefinition::for_class(engine_class())
                    .with_scope(Scope::Prototype)
                    .with_property(PropertyValue::literal("power", 7u32)),
            )
            .unwrap();

        let a = factory.get_bean_of::<Engine>("engine").unwrap();
        let b = factory.get_bean_of::<Engine>("engine").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.power, 7);
        assert_eq!(b.power, 7);
        assert!(!factory.contains_singleton("engine"));
    }

    #[test]
    fn test_property_type_mismatch() {
        let factory = DefaultBeanFactory::new();
        factory
            .register_bean_definition(
                "engine",
                BeanDefinition::for_class(engine_class())
                    .with_property(PropertyValue::literal("power", "fast".to_string())),
            )
            .unwrap();

        let err = factory.get_bean("engine").unwrap_err();
        assert!(matches!(err, ContainerError::PropertyInjection { ref field, .. } if field == "power"));
    }

    #[test]
    fn test_post_processors_run_in_order() {
        let factory = factory_with_car();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second"] {
            let seen = Arc::clone(&seen);
            factory.register_post_processor(Arc::new(FnPostProcessor::new(label, move |bean, name| {
                seen.lock().push(format!("{}:{}", label, name));
                Ok(bean)
            })));
        }

        factory.get_bean("car").unwrap();
        assert_eq!(
            *seen.lock(),
            vec!["first:engine", "second:engine", "first:car", "second:car"]
        );
    }

    #[test]
    fn test_post_processor_can_replace_bean() {
        let factory = DefaultBeanFactory::new();
        factory
            .register_bean_definition("engine", BeanDefinition::for_class(engine_class()))
            .unwrap();
        factory.register_post_processor(Arc::new(FnPostProcessor::new("swap", |_, _| {
            Ok(Arc::new(Engine { power: 999 }) as Instance)
        })));

        let engine = factory.get_bean_of::<Engine>("engine").unwrap();
        assert_eq!(engine.power, 999);
    }

    #[test]
    fn test_circular_dependency_detected() {
        struct Left;
        struct Right;

        let left = Arc::new(
            BeanClass::builder::<Left>()
                .constructor(ConstructorMeta::new(vec![ParamMeta::of::<Right>()], |_| Ok(Left)))
                .build(),
        );
        let right = Arc::new(
            BeanClass::builder::<Right>()
                .constructor(ConstructorMeta::new(vec![ParamMeta::of::<Left>()], |_| Ok(Right)))
                .build(),
        );

        let factory = DefaultBeanFactory::new();
        factory
            .register_bean_definition("left", BeanDefinition::for_class(left).with_argument(BeanValue::reference("right")))
            .unwrap();
        factory
            .register_bean_definition("right", BeanDefinition::for_class(right).with_argument(BeanValue::reference("left")))
            .unwrap();

        let err = factory.get_bean("left").unwrap_err();
        assert!(matches!(err, ContainerError::CircularDependency(ref chain) if chain == "left -> right -> left"));
    }

    #[test]
    fn test_invoke_by_name() {
        let factory = factory_with_car();
        let car = factory.get_bean("car").unwrap();

        let out = factory.invoke(&car, "describe", vec![]).unwrap();
        assert_eq!(out.downcast_ref::<String>().map(String::as_str), Some("roadster (100)"));

        let err = factory.invoke(&car, "describe", vec![Arc::new(1u8)]).unwrap_err();
        assert!(matches!(err, ContainerError::NoSuchMethod { arity: 1, .. }));
    }

    #[test]
    fn test_modify_definition_resets_resolution() {
        let factory = factory_with_car();
        factory.get_bean("engine").unwrap();

        factory
            .modify_bean_definition("car", |def| def.init_method_name = None)
            .unwrap();
        let car = factory.get_bean_of::<Car>("car").unwrap();
        assert!(!car.started);

        let err = factory.modify_bean_definition("missing", |_| {}).unwrap_err();
        assert!(matches!(err, ContainerError::UnknownBean(_)));
    }

    #[test]
    fn test_preinstantiate_and_destroy_singletons() {
        let destroyed = Arc::new(Mutex::new(Vec::<String>::new()));
        let log = Arc::clone(&destroyed);

        struct Pool;
        let class = Arc::new(
            BeanClass::builder::<Pool>()
                .constructor(ConstructorMeta::new(vec![], |_| Ok(Pool)))
                .lifecycle(LifecycleMethod::new("close", move |_: &mut Pool| {
                    log.lock().push("pool".to_string());
                    Ok(())
                }))
                .build(),
        );

        let factory = DefaultBeanFactory::new();
        factory
            .register_bean_definition("pool", BeanDefinition::for_class(class).with_destroy_method("close"))
            .unwrap();

        factory.preinstantiate_singletons().unwrap();
        assert!(factory.contains_singleton("pool"));
        assert_eq!(factory.get_bean_names(), vec!["pool"]);
        assert_eq!(factory.get_bean_definition_count(), 1);

        factory.destroy_singletons().unwrap();
        assert_eq!(*destroyed.lock(), vec!["pool"]);
        assert!(!factory.contains_singleton("pool"));
    }
}

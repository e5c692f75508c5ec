//! 声明式应用上下文
//!
//! 从类扫描器获得候选类型，按类型上的元数据注册 Bean 定义：
//!
//! 1. 结构注册：所有类型的组件 Bean 和 `@Bean` 方法产出的 Bean 先全部注册
//! 2. 依赖装配：再为所有定义补充属性引用和参数引用
//!
//! 第二步开始前第一步必须对所有类型完成，这样依赖装配时接口的实现列表和
//! 所有 Bean 名称都已确定。

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};

use crate::bean::{BeanDefinition, BeanValue, Instance, PropertyValue, RawInstance};
use crate::bean_factory::{
    BeanFactory, ConfigurableBeanFactory, ConfigurableListableBeanFactory, DefaultBeanFactory,
    ListableBeanFactory, TypeResolver,
};
use crate::bean_post_processor::BeanPostProcessor;
use crate::config::{Environment, EnvironmentPropertySource};
use crate::constants::{ENV_PREFIX, SCAN_PACKAGES_KEY};
use crate::error::{ContainerError, ContainerResult};
use crate::logging::LoggingConfig;
use crate::metadata::{BeanClass, MethodMeta, TypeInfo};
use crate::utils::naming::is_blank;

/// 按类型查找 Bean 名称的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeResolution {
    /// 唯一实现
    Unique(String),
    /// 多个实现
    Ambiguous(Vec<String>),
    /// 没有实现
    None,
}

impl TypeResolution {
    pub(crate) fn from_candidates(mut candidates: Vec<String>) -> Self {
        match candidates.len() {
            0 => TypeResolution::None,
            1 => TypeResolution::Unique(candidates.remove(0)),
            _ => TypeResolution::Ambiguous(candidates),
        }
    }
}

/// 类扫描器 - 按包（模块路径）发现候选类型
pub trait ClassScanner: Send + Sync {
    fn scan(&self, packages: &[String]) -> ContainerResult<Vec<Arc<BeanClass>>>;
}

/// 配置源 - 读取数组形式的配置
pub trait ConfigSource: Send + Sync {
    fn get_config_array(&self, key: &str) -> Vec<String>;
}

/// 编译期登记的类型 - 用于 inventory 收集
pub struct ClassRegistration {
    pub class: fn() -> BeanClass,
}

inventory::collect!(ClassRegistration);

/// 在编译期登记一个类描述符，供 [`InventoryScanner`] 扫描
///
/// ```ignore
/// fn user_service_class() -> BeanClass {
///     BeanClass::builder::<UserService>()
///         .component(ComponentMarker::service())
///         .build()
/// }
///
/// sprout_core::register_class!(user_service_class);
/// ```
#[macro_export]
macro_rules! register_class {
    ($class_fn:path) => {
        $crate::inventory::submit! {
            $crate::context::ClassRegistration { class: $class_fn }
        }
    };
}

/// 类型是否位于给定的包中；包列表为空时接受所有类型
fn in_packages(class: &BeanClass, packages: &[String]) -> bool {
    if packages.is_empty() {
        return true;
    }
    let module = class.module_path();
    packages.iter().any(|package| {
        let package = package.trim();
        module == package
            || module
                .strip_prefix(package)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

/// 扫描通过 [`register_class!`] 登记的所有类型
#[derive(Debug, Default, Clone, Copy)]
pub struct InventoryScanner;

impl ClassScanner for InventoryScanner {
    fn scan(&self, packages: &[String]) -> ContainerResult<Vec<Arc<BeanClass>>> {
        let classes: Vec<Arc<BeanClass>> = inventory::iter::<ClassRegistration>
            .into_iter()
            .map(|registration| Arc::new((registration.class)()))
            .filter(|class| in_packages(class, packages))
            .collect();

        tracing::debug!("Inventory scan found {} class(es) in {:?}", classes.len(), packages);
        Ok(classes)
    }
}

/// 从固定列表扫描
#[derive(Debug, Default, Clone)]
pub struct StaticScanner {
    classes: Vec<Arc<BeanClass>>,
}

impl StaticScanner {
    pub fn new(classes: Vec<BeanClass>) -> Self {
        Self {
            classes: classes.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn with_class(mut self, class: BeanClass) -> Self {
        self.classes.push(Arc::new(class));
        self
    }
}

impl ClassScanner for StaticScanner {
    fn scan(&self, packages: &[String]) -> ContainerResult<Vec<Arc<BeanClass>>> {
        Ok(self
            .classes
            .iter()
            .filter(|class| in_packages(class, packages))
            .cloned()
            .collect())
    }
}

/// 接口 -> 实现 Bean 名称索引
///
/// 在第一次查询时根据扫描到的组件类型构建，之后不再变化。
#[derive(Default)]
struct TypeIndex {
    classes: OnceCell<Vec<Arc<BeanClass>>>,
    index: OnceCell<HashMap<TypeId, Vec<String>>>,
}

impl TypeIndex {
    fn candidates(&self, ty: &TypeInfo) -> Vec<String> {
        let Some(classes) = self.classes.get() else {
            return Vec::new();
        };
        let index = self.index.get_or_init(|| {
            let mut index: HashMap<TypeId, Vec<String>> = HashMap::new();
            for class in classes {
                let Some(bean_name) = class.component_name() else {
                    continue;
                };
                for iface in class.interfaces() {
                    index.entry(iface.ty().id()).or_default().push(bean_name.clone());
                }
                // 声明返回接口类型的 @Bean 方法
                for method in class.methods() {
                    if method.bean_marker().is_some() && method.returns().is_interface() {
                        index
                            .entry(method.returns().id())
                            .or_default()
                            .push(bean_method_name(method));
                    }
                }
            }
            tracing::debug!("Built interface index with {} interface(s)", index.len());
            index
        });
        index.get(&ty.id()).cloned().unwrap_or_default()
    }
}

impl TypeResolver for TypeIndex {
    fn resolve(&self, ty: &TypeInfo) -> TypeResolution {
        TypeResolution::from_candidates(self.candidates(ty))
    }
}

/// 一个组件类型的元数据：Bean 名称、类、声明的依赖
#[derive(Debug, Clone)]
pub struct ComponentProperty {
    pub bean_name: String,
    pub class: Arc<BeanClass>,
    /// (注入目标, 引用的 Bean 名称)，注入目标为字段名或 `方法名#参数序号`
    pub dependencies: Vec<(String, String)>,
}

fn bean_method_name(method: &MethodMeta) -> String {
    match method.bean_marker().and_then(|m| m.name) {
        Some(name) if !is_blank(name) => name.to_string(),
        _ => method.returns().bean_name(),
    }
}

/// 应用上下文
///
/// 持有 BeanFactory 和 Environment，负责扫描类型并注册、装配 Bean 定义
pub struct ApplicationContext {
    /// Bean 工厂 - 负责 Bean 的创建和管理
    bean_factory: Arc<DefaultBeanFactory>,

    /// 配置环境
    environment: Arc<Environment>,

    scanner: Arc<dyn ClassScanner>,

    /// 显式指定的扫描包，为空时读取配置
    scan_packages: Option<Vec<String>>,

    /// 扫描到的类型（按类型名排序，去重）
    classes: RwLock<Vec<Arc<BeanClass>>>,

    type_index: Arc<TypeIndex>,

    components: RwLock<Vec<ComponentProperty>>,

    state: Mutex<InitState>,
}

/// 初始化状态，失败后不再重试
#[derive(Debug, Clone, PartialEq, Eq)]
enum InitState {
    Pending,
    Ready,
    Failed(String),
}

impl ApplicationContext {
    pub fn builder() -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
    }

    /// 获取内部的 BeanFactory
    pub fn bean_factory(&self) -> &Arc<DefaultBeanFactory> {
        &self.bean_factory
    }

    /// 获取 Environment
    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// 注册 BeanPostProcessor
    pub fn register_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        self.bean_factory.register_post_processor(processor);
    }

    /// 扫描并注册所有 Bean 定义
    ///
    /// 重复调用不会重新扫描。第一次失败后注册表可能只完成了一部分，
    /// 之后的调用都返回 `ContextInitFailed`
    pub fn initialize(&self) -> ContainerResult<()> {
        let mut state = self.state.lock();
        match &*state {
            InitState::Ready => {
                tracing::debug!("ApplicationContext already initialized");
                return Ok(());
            }
            InitState::Failed(reason) => return Err(ContainerError::ContextInitFailed(reason.clone())),
            InitState::Pending => {}
        }

        match self.scan_and_register() {
            Ok(()) => {
                *state = InitState::Ready;
                Ok(())
            }
            Err(e) => {
                tracing::error!("ApplicationContext initialization failed: {}", e);
                *state = InitState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    fn scan_and_register(&self) -> ContainerResult<()> {
        let packages = match &self.scan_packages {
            Some(packages) => packages.clone(),
            None => self.environment.get_config_array(SCAN_PACKAGES_KEY),
        };
        tracing::info!("Scanning packages {:?}", packages);

        let mut seen = HashSet::new();
        let mut classes: Vec<Arc<BeanClass>> = self
            .scanner
            .scan(&packages)?
            .into_iter()
            .filter(|class| seen.insert(class.type_id()))
            .collect();
        classes.sort_by(|a, b| a.name().cmp(b.name()));

        let _ = self.type_index.classes.set(classes.clone());
        *self.classes.write() = classes.clone();

        for class in &classes {
            self.register_structure(class)?;
        }
        for class in &classes {
            self.register_dependencies(class)?;
        }

        tracing::info!(
            "ApplicationContext initialized: {} class(es), {} bean definition(s)",
            classes.len(),
            self.bean_factory.get_bean_definition_count()
        );
        Ok(())
    }

    /// 第一步：注册组件和 `@Bean` 方法的定义，不含依赖
    fn register_structure(&self, class: &Arc<BeanClass>) -> ContainerResult<()> {
        self.bean_factory.register_class(Arc::clone(class));

        let (Some(bean_name), Some(marker)) = (class.component_name(), class.component()) else {
            return Ok(());
        };

        if class.constructors().len() > 1 {
            return Err(ContainerError::MultipleConstructorsUnsupported {
                class: class.name().to_string(),
                count: class.constructors().len(),
            });
        }

        let mut definition = BeanDefinition::for_class(Arc::clone(class)).with_scope(marker.scope);
        definition.init_method_name = marker.init_method.map(String::from);
        definition.destroy_method_name = marker.destroy_method.map(String::from);
        self.bean_factory.register_bean_definition(&bean_name, definition)?;
        tracing::debug!("Registered component '{}' ({:?})", bean_name, marker.stereotype);

        for method in class.methods() {
            let Some(bean) = method.bean_marker() else {
                continue;
            };
            let method_bean_name = bean_method_name(method);

            let mut definition = if method.is_static() {
                BeanDefinition::for_static_factory(Arc::clone(class), method.name())
            } else {
                BeanDefinition::for_factory_bean(bean_name.clone(), method.name())
            }
            .with_return_type(method.returns())
            .with_scope(bean.scope);
            definition.init_method_name = bean.init_method.map(String::from);
            definition.destroy_method_name = bean.destroy_method.map(String::from);

            self.bean_factory.register_bean_definition(&method_bean_name, definition)?;
            tracing::debug!(
                "Registered bean '{}' from method '{}::{}'",
                method_bean_name,
                class.simple_name(),
                method.name()
            );
        }

        Ok(())
    }

    /// 第二步：补充字段引用、构造函数参数引用和 `@Bean` 方法参数引用
    fn register_dependencies(&self, class: &Arc<BeanClass>) -> ContainerResult<()> {
        let Some(bean_name) = class.component_name() else {
            return Ok(());
        };
        let mut dependencies = Vec::new();

        let mut properties = Vec::new();
        for field in class.fields() {
            let Some(autowired) = field.autowired_marker() else {
                continue;
            };
            let target = self.resolve_target(&field.ty(), autowired.name)?;
            dependencies.push((field.name().to_string(), target.clone()));
            properties.push(PropertyValue::reference(field.name(), target));
        }

        let mut arguments = Vec::new();
        if let [constructor] = class.constructors() {
            for (index, param) in constructor.params().iter().enumerate() {
                let target = self.resolve_target(&param.ty, param.qualifier)?;
                dependencies.push((format!("new#{}", index), target.clone()));
                arguments.push(BeanValue::reference(target));
            }
        }

        if !properties.is_empty() || !arguments.is_empty() {
            self.bean_factory.modify_bean_definition(&bean_name, |definition| {
                definition.property_values.extend(properties);
                definition.argument_values = arguments;
            })?;
        }

        for method in class.methods().iter().filter(|m| m.bean_marker().is_some()) {
            if method.params().is_empty() {
                continue;
            }
            let mut arguments = Vec::with_capacity(method.arity());
            for (index, param) in method.params().iter().enumerate() {
                let target = self.resolve_target(&param.ty, param.qualifier)?;
                dependencies.push((format!("{}#{}", method.name(), index), target.clone()));
                arguments.push(BeanValue::reference(target));
            }
            self.bean_factory
                .modify_bean_definition(&bean_method_name(method), |definition| {
                    definition.argument_values = arguments;
                })?;
        }

        tracing::trace!("Wired '{}' with {} dependency(ies)", bean_name, dependencies.len());
        self.components.write().push(ComponentProperty {
            bean_name,
            class: Arc::clone(class),
            dependencies,
        });
        Ok(())
    }

    /// 依赖目标的 Bean 名称：显式名称 > 接口唯一实现 > 具体类型的规范名称
    fn resolve_target(&self, ty: &TypeInfo, explicit: Option<&'static str>) -> ContainerResult<String> {
        if let Some(name) = explicit.filter(|n| !is_blank(n)) {
            return Ok(name.to_string());
        }
        if !ty.is_interface() {
            return Ok(ty.bean_name());
        }
        match self.get_bean_names_by_type(ty) {
            TypeResolution::Unique(name) => Ok(name),
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

    /// 按接口类型查找实现 Bean 的名称
    pub fn get_bean_names_by_type(&self, ty: &TypeInfo) -> TypeResolution {
        self.type_index.resolve(ty)
    }

    /// 接口类型的全部候选 Bean 名称
    pub fn bean_names_for_type(&self, ty: &TypeInfo) -> Vec<String> {
        self.type_index.candidates(ty)
    }

    /// 遍历扫描到的所有类型
    pub fn for_each_scanned_class<F: FnMut(&Arc<BeanClass>)>(&self, mut f: F) {
        for class in self.classes.read().iter() {
            f(class);
        }
    }

    /// 遍历所有组件
    pub fn for_each_component_property<F: FnMut(&ComponentProperty)>(&self, mut f: F) {
        for component in self.components.read().iter() {
            f(component);
        }
    }

    /// 获取指定类型的组件元数据
    pub fn component_property(&self, ty: &TypeInfo) -> Option<ComponentProperty> {
        self.components
            .read()
            .iter()
            .find(|c| c.class.type_id() == ty.id())
            .cloned()
    }

    /// 预先创建所有单例
    pub fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        self.bean_factory.preinstantiate_singletons()
    }

    /// 销毁所有单例 Bean（调用 destroy 方法）
    pub fn shutdown(&self) -> ContainerResult<()> {
        tracing::info!("Starting application context shutdown");
        self.bean_factory.destroy_singletons()
    }
}

impl BeanFactory for ApplicationContext {
    fn get_bean(&self, name: &str) -> ContainerResult<Instance> {
        self.bean_factory.get_bean(name)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.bean_factory.contains_bean(name)
    }

    fn get_bean_by_type(&self, ty: &TypeInfo) -> ContainerResult<Instance> {
        self.bean_factory.get_bean_by_type(ty)
    }

    fn resolve_class(&self, bean: &Instance) -> Option<Arc<BeanClass>> {
        self.bean_factory.resolve_class(bean)
    }

    fn invoke(&self, bean: &Instance, method: &str, args: Vec<Instance>) -> ContainerResult<RawInstance> {
        self.bean_factory.invoke(bean, method, args)
    }
}

impl ListableBeanFactory for ApplicationContext {
    fn get_bean_names(&self) -> Vec<String> {
        self.bean_factory.get_bean_names()
    }

    fn get_bean_definition_count(&self) -> usize {
        self.bean_factory.get_bean_definition_count()
    }
}

/// 应用上下文构建器
pub struct ApplicationContextBuilder {
    bean_factory: Option<Arc<DefaultBeanFactory>>,
    environment: Option<Arc<Environment>>,
    scanner: Option<Arc<dyn ClassScanner>>,
    scan_packages: Option<Vec<String>>,
    load_env_vars: bool,
    init_logging: bool,
}

impl ApplicationContextBuilder {
    pub fn new() -> Self {
        Self {
            bean_factory: None,
            environment: None,
            scanner: None,
            scan_packages: None,
            load_env_vars: false,
            init_logging: false,
        }
    }

    /// 使用已有的 BeanFactory
    pub fn bean_factory(mut self, factory: Arc<DefaultBeanFactory>) -> Self {
        self.bean_factory = Some(factory);
        self
    }

    /// 使用已有的 Environment
    pub fn environment(mut self, environment: Arc<Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// 设置类扫描器（默认 [`InventoryScanner`]）
    pub fn scanner(mut self, scanner: impl ClassScanner + 'static) -> Self {
        self.scanner = Some(Arc::new(scanner));
        self
    }

    /// 直接给出类型列表，等价于使用 [`StaticScanner`]
    pub fn classes(self, classes: Vec<BeanClass>) -> Self {
        self.scanner(StaticScanner::new(classes))
    }

    /// 显式指定扫描包，不再读取 `context.scan-packages`
    pub fn scan_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scan_packages = Some(packages.into_iter().map(Into::into).collect());
        self
    }

    /// 把 `SPROUT_` 前缀的环境变量加入配置源
    pub fn with_env_vars(mut self) -> Self {
        self.load_env_vars = true;
        self
    }

    /// 构建时按 `logging.*` 配置安装全局 subscriber
    pub fn with_logging(mut self) -> Self {
        self.init_logging = true;
        self
    }

    /// 构建上下文，随后需要调用 [`ApplicationContext::initialize`]
    pub fn build(self) -> ContainerResult<Arc<ApplicationContext>> {
        let environment = self.environment.unwrap_or_else(|| Arc::new(Environment::new()));
        if self.load_env_vars {
            environment.add_property_source(Box::new(EnvironmentPropertySource::new(ENV_PREFIX)));
        }

        if self.init_logging {
            match LoggingConfig::from_environment(&environment)?.init() {
                Ok(()) => tracing::debug!("Logging initialized from configuration"),
                // 已有全局 subscriber 时沿用
                Err(ContainerError::LoggingInitFailed(reason)) => {
                    tracing::debug!("Keeping existing subscriber: {}", reason)
                }
                Err(e) => return Err(e),
            }
        }

        let bean_factory = self.bean_factory.unwrap_or_else(|| Arc::new(DefaultBeanFactory::new()));
        let type_index = Arc::new(TypeIndex::default());
        bean_factory.set_type_resolver(Arc::clone(&type_index) as Arc<dyn TypeResolver>);

        Ok(Arc::new(ApplicationContext {
            bean_factory,
            environment,
            scanner: self.scanner.unwrap_or_else(|| Arc::new(InventoryScanner)),
            scan_packages: self.scan_packages,
            classes: RwLock::new(Vec::new()),
            type_index,
            components: RwLock::new(Vec::new()),
            state: Mutex::new(InitState::Pending),
        }))
    }
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use once_cell::sync::OnceCell;

use crate::metadata::{BeanClass, ConstructorMeta, MethodMeta, TypeInfo};
use crate::utils::naming::is_blank;
use crate::Scope;

/// 容器持有的 Bean 实例
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 构造函数或工厂方法刚产出、尚未共享的实例
pub type RawInstance = Box<dyn Any + Send + Sync>;

/// 获取实例的运行时类型
///
/// 必须传入实例本身而不是 `Arc` / `Box`，否则得到的是容器类型的 `TypeId`。
pub fn type_id_of(bean: &(dyn Any + Send + Sync)) -> TypeId {
    let any: &dyn Any = bean;
    any.type_id()
}

/// 将实例转换为具体类型，代理会被穿透到目标对象
pub fn cast_instance<T: Any + Send + Sync>(instance: &Instance) -> anyhow::Result<Arc<T>> {
    crate::proxy::unwrap_proxy(instance)
        .downcast::<T>()
        .map_err(|_| anyhow!("value is not a {}", type_name::<T>()))
}

/// 转换并克隆出值，常用于接口值：`cast_cloned::<Arc<dyn Repo>>(&value)`
pub fn cast_cloned<T: Any + Send + Sync + Clone>(instance: &Instance) -> anyhow::Result<T> {
    Ok(cast_instance::<T>(instance)?.as_ref().clone())
}

/// 取第 `index` 个参数并转换为具体类型
pub fn arg<T: Any + Send + Sync>(args: &[Instance], index: usize) -> anyhow::Result<Arc<T>> {
    let value = args
        .get(index)
        .ok_or_else(|| anyhow!("missing argument #{} ({} given)", index, args.len()))?;
    cast_instance::<T>(value)
}

/// 取第 `index` 个参数并克隆出值
pub fn arg_cloned<T: Any + Send + Sync + Clone>(args: &[Instance], index: usize) -> anyhow::Result<T> {
    Ok(arg::<T>(args, index)?.as_ref().clone())
}

/// Bean 引用 - 只记录名称，在构建时才解析
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BeanReference {
    name: String,
}

impl BeanReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for BeanReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref({})", self.name)
    }
}

/// 参数或属性的值：字面量或 Bean 引用
#[derive(Clone)]
pub enum BeanValue {
    Literal(Instance),
    Reference(BeanReference),
}

impl BeanValue {
    pub fn literal<T: Any + Send + Sync>(value: T) -> Self {
        BeanValue::Literal(Arc::new(value))
    }

    pub fn reference(bean_name: impl Into<String>) -> Self {
        BeanValue::Reference(BeanReference::new(bean_name))
    }

    pub fn as_reference(&self) -> Option<&BeanReference> {
        match self {
            BeanValue::Reference(reference) => Some(reference),
            BeanValue::Literal(_) => None,
        }
    }
}

impl PartialEq for BeanValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (BeanValue::Literal(a), BeanValue::Literal(b)) => Arc::ptr_eq(a, b),
            (BeanValue::Reference(a), BeanValue::Reference(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for BeanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeanValue::Literal(_) => f.write_str("Literal(..)"),
            BeanValue::Reference(reference) => write!(f, "Reference({})", reference.name()),
        }
    }
}

/// 属性值：字段名 + 值
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub name: String,
    pub value: BeanValue,
}

impl PropertyValue {
    pub fn new(name: impl Into<String>, value: BeanValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn reference(name: impl Into<String>, bean_name: impl Into<String>) -> Self {
        Self::new(name, BeanValue::reference(bean_name))
    }

    pub fn literal<T: Any + Send + Sync>(name: impl Into<String>, value: T) -> Self {
        Self::new(name, BeanValue::literal(value))
    }
}

/// 已解析的构建句柄
#[derive(Debug, Clone)]
pub(crate) enum ResolvedHandle {
    Constructor(ConstructorMeta),
    Method(MethodMeta),
}

/// Bean 定义 - 描述如何创建和管理 Bean
///
/// 三种构建方式：
/// - 构造函数：只设置 `bean_class`
/// - 静态工厂方法：`bean_class` + `factory_method_name`
/// - 工厂 Bean 的实例方法：`factory_bean_name` + `factory_method_name`，不设置 `bean_class`
#[derive(Clone, Default)]
pub struct BeanDefinition {
    /// 所属类型，工厂 Bean 构建时为空
    pub bean_class: Option<Arc<BeanClass>>,

    /// Bean 解析后的类型
    pub return_type: Option<TypeInfo>,

    /// Bean 的作用域
    pub scope: Scope,

    pub factory_bean_name: Option<String>,
    pub factory_method_name: Option<String>,

    /// 构造函数 / 工厂方法参数（按顺序）
    pub argument_values: Vec<BeanValue>,

    /// 需要注入的字段
    pub property_values: Vec<PropertyValue>,

    pub init_method_name: Option<String>,
    pub destroy_method_name: Option<String>,

    /// 缓存已选中的构造函数或方法，所有克隆共享
    resolved: Arc<OnceCell<ResolvedHandle>>,
}

impl BeanDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// 通过构造函数构建
    pub fn for_class(class: Arc<BeanClass>) -> Self {
        Self {
            return_type: Some(class.ty()),
            bean_class: Some(class),
            ..Self::default()
        }
    }

    /// 通过静态工厂方法构建，返回类型取自第一个同名静态方法
    pub fn for_static_factory(class: Arc<BeanClass>, method: impl Into<String>) -> Self {
        let method = method.into();
        let return_type = class
            .methods()
            .iter()
            .find(|m| m.is_static() && m.name() == method)
            .map(|m| m.returns());
        Self {
            bean_class: Some(class),
            return_type,
            factory_method_name: Some(method),
            ..Self::default()
        }
    }

    /// 通过另一个 Bean 的实例方法构建
    pub fn for_factory_bean(factory_bean: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            factory_bean_name: Some(factory_bean.into()),
            factory_method_name: Some(method.into()),
            ..Self::default()
        }
    }

    pub fn with_return_type(mut self, ty: TypeInfo) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_argument(mut self, value: BeanValue) -> Self {
        self.argument_values.push(value);
        self
    }

    pub fn with_property(mut self, property: PropertyValue) -> Self {
        self.property_values.push(property);
        self
    }

    pub fn with_init_method(mut self, method: impl Into<String>) -> Self {
        self.init_method_name = Some(method.into());
        self
    }

    pub fn with_destroy_method(mut self, method: impl Into<String>) -> Self {
        self.destroy_method_name = Some(method.into());
        self
    }

    pub fn is_singleton(&self) -> bool {
        self.scope == Scope::Singleton
    }

    pub fn is_prototype(&self) -> bool {
        self.scope == Scope::Prototype
    }

    /// 定义是否可用
    pub fn validate(&self) -> bool {
        self.validation_error().is_none()
    }

    /// 校验失败的原因
    pub fn validation_error(&self) -> Option<&'static str> {
        if self.return_type.is_none() {
            return Some("return type is not set");
        }
        let factory_bean_blank = self.factory_bean_name.as_deref().map_or(true, is_blank);
        let factory_method_blank = self.factory_method_name.as_deref().map_or(true, is_blank);

        if self.bean_class.is_none() && (factory_bean_blank || factory_method_blank) {
            return Some("without a bean class both factory bean name and factory method name are required");
        }
        if self.bean_class.is_some() && !factory_bean_blank {
            return Some("bean class and factory bean name are mutually exclusive");
        }
        None
    }

    pub(crate) fn resolved_handle(&self) -> Option<&ResolvedHandle> {
        self.resolved.get()
    }

    pub(crate) fn cache_handle(&self, handle: ResolvedHandle) {
        // 并发构建时先写入者生效
        let _ = self.resolved.set(handle);
    }

    /// 丢弃缓存的构建句柄，定义被修改后调用
    pub(crate) fn reset_resolved(&mut self) {
        self.resolved = Arc::new(OnceCell::new());
    }
}

impl PartialEq for BeanDefinition {
    fn eq(&self, other: &Self) -> bool {
        let same_class = match (&self.bean_class, &other.bean_class) {
            (Some(a), Some(b)) => a.type_id() == b.type_id(),
            (None, None) => true,
            _ => false,
        };
        same_class
            && self.return_type == other.return_type
            && self.scope == other.scope
            && self.factory_bean_name == other.factory_bean_name
            && self.factory_method_name == other.factory_method_name
            && self.init_method_name == other.init_method_name
            && self.destroy_method_name == other.destroy_method_name
            && self.argument_values == other.argument_values
            && self.property_values == other.property_values
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("bean_class", &self.bean_class.as_ref().map(|c| c.name()))
            .field("return_type", &self.return_type.map(|t| t.name()))
            .field("scope", &self.scope)
            .field("factory_bean_name", &self.factory_bean_name)
            .field("factory_method_name", &self.factory_method_name)
            .field("argument_values", &self.argument_values)
            .field("property_values", &self.property_values)
            .field("init_method_name", &self.init_method_name)
            .field("destroy_method_name", &self.destroy_method_name)
            .finish()
    }
}

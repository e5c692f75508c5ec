//! 实例化策略
//!
//! 根据 Bean 定义选择构建方式：
//! - 设置了 `factory_bean_name`：调用工厂 Bean 的实例方法
//! - 只设置了 `factory_method_name`：调用 `bean_class` 上的静态方法
//! - 其他情况：调用 `bean_class` 唯一的构造函数
//!
//! 选中的构造函数或方法缓存在定义上，之后的构建直接复用。

use crate::bean::{BeanDefinition, RawInstance, ResolvedHandle};
use crate::bean_factory::{BeanFactory, DefaultBeanFactory};
use crate::error::{ContainerError, ContainerResult};
use crate::metadata::{ConstructorMeta, MethodMeta};
use crate::proxy::ProxyObject;
use crate::utils::naming::is_blank;

/// 实例化策略
pub trait InstanceStrategy: Send + Sync {
    /// 策略名称（用于日志）
    fn name(&self) -> &'static str;

    /// 构建原始对象，不做属性注入和初始化
    fn instantiate(
        &self,
        bean_name: &str,
        definition: &BeanDefinition,
        factory: &DefaultBeanFactory,
    ) -> ContainerResult<RawInstance>;
}

/// 构造函数实例化
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstructorInstance;

/// 静态工厂方法实例化
#[derive(Debug, Default, Clone, Copy)]
pub struct FactoryMethodInstance;

/// 工厂 Bean 实例方法实例化
#[derive(Debug, Default, Clone, Copy)]
pub struct FactoryBeanInstance;

static CONSTRUCTOR_INSTANCE: ConstructorInstance = ConstructorInstance;
static FACTORY_METHOD_INSTANCE: FactoryMethodInstance = FactoryMethodInstance;
static FACTORY_BEAN_INSTANCE: FactoryBeanInstance = FactoryBeanInstance;

/// 为定义选择实例化策略
pub fn select_strategy(definition: &BeanDefinition) -> &'static dyn InstanceStrategy {
    let has_factory_bean = definition
        .factory_bean_name
        .as_deref()
        .is_some_and(|n| !is_blank(n));
    let has_factory_method = definition
        .factory_method_name
        .as_deref()
        .is_some_and(|n| !is_blank(n));

    if has_factory_bean {
        &FACTORY_BEAN_INSTANCE
    } else if has_factory_method {
        &FACTORY_METHOD_INSTANCE
    } else {
        &CONSTRUCTOR_INSTANCE
    }
}

fn creation_failed(bean_name: &str, err: anyhow::Error) -> ContainerError {
    ContainerError::BeanCreationFailed {
        bean: bean_name.to_string(),
        message: format!("{:#}", err),
    }
}

impl ConstructorInstance {
    fn resolve_constructor(definition: &BeanDefinition) -> ContainerResult<ConstructorMeta> {
        if let Some(ResolvedHandle::Constructor(constructor)) = definition.resolved_handle() {
            return Ok(constructor.clone());
        }

        let class = definition
            .bean_class
            .as_ref()
            .ok_or_else(|| ContainerError::NoMatchingConstructor {
                class: "<none>".to_string(),
                reason: "definition has no bean class".to_string(),
            })?;

        let constructor = match class.constructors() {
            [only] => only.clone(),
            [] => {
                return Err(ContainerError::NoMatchingConstructor {
                    class: class.name().to_string(),
                    reason: "no constructor declared".to_string(),
                })
            }
            many => {
                return Err(ContainerError::NoMatchingConstructor {
                    class: class.name().to_string(),
                    reason: format!("{} constructors declared, exactly one is required", many.len()),
                })
            }
        };

        definition.cache_handle(ResolvedHandle::Constructor(constructor.clone()));
        Ok(constructor)
    }
}

impl InstanceStrategy for ConstructorInstance {
    fn name(&self) -> &'static str {
        "constructor"
    }

    fn instantiate(
        &self,
        bean_name: &str,
        definition: &BeanDefinition,
        factory: &DefaultBeanFactory,
    ) -> ContainerResult<RawInstance> {
        let constructor = Self::resolve_constructor(definition)?;
        let class_name = definition
            .bean_class
            .as_ref()
            .map(|c| c.name())
            .unwrap_or_default()
            .to_string();

        let args = factory.resolve_arguments(definition)?;
        if args.len() != constructor.arity() {
            return Err(ContainerError::NoMatchingConstructor {
                class: class_name,
                reason: format!(
                    "constructor takes {} argument(s), {} given",
                    constructor.arity(),
                    args.len()
                ),
            });
        }

        let args = factory
            .coerce_arguments(constructor.params(), args)
            .map_err(|e| ContainerError::NoMatchingConstructor {
                class: class_name,
                reason: e.to_string(),
            })?;

        constructor
            .invoke(&args)
            .map_err(|e| creation_failed(bean_name, e))
    }
}

impl InstanceStrategy for FactoryMethodInstance {
    fn name(&self) -> &'static str {
        "static-factory-method"
    }

    fn instantiate(
        &self,
        bean_name: &str,
        definition: &BeanDefinition,
        factory: &DefaultBeanFactory,
    ) -> ContainerResult<RawInstance> {
        let method_name = definition.factory_method_name.clone().unwrap_or_default();
        let class = definition
            .bean_class
            .as_ref()
            .ok_or_else(|| ContainerError::NoMatchingFactoryMethod {
                owner: "<none>".to_string(),
                method: method_name.clone(),
                arity: definition.argument_values.len(),
            })?;

        let args = factory.resolve_arguments(definition)?;
        let no_match = || ContainerError::NoMatchingFactoryMethod {
            owner: class.name().to_string(),
            method: method_name.clone(),
            arity: args.len(),
        };

        let method = match definition.resolved_handle() {
            Some(ResolvedHandle::Method(method)) => method.clone(),
            _ => {
                let method = class
                    .find_method(&method_name, args.len(), true)
                    .cloned()
                    .ok_or_else(no_match)?;
                definition.cache_handle(ResolvedHandle::Method(method.clone()));
                method
            }
        };

        let args = factory
            .coerce_arguments(method.params(), args.clone())
            .map_err(|e| {
                tracing::debug!("Arguments of '{}::{}' do not match: {}", class.name(), method_name, e);
                no_match()
            })?;

        method
            .invoke(None, &args)
            .map_err(|e| creation_failed(bean_name, e))
    }
}

impl FactoryBeanInstance {
    fn resolve_method(
        definition: &BeanDefinition,
        factory: &DefaultBeanFactory,
        factory_bean: &crate::Instance,
        factory_bean_name: &str,
        method_name: &str,
        arity: usize,
    ) -> ContainerResult<MethodMeta> {
        if let Some(ResolvedHandle::Method(method)) = definition.resolved_handle() {
            return Ok(method.clone());
        }

        let method = factory
            .resolve_class(factory_bean)
            .and_then(|class| class.find_method(method_name, arity, false).cloned())
            .ok_or_else(|| ContainerError::NoMatchingFactoryMethod {
                owner: factory_bean_name.to_string(),
                method: method_name.to_string(),
                arity,
            })?;

        definition.cache_handle(ResolvedHandle::Method(method.clone()));
        Ok(method)
    }
}

impl InstanceStrategy for FactoryBeanInstance {
    fn name(&self) -> &'static str {
        "factory-bean-method"
    }

    fn instantiate(
        &self,
        bean_name: &str,
        definition: &BeanDefinition,
        factory: &DefaultBeanFactory,
    ) -> ContainerResult<RawInstance> {
        let factory_bean_name = definition.factory_bean_name.clone().unwrap_or_default();
        let method_name = definition.factory_method_name.clone().unwrap_or_default();

        let factory_bean = factory.get_bean(&factory_bean_name)?;
        let args = factory.resolve_arguments(definition)?;
        let method = Self::resolve_method(
            definition,
            factory,
            &factory_bean,
            &factory_bean_name,
            &method_name,
            args.len(),
        )?;

        let arity = args.len();
        let args = factory
            .coerce_arguments(method.params(), args)
            .map_err(|e| {
                tracing::debug!("Arguments of '{}.{}' do not match: {}", factory_bean_name, method_name, e);
                ContainerError::NoMatchingFactoryMethod {
                    owner: factory_bean_name.clone(),
                    method: method_name.clone(),
                    arity,
                }
            })?;

        // 工厂 Bean 被代理时，调用经过代理
        if let Some(proxy) = factory_bean.downcast_ref::<ProxyObject>() {
            return proxy
                .invoke_method(&method, args)
                .map_err(|e| ContainerError::BeanCreationFailed {
                    bean: bean_name.to_string(),
                    message: e.to_string(),
                });
        }

        method
            .invoke(Some(&factory_bean), &args)
            .map_err(|e| creation_failed(bean_name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::{BeanValue, Instance};
    use crate::bean_factory::ConfigurableBeanFactory;
    use crate::bean_post_processor::FnPostProcessor;
    use crate::metadata::{BeanClass, TypeInfo};
    use std::sync::Arc;

    struct Plain;

    fn plain_class() -> Arc<BeanClass> {
        Arc::new(BeanClass::builder::<Plain>().build())
    }

    #[test]
    fn test_select_strategy() {
        let by_constructor = BeanDefinition::for_class(plain_class());
        assert_eq!(select_strategy(&by_constructor).name(), "constructor");

        let mut by_static = BeanDefinition::for_class(plain_class());
        by_static.factory_method_name = Some("create".to_string());
        assert_eq!(select_strategy(&by_static).name(), "static-factory-method");

        let by_factory_bean = BeanDefinition::for_factory_bean("config", "plain")
            .with_return_type(TypeInfo::of::<Plain>());
        assert_eq!(select_strategy(&by_factory_bean).name(), "factory-bean-method");

        let mut blank_factory_bean = BeanDefinition::for_class(plain_class());
        blank_factory_bean.factory_bean_name = Some(" ".to_string());
        assert_eq!(select_strategy(&blank_factory_bean).name(), "constructor");
    }

    #[test]
    fn test_constructor_required() {
        let factory = DefaultBeanFactory::new();
        let def = BeanDefinition::for_class(plain_class());
        let err = ConstructorInstance.instantiate("plain", &def, &factory).unwrap_err();
        assert!(matches!(err, ContainerError::NoMatchingConstructor { .. }));
    }

    #[test]
    fn test_constructor_arity_mismatch() {
        let class = Arc::new(
            BeanClass::builder::<Plain>()
                .constructor(ConstructorMeta::new(vec![], |_| Ok(Plain)))
                .build(),
        );
        let factory = DefaultBeanFactory::new();
        let def = BeanDefinition::for_class(class).with_argument(BeanValue::literal(1u8));
        let err = ConstructorInstance.instantiate("plain", &def, &factory).unwrap_err();
        assert!(matches!(err, ContainerError::NoMatchingConstructor { .. }));
    }

    #[test]
    fn test_constructor_argument_type_mismatch() {
        let class = Arc::new(
            BeanClass::builder::<Plain>()
                .constructor(ConstructorMeta::new(vec![crate::metadata::ParamMeta::of::<u32>()], |_| Ok(Plain)))
                .build(),
        );
        let factory = DefaultBeanFactory::new();
        let def = BeanDefinition::for_class(class).with_argument(BeanValue::literal("seven".to_string()));
        let err = ConstructorInstance.instantiate("plain", &def, &factory).unwrap_err();
        assert!(matches!(err, ContainerError::NoMatchingConstructor { ref class, .. } if class.ends_with("Plain")));
    }

    #[test]
    fn test_constructor_error_is_creation_failure() {
        let class = Arc::new(
            BeanClass::builder::<Plain>()
                .constructor(ConstructorMeta::new(vec![], |_| Err::<Plain, _>(anyhow::anyhow!("disk full"))))
                .build(),
        );
        let factory = DefaultBeanFactory::new();
        let def = BeanDefinition::for_class(class);
        let err = ConstructorInstance.instantiate("plain", &def, &factory).unwrap_err();
        match err {
            ContainerError::BeanCreationFailed { bean, message } => {
                assert_eq!(bean, "plain");
                assert!(message.contains("disk full"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    struct Maker;

    fn maker_class() -> Arc<BeanClass> {
        Arc::new(
            BeanClass::builder::<Maker>()
                .constructor(ConstructorMeta::new(vec![], |_| Ok(Maker)))
                .method(MethodMeta::instance("make", vec![], |_: &Maker, _| Ok(Plain)))
                .method(MethodMeta::instance("broken", vec![], |_: &Maker, _| {
                    Err::<Plain, _>(anyhow::anyhow!("out of parts"))
                }))
                .method(MethodMeta::static_fn("create", vec![], |_| Ok(Plain)))
                .build(),
        )
    }

    fn factory_with_maker() -> DefaultBeanFactory {
        let factory = DefaultBeanFactory::new();
        factory
            .register_bean_definition("maker", BeanDefinition::for_class(maker_class()))
            .unwrap();
        factory
    }

    #[test]
    fn test_static_factory_method_not_found() {
        let factory = DefaultBeanFactory::new();

        let unknown = BeanDefinition::for_static_factory(maker_class(), "assemble");
        let err = FactoryMethodInstance.instantiate("plain", &unknown, &factory).unwrap_err();
        assert!(matches!(
            err,
            ContainerError::NoMatchingFactoryMethod { ref method, arity: 0, .. } if method == "assemble"
        ));

        let wrong_arity =
            BeanDefinition::for_static_factory(maker_class(), "create").with_argument(BeanValue::literal(1u8));
        let err = FactoryMethodInstance.instantiate("plain", &wrong_arity, &factory).unwrap_err();
        assert!(matches!(
            err,
            ContainerError::NoMatchingFactoryMethod { ref method, arity: 1, .. } if method == "create"
        ));
    }

    #[test]
    fn test_factory_bean_method_not_found() {
        let factory = factory_with_maker();

        let unknown = BeanDefinition::for_factory_bean("maker", "assemble").with_return_type(TypeInfo::of::<Plain>());
        let err = FactoryBeanInstance.instantiate("plain", &unknown, &factory).unwrap_err();
        assert!(matches!(
            err,
            ContainerError::NoMatchingFactoryMethod { ref owner, ref method, arity: 0 }
                if owner == "maker" && method == "assemble"
        ));

        // 静态方法不能通过工厂 Bean 调用
        let static_only = BeanDefinition::for_factory_bean("maker", "create").with_return_type(TypeInfo::of::<Plain>());
        let err = FactoryBeanInstance.instantiate("plain", &static_only, &factory).unwrap_err();
        assert!(matches!(err, ContainerError::NoMatchingFactoryMethod { .. }));

        let wrong_arity = BeanDefinition::for_factory_bean("maker", "make")
            .with_return_type(TypeInfo::of::<Plain>())
            .with_argument(BeanValue::literal(1u8));
        let err = FactoryBeanInstance.instantiate("plain", &wrong_arity, &factory).unwrap_err();
        assert!(matches!(err, ContainerError::NoMatchingFactoryMethod { arity: 1, .. }));
    }

    #[test]
    fn test_factory_bean_method_error_is_creation_failure() {
        let factory = factory_with_maker();
        let def = BeanDefinition::for_factory_bean("maker", "broken").with_return_type(TypeInfo::of::<Plain>());
        let err = FactoryBeanInstance.instantiate("plain", &def, &factory).unwrap_err();
        assert!(matches!(err, ContainerError::BeanCreationFailed { ref bean, ref message }
            if bean == "plain" && message.contains("out of parts")));
    }

    struct Refusing;

    impl crate::proxy::InvocationHandler for Refusing {
        fn invoke(&self, _: &Instance, method: &MethodMeta, _: Vec<Instance>) -> ContainerResult<RawInstance> {
            Err(ContainerError::InvocationFailed {
                target: "Maker".to_string(),
                method: method.name().to_string(),
                message: "refused".to_string(),
            })
        }
    }

    #[test]
    fn test_proxied_factory_bean_error_is_creation_failure() {
        let factory = factory_with_maker();
        factory.register_post_processor(Arc::new(FnPostProcessor::new("refuse", |bean, name| {
            if name != "maker" {
                return Ok(bean);
            }
            Ok(Arc::new(ProxyObject::new(bean, maker_class(), Arc::new(Refusing))) as Instance)
        })));

        let def = BeanDefinition::for_factory_bean("maker", "make").with_return_type(TypeInfo::of::<Plain>());
        let err = FactoryBeanInstance.instantiate("plain", &def, &factory).unwrap_err();
        match err {
            ContainerError::BeanCreationFailed { bean, message } => {
                assert_eq!(bean, "plain");
                assert!(message.contains("refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

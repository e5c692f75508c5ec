// sprout-core: 元数据驱动的依赖注入容器
//
// 提供：
// - Bean 定义注册表和单例/原型作用域
// - 构造函数、静态工厂方法、工厂 Bean 方法三种构建方式
// - 属性注入、init/destroy 回调、BeanPostProcessor
// - 基于组件元数据的声明式上下文（两步注册和装配）
// - 方法调用代理的基础设施（ProxyObject / InvocationHandler）

pub mod bean;
pub mod bean_factory;
pub mod bean_post_processor;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod instance;
pub mod logging;
pub mod metadata;
pub mod proxy;
pub mod scope;
pub mod utils;

// 重新导出常用类型
pub use bean::{
    arg, arg_cloned, cast_cloned, cast_instance, BeanDefinition, BeanReference, BeanValue, Instance,
    PropertyValue, RawInstance,
};
pub use bean_factory::{
    BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, ConfigurableListableBeanFactory,
    DefaultBeanFactory, ListableBeanFactory, TypeResolver,
};
pub use bean_post_processor::{BeanPostProcessor, FnPostProcessor};
pub use config::{ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource};
pub use constants::*;
pub use context::{
    ApplicationContext, ApplicationContextBuilder, ClassRegistration, ClassScanner, ComponentProperty,
    ConfigSource, InventoryScanner, StaticScanner, TypeResolution,
};
pub use error::{ContainerError, ContainerResult};
pub use instance::{select_strategy, InstanceStrategy};
pub use logging::{LogFormat, LoggingConfig};
pub use metadata::{
    Autowired, BeanClass, BeanClassBuilder, BeanMarker, ComponentMarker, ConstructorMeta, FieldMeta,
    InterfaceMeta, LifecycleMethod, MethodMeta, ParamMeta, Stereotype, TypeInfo, TypeKind,
};
pub use proxy::{InvocationHandler, ProxyObject};
pub use scope::Scope;

// 导出 inventory，供宏使用
pub use inventory;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::bean::{arg, arg_cloned, cast_cloned, cast_instance, Instance, RawInstance};
    pub use crate::bean_factory::{
        BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, ConfigurableListableBeanFactory,
        DefaultBeanFactory, ListableBeanFactory,
    };
    pub use crate::bean_post_processor::BeanPostProcessor;
    pub use crate::config::{self, ConfigValue, Environment, MapPropertySource, PropertySource};
    pub use crate::context::ApplicationContext;
    pub use crate::error::{ContainerError, ContainerResult};
    pub use crate::metadata::{
        Autowired, BeanClass, BeanMarker, ComponentMarker, ConstructorMeta, FieldMeta, LifecycleMethod,
        MethodMeta, ParamMeta, TypeInfo,
    };
    pub use crate::proxy::{InvocationHandler, ProxyObject};
    pub use crate::scope::Scope;
    pub use crate::{interface, register_class};
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}

//! 代理对象
//!
//! Rust 没有运行时生成的动态代理。被增强的 Bean 以 [`ProxyObject`] 的形式
//! 保存在容器中：它持有目标实例、目标类描述符以及调用处理器，通过
//! [`ProxyObject::invoke`]（或 `BeanFactory::invoke`）按名称调用方法时，
//! 调用会先交给处理器。
//!
//! 通过 `cast_instance` 直接取得具体类型时会穿透到目标对象，此时的调用
//! 不经过处理器。

use std::fmt;
use std::sync::Arc;

use crate::bean::{Instance, RawInstance};
use crate::error::{ContainerError, ContainerResult};
use crate::metadata::{BeanClass, MethodMeta};

/// 方法调用处理器
pub trait InvocationHandler: Send + Sync {
    /// 处理一次方法调用，`target` 是被代理的原始对象
    fn invoke(&self, target: &Instance, method: &MethodMeta, args: Vec<Instance>) -> ContainerResult<RawInstance>;
}

/// 代理对象
pub struct ProxyObject {
    target: Instance,
    class: Arc<BeanClass>,
    handler: Arc<dyn InvocationHandler>,
}

impl ProxyObject {
    pub fn new(target: Instance, class: Arc<BeanClass>, handler: Arc<dyn InvocationHandler>) -> Self {
        Self {
            target,
            class,
            handler,
        }
    }

    /// 被代理的原始对象
    pub fn target(&self) -> &Instance {
        &self.target
    }

    /// 目标对象的类描述符
    pub fn class(&self) -> &Arc<BeanClass> {
        &self.class
    }

    /// 按名称和参数个数调用实例方法
    pub fn invoke(&self, method: &str, args: Vec<Instance>) -> ContainerResult<RawInstance> {
        let meta = self
            .class
            .find_method(method, args.len(), false)
            .ok_or_else(|| ContainerError::NoSuchMethod {
                class: self.class.name().to_string(),
                method: method.to_string(),
                arity: args.len(),
            })?
            .clone();
        self.invoke_method(&meta, args)
    }

    /// 调用已解析的方法
    pub fn invoke_method(&self, method: &MethodMeta, args: Vec<Instance>) -> ContainerResult<RawInstance> {
        self.handler.invoke(&self.target, method, args)
    }
}

impl fmt::Debug for ProxyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyObject")
            .field("target", &self.class.name())
            .finish()
    }
}

/// 如果实例是代理，返回其目标对象；否则原样返回
pub fn unwrap_proxy(instance: &Instance) -> Instance {
    match instance.downcast_ref::<ProxyObject>() {
        Some(proxy) => unwrap_proxy(proxy.target()),
        None => Arc::clone(instance),
    }
}

/// 实例是否为代理
pub fn is_proxy(instance: &Instance) -> bool {
    instance.downcast_ref::<ProxyObject>().is_some()
}

/// 直接调用目标方法，不经过任何处理器
pub fn invoke_direct(target: &Instance, method: &MethodMeta, args: &[Instance]) -> ContainerResult<RawInstance> {
    let receiver = if method.is_static() { None } else { Some(target) };
    method
        .invoke(receiver, args)
        .map_err(|e| ContainerError::InvocationFailed {
            target: crate::utils::naming::simple_type_name(method.owner()).to_string(),
            method: method.name().to_string(),
            message: format!("{:#}", e),
        })
}

//! AOP 代理工厂
//!
//! 为匹配到通知器的 Bean 创建 [`ProxyObject`]。每次调用时只有切点匹配当前方法的
//! 通知器参与，按通知器的注册顺序组成拦截器链，第一个通知器在最外层。

use std::sync::{Arc, Weak};

use sprout_core::proxy::invoke_direct;
use sprout_core::{
    BeanClass, BeanFactory, ContainerError, ContainerResult, Instance, InvocationHandler, MethodMeta,
    ProxyObject, RawInstance,
};

use crate::{Advisor, JoinPoint, MethodInterceptor, ProceedingJoinPoint};

/// 代理工厂 Trait
pub trait AopProxyFactory: Send + Sync {
    /// 创建代理；`bean_factory` 用于延迟解析通知 Bean
    fn create_proxy(
        &self,
        target: Instance,
        class: Arc<BeanClass>,
        advisors: Vec<Arc<dyn Advisor>>,
        bean_factory: Weak<dyn BeanFactory>,
    ) -> ContainerResult<Instance>;
}

/// 默认代理工厂，产出 [`ProxyObject`]
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAopProxyFactory;

impl AopProxyFactory for DefaultAopProxyFactory {
    fn create_proxy(
        &self,
        target: Instance,
        class: Arc<BeanClass>,
        advisors: Vec<Arc<dyn Advisor>>,
        bean_factory: Weak<dyn BeanFactory>,
    ) -> ContainerResult<Instance> {
        let handler = AdvisedInvocationHandler::new(Arc::clone(&class), advisors, bean_factory);
        Ok(Arc::new(ProxyObject::new(target, class, Arc::new(handler))))
    }
}

/// 执行通知链的调用处理器
pub struct AdvisedInvocationHandler {
    class: Arc<BeanClass>,
    advisors: Vec<Arc<dyn Advisor>>,
    bean_factory: Weak<dyn BeanFactory>,
}

impl AdvisedInvocationHandler {
    pub fn new(class: Arc<BeanClass>, advisors: Vec<Arc<dyn Advisor>>, bean_factory: Weak<dyn BeanFactory>) -> Self {
        Self {
            class,
            advisors,
            bean_factory,
        }
    }

    pub fn advisors(&self) -> &[Arc<dyn Advisor>] {
        &self.advisors
    }

    /// 为一个方法构建拦截器链
    fn interceptors(&self, method: &MethodMeta) -> ContainerResult<Vec<Arc<dyn MethodInterceptor>>> {
        let matched: Vec<&Arc<dyn Advisor>> = self
            .advisors
            .iter()
            .filter(|advisor| advisor.pointcut().matches_method(&self.class, method))
            .collect();
        if matched.is_empty() {
            return Ok(Vec::new());
        }

        let bean_factory = self.bean_factory.upgrade().ok_or_else(|| ContainerError::InvocationFailed {
            target: self.class.simple_name().to_string(),
            method: method.name().to_string(),
            message: "bean factory has been dropped".to_string(),
        })?;

        matched
            .into_iter()
            .map(|advisor| advisor.advice(bean_factory.as_ref()).map(|advice| advice.into_interceptor()))
            .collect()
    }
}

impl InvocationHandler for AdvisedInvocationHandler {
    fn invoke(&self, target: &Instance, method: &MethodMeta, args: Vec<Instance>) -> ContainerResult<RawInstance> {
        let chain = self.interceptors(method)?;
        if chain.is_empty() {
            tracing::trace!("No advice for {}::{}, invoking directly", self.class.simple_name(), method.name());
            return invoke_direct(target, method, &args);
        }

        tracing::trace!(
            "Invoking {}::{} through {} interceptor(s)",
            self.class.simple_name(),
            method.name(),
            chain.len()
        );
        let join_point = JoinPoint::new(self.class.name(), method.name(), args);
        ProceedingJoinPoint::new(join_point, target, method, &chain).proceed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Advice, PointcutAdvisor, PointcutExpression};
    use parking_lot::Mutex;
    use sprout_core::{DefaultBeanFactory, ParamMeta};

    struct Greeter;

    fn greeter_class() -> Arc<BeanClass> {
        Arc::new(
            BeanClass::builder::<Greeter>()
                .method(MethodMeta::instance("greet", vec![ParamMeta::of::<String>()], |_: &Greeter, args| {
                    Ok(format!("hello {}", sprout_core::arg_cloned::<String>(args, 0)?))
                }))
                .method(MethodMeta::instance("name", vec![], |_: &Greeter, _| Ok("greeter".to_string())))
                .build(),
        )
    }

    #[test]
    fn test_proxy_advises_only_matching_methods() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let advisor: Arc<dyn Advisor> = Arc::new(PointcutAdvisor::execution(
            "log",
            "* Greeter.greet(..)",
            Advice::before(move |jp| {
                sink.lock().push(jp.signature());
                Ok(())
            }),
        ));

        let factory: Arc<dyn BeanFactory> = Arc::new(DefaultBeanFactory::new());
        let proxy = DefaultAopProxyFactory
            .create_proxy(Arc::new(Greeter), greeter_class(), vec![advisor], Arc::downgrade(&factory))
            .unwrap();
        let proxy = proxy.downcast_ref::<ProxyObject>().unwrap();

        let greeting = proxy.invoke("greet", vec![Arc::new("bob".to_string()) as Instance]).unwrap();
        assert_eq!(*greeting.downcast::<String>().unwrap(), "hello bob");
        let name = proxy.invoke("name", vec![]).unwrap();
        assert_eq!(*name.downcast::<String>().unwrap(), "greeter");

        assert_eq!(*log.lock(), vec!["Greeter::greet".to_string()]);
    }

    #[test]
    fn test_dropped_factory_fails_advised_calls() {
        let advisor: Arc<dyn Advisor> = Arc::new(PointcutAdvisor::new(
            "all",
            PointcutExpression::All,
            Advice::before(|_| Ok(())),
        ));
        let factory: Arc<dyn BeanFactory> = Arc::new(DefaultBeanFactory::new());
        let weak = Arc::downgrade(&factory);
        drop(factory);

        let handler = AdvisedInvocationHandler::new(greeter_class(), vec![advisor], weak);
        let target: Instance = Arc::new(Greeter);
        let class = greeter_class();
        let method = class.find_method("name", 0, false).unwrap();

        let err = handler.invoke(&target, method, vec![]).unwrap_err();
        assert!(matches!(err, ContainerError::InvocationFailed { .. }));
    }
}

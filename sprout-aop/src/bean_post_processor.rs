//! AdvisorAutoProxyCreator - 自动为匹配切点的 Bean 创建 AOP 代理
//!
//! 通过实现 BeanPostProcessor，在 Bean 初始化后检查所有通知器，
//! 有匹配的通知器时用代理替换原始 Bean。

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use sprout_core::prelude::*;

use crate::advisor::registered_advisors;
use crate::{Advisor, AopProxyFactory, DefaultAopProxyFactory};

/// 自动代理创建器
///
/// ## 工作原理
///
/// 1. 取得 Bean 的运行时类描述符，没有描述符的 Bean 原样返回
/// 2. 对每个通知器先调用 `matches_class`，不匹配时跳过该通知器
/// 3. 再逐个检查类型声明的实例方法，有一个方法匹配即认为通知器匹配
/// 4. 有匹配的通知器时通过 [`AopProxyFactory`] 创建代理
///
/// ## 使用示例
///
/// ```ignore
/// let creator = AdvisorAutoProxyCreator::for_context(&context).with_registered_advisors();
/// context.register_post_processor(Arc::new(creator));
/// ```
pub struct AdvisorAutoProxyCreator {
    advisors: RwLock<Vec<Arc<dyn Advisor>>>,
    proxy_factory: Arc<dyn AopProxyFactory>,
    bean_factory: Weak<dyn BeanFactory>,
}

impl AdvisorAutoProxyCreator {
    /// 创建新的自动代理创建器
    ///
    /// 持有容器的弱引用，代理和容器之间不会形成引用环
    pub fn new(bean_factory: Weak<dyn BeanFactory>) -> Self {
        Self {
            advisors: RwLock::new(Vec::new()),
            proxy_factory: Arc::new(DefaultAopProxyFactory),
            bean_factory,
        }
    }

    /// 为应用上下文创建
    pub fn for_context(context: &Arc<ApplicationContext>) -> Self {
        let factory: Arc<dyn BeanFactory> = Arc::clone(context.bean_factory()) as Arc<dyn BeanFactory>;
        Self::new(Arc::downgrade(&factory))
    }

    /// 使用自定义的代理工厂
    pub fn with_proxy_factory(mut self, proxy_factory: Arc<dyn AopProxyFactory>) -> Self {
        self.proxy_factory = proxy_factory;
        self
    }

    pub fn with_advisor(self, advisor: Arc<dyn Advisor>) -> Self {
        self.add_advisor(advisor);
        self
    }

    /// 加载所有通过 `register_advisor!` 登记的通知器
    pub fn with_registered_advisors(self) -> Self {
        let advisors = registered_advisors();
        tracing::info!("Auto-loaded {} advisor(s)", advisors.len());
        self.advisors.write().extend(advisors);
        self
    }

    /// 注册通知器，只影响之后创建的 Bean
    pub fn add_advisor(&self, advisor: Arc<dyn Advisor>) {
        tracing::debug!("Registering advisor: {}", advisor.name());
        self.advisors.write().push(advisor);
    }

    pub fn advisor_count(&self) -> usize {
        self.advisors.read().len()
    }

    /// 获取匹配该类型的所有通知器
    fn matched_advisors(&self, class: &BeanClass) -> Vec<Arc<dyn Advisor>> {
        self.advisors
            .read()
            .iter()
            .filter(|advisor| {
                let pointcut = advisor.pointcut();
                pointcut.matches_class(class)
                    && class
                        .methods()
                        .iter()
                        .filter(|method| !method.is_static())
                        .any(|method| pointcut.matches_method(class, method))
            })
            .cloned()
            .collect()
    }
}

impl BeanPostProcessor for AdvisorAutoProxyCreator {
    fn name(&self) -> &str {
        "AdvisorAutoProxyCreator"
    }

    fn post_process_after_initialization(&self, bean: Instance, bean_name: &str) -> ContainerResult<Instance> {
        if self.advisors.read().is_empty() {
            return Ok(bean);
        }
        let Some(bean_factory) = self.bean_factory.upgrade() else {
            tracing::warn!("Bean factory dropped, skipping proxy creation for '{}'", bean_name);
            return Ok(bean);
        };
        let Some(class) = bean_factory.resolve_class(&bean) else {
            tracing::trace!("Bean '{}' has no class metadata, skipping AOP wrapping", bean_name);
            return Ok(bean);
        };

        let advisors = self.matched_advisors(&class);
        if advisors.is_empty() {
            tracing::trace!("Bean '{}' does not match any advisor, skipping AOP wrapping", bean_name);
            return Ok(bean);
        }

        tracing::info!(
            "Creating AOP proxy for bean '{}' with {} advisor(s): {:?}",
            bean_name,
            advisors.len(),
            advisors.iter().map(|a| a.name().to_string()).collect::<Vec<_>>()
        );

        self.proxy_factory
            .create_proxy(bean, class, advisors, self.bean_factory.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Advice, PointcutAdvisor, PointcutExpression};

    struct Repo;

    fn repo_class() -> BeanClass {
        BeanClass::builder::<Repo>()
            .constructor(ConstructorMeta::new(vec![], |_| Ok(Repo)))
            .method(MethodMeta::instance("load", vec![], |_: &Repo, _| Ok(1u8)))
            .method(MethodMeta::static_fn("create", vec![], |_| Ok(Repo)))
            .build()
    }

    fn factory_with_repo() -> Arc<DefaultBeanFactory> {
        let factory = Arc::new(DefaultBeanFactory::new());
        factory
            .register_bean_definition("repo", sprout_core::BeanDefinition::for_class(Arc::new(repo_class())))
            .unwrap();
        factory
    }

    fn creator(factory: &Arc<DefaultBeanFactory>, expression: &str) -> Arc<AdvisorAutoProxyCreator> {
        let as_dyn: Arc<dyn BeanFactory> = Arc::clone(factory) as Arc<dyn BeanFactory>;
        Arc::new(AdvisorAutoProxyCreator::new(Arc::downgrade(&as_dyn)).with_advisor(Arc::new(
            PointcutAdvisor::execution("test", expression, Advice::before(|_| Ok(()))),
        )))
    }

    #[test]
    fn test_matching_bean_is_proxied() {
        let factory = factory_with_repo();
        factory.register_post_processor(creator(&factory, "* Repo.load(..)"));

        let bean = factory.get_bean("repo").unwrap();
        assert!(bean.downcast_ref::<ProxyObject>().is_some());
        // 类型访问穿透代理
        assert!(factory.get_bean_of::<Repo>("repo").is_ok());
    }

    #[test]
    fn test_class_mismatch_passes_through() {
        let factory = factory_with_repo();
        factory.register_post_processor(creator(&factory, "* Other.load(..)"));

        let bean = factory.get_bean("repo").unwrap();
        assert!(bean.downcast_ref::<Repo>().is_some());
    }

    #[test]
    fn test_static_methods_are_not_advised() {
        let factory = factory_with_repo();
        factory.register_post_processor(creator(&factory, "* Repo.create(..)"));

        let bean = factory.get_bean("repo").unwrap();
        assert!(bean.downcast_ref::<Repo>().is_some());
    }

    #[test]
    fn test_advisors_are_global() {
        let factory = factory_with_repo();
        let as_dyn: Arc<dyn BeanFactory> = Arc::clone(&factory) as Arc<dyn BeanFactory>;
        let creator = AdvisorAutoProxyCreator::new(Arc::downgrade(&as_dyn));
        assert_eq!(creator.advisor_count(), 0);

        creator.add_advisor(Arc::new(PointcutAdvisor::new(
            "any",
            PointcutExpression::method_pattern("load"),
            Advice::after(|_| Ok(())),
        )));
        assert_eq!(creator.advisor_count(), 1);

        let proxied = creator.post_process_after_initialization(Arc::new(Repo), "repo").unwrap();
        assert!(proxied.downcast_ref::<ProxyObject>().is_some());
    }
}

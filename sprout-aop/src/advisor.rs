//! 通知器（Advisor）
//!
//! 通知器把一个切点和一个通知绑定在一起。通知可以直接给出，也可以是容器中
//! 一个 Bean 的名称，在第一次需要时才从容器中取出。

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use sprout_core::{cast_cloned, BeanFactory, ContainerError, ContainerResult};

use crate::{Advice, Pointcut, PointcutExpression};

/// 通知器 Trait
pub trait Advisor: Send + Sync {
    /// 通知器名称（用于日志和调试）
    fn name(&self) -> &str;

    fn pointcut(&self) -> &dyn Pointcut;

    /// 获取通知，通知 Bean 在这里按名称解析
    fn advice(&self, bean_factory: &dyn BeanFactory) -> ContainerResult<Advice>;
}

/// 通知来源
#[derive(Debug, Clone)]
pub enum AdviceSource {
    /// 直接给出的通知
    Inline(Advice),
    /// 通知 Bean 的名称，Bean 的值必须是 [`Advice`]
    Bean(String),
}

/// 基于切点的通知器
pub struct PointcutAdvisor {
    name: String,
    pointcut: Arc<dyn Pointcut>,
    source: AdviceSource,
    resolved: OnceCell<Advice>,
}

impl PointcutAdvisor {
    pub fn new(name: impl Into<String>, pointcut: impl Pointcut + 'static, advice: Advice) -> Self {
        Self {
            name: name.into(),
            pointcut: Arc::new(pointcut),
            source: AdviceSource::Inline(advice),
            resolved: OnceCell::new(),
        }
    }

    /// 通知由名为 `advice_bean` 的 Bean 提供
    pub fn with_advice_bean(
        name: impl Into<String>,
        pointcut: impl Pointcut + 'static,
        advice_bean: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            pointcut: Arc::new(pointcut),
            source: AdviceSource::Bean(advice_bean.into()),
            resolved: OnceCell::new(),
        }
    }

    /// 使用 execution 表达式创建
    pub fn execution(name: impl Into<String>, expression: &str, advice: Advice) -> Self {
        Self::new(name, PointcutExpression::execution(expression), advice)
    }

    pub fn source(&self) -> &AdviceSource {
        &self.source
    }
}

impl Advisor for PointcutAdvisor {
    fn name(&self) -> &str {
        &self.name
    }

    fn pointcut(&self) -> &dyn Pointcut {
        self.pointcut.as_ref()
    }

    fn advice(&self, bean_factory: &dyn BeanFactory) -> ContainerResult<Advice> {
        match &self.source {
            AdviceSource::Inline(advice) => Ok(advice.clone()),
            AdviceSource::Bean(bean_name) => self
                .resolved
                .get_or_try_init(|| {
                    tracing::debug!("Resolving advice bean '{}' for advisor '{}'", bean_name, self.name);
                    let bean = bean_factory.get_bean(bean_name)?;
                    cast_cloned::<Advice>(&bean).map_err(|_| ContainerError::TypeMismatch {
                        expected: std::any::type_name::<Advice>().to_string(),
                        found: format!("bean '{}'", bean_name),
                    })
                })
                .cloned(),
        }
    }
}

impl fmt::Debug for PointcutAdvisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointcutAdvisor")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

/// 通知器注册器
///
/// 用于 inventory 自动收集通知器
pub struct AdvisorRegistration {
    /// 通知器名称
    pub name: &'static str,

    /// 创建通知器实例的函数
    pub creator: fn() -> Arc<dyn Advisor>,
}

impl AdvisorRegistration {
    pub const fn new(name: &'static str, creator: fn() -> Arc<dyn Advisor>) -> Self {
        Self { name, creator }
    }

    /// 创建通知器实例
    pub fn create_instance(&self) -> Arc<dyn Advisor> {
        (self.creator)()
    }
}

// 使用 inventory 收集所有通知器注册器
inventory::collect!(AdvisorRegistration);

/// 创建所有通过 [`register_advisor!`] 登记的通知器
pub fn registered_advisors() -> Vec<Arc<dyn Advisor>> {
    inventory::iter::<AdvisorRegistration>
        .into_iter()
        .map(|registration| {
            tracing::debug!("Loading advisor: {}", registration.name);
            registration.create_instance()
        })
        .collect()
}

/// 在编译期登记一个通知器
///
/// ```ignore
/// fn audit_advisor() -> Arc<dyn Advisor> {
///     Arc::new(PointcutAdvisor::execution("audit", "* OrderService.*(..)", Advice::before(|_| Ok(()))))
/// }
///
/// sprout_aop::register_advisor!("audit", audit_advisor);
/// ```
#[macro_export]
macro_rules! register_advisor {
    ($name:expr, $creator:path) => {
        $crate::inventory::submit! {
            $crate::advisor::AdvisorRegistration::new($name, $creator)
        }
    };
}

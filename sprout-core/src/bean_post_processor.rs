//! BeanPostProcessor - Bean 工厂扩展机制
//!
//! 每个 Bean 完成属性注入和 init 方法之后，按注册顺序依次交给所有后置处理器，
//! 处理器可以返回原始 Bean，也可以返回替换后的对象（例如 AOP 代理）。

use std::fmt;

use crate::bean::Instance;
use crate::error::ContainerResult;

/// BeanPostProcessor trait
///
/// # 示例
///
/// ```ignore
/// struct LoggingPostProcessor;
///
/// impl BeanPostProcessor for LoggingPostProcessor {
///     fn post_process_after_initialization(
///         &self,
///         bean: Instance,
///         bean_name: &str,
///     ) -> ContainerResult<Instance> {
///         tracing::info!("After initialization: {}", bean_name);
///         Ok(bean)
///     }
/// }
/// ```
pub trait BeanPostProcessor: Send + Sync {
    /// 在 Bean 初始化回调（init）之后调用
    ///
    /// 返回处理后的 Bean 实例（可以是原始 Bean，也可以是包装后的 Bean）
    fn post_process_after_initialization(&self, bean: Instance, bean_name: &str) -> ContainerResult<Instance>;

    /// 获取处理器的名称（用于日志和调试）
    fn name(&self) -> &str {
        "BeanPostProcessor"
    }
}

/// 用闭包实现的后置处理器
pub struct FnPostProcessor<F> {
    name: String,
    process: F,
}

impl<F> FnPostProcessor<F>
where
    F: Fn(Instance, &str) -> ContainerResult<Instance> + Send + Sync,
{
    pub fn new(name: impl Into<String>, process: F) -> Self {
        Self {
            name: name.into(),
            process,
        }
    }
}

impl<F> BeanPostProcessor for FnPostProcessor<F>
where
    F: Fn(Instance, &str) -> ContainerResult<Instance> + Send + Sync,
{
    fn post_process_after_initialization(&self, bean: Instance, bean_name: &str) -> ContainerResult<Instance> {
        (self.process)(bean, bean_name)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnPostProcessor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnPostProcessor({})", self.name)
    }
}

//! Sprout AOP - 面向切面编程支持
//!
//! 在 sprout-core 的代理接缝之上提供：
//! - 切点表达式（通配符、正则、execution、与或非、自定义）
//! - 五种通知（Before、After、Around、AfterReturning、AfterThrowing）
//! - 通知器：切点 + 通知，通知可以是延迟解析的 Bean
//! - 通过 BeanPostProcessor 自动为匹配的 Bean 创建代理

pub mod advice;
pub mod advisor;
pub mod bean_post_processor;
pub mod error_info;
pub mod joinpoint;
pub mod pointcut;
pub mod proxy;

// 重新导出核心类型
pub use advice::{
    Advice, AdviceType, AfterAdvice, AfterReturningAdvice, AfterThrowingAdvice, AroundAdvice, BeforeAdvice,
    MethodInterceptor,
};
pub use advisor::{registered_advisors, AdviceSource, Advisor, AdvisorRegistration, PointcutAdvisor};
pub use bean_post_processor::AdvisorAutoProxyCreator;
pub use error_info::ErrorInfo;
pub use joinpoint::{JoinPoint, ProceedingJoinPoint};
pub use pointcut::{Pointcut, PointcutExpression};
pub use proxy::{AdvisedInvocationHandler, AopProxyFactory, DefaultAopProxyFactory};

// 导出 inventory 供宏使用
pub use inventory;

/// 预导入模块
pub mod prelude {
    pub use crate::advice::*;
    pub use crate::advisor::{Advisor, PointcutAdvisor};
    pub use crate::bean_post_processor::AdvisorAutoProxyCreator;
    pub use crate::error_info::ErrorInfo;
    pub use crate::joinpoint::{JoinPoint, ProceedingJoinPoint};
    pub use crate::pointcut::{Pointcut, PointcutExpression};
    pub use crate::proxy::{AopProxyFactory, DefaultAopProxyFactory};
    pub use crate::register_advisor;
}

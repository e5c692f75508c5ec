//! 通知（Advice）定义
//!
//! 定义了在连接点执行的各种动作。每种通知都会被转换为一个
//! [`MethodInterceptor`]，按顺序组成拦截器链。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use sprout_core::{ContainerError, ContainerResult, RawInstance};

use crate::{ErrorInfo, JoinPoint, ProceedingJoinPoint};

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceType {
    /// 前置通知
    Before,
    /// 后置通知（无论成功还是失败都执行）
    After,
    /// 返回后通知（成功返回时执行）
    AfterReturning,
    /// 异常通知（出错时执行）
    AfterThrowing,
    /// 环绕通知（可以控制方法执行）
    Around,
}

/// 前置通知
///
/// 在目标方法执行前调用，返回错误时目标方法不会执行
pub trait BeforeAdvice: Send + Sync {
    fn before(&self, join_point: &JoinPoint) -> anyhow::Result<()>;
}

/// 后置通知
///
/// 在目标方法执行后调用（无论成功还是失败）
pub trait AfterAdvice: Send + Sync {
    fn after(&self, join_point: &JoinPoint) -> anyhow::Result<()>;
}

/// 返回后通知
pub trait AfterReturningAdvice: Send + Sync {
    fn after_returning(&self, join_point: &JoinPoint, result: &(dyn Any + Send + Sync)) -> anyhow::Result<()>;
}

/// 异常通知
///
/// 只观察错误，原始错误总是继续向上传播
pub trait AfterThrowingAdvice: Send + Sync {
    fn after_throwing(&self, join_point: &JoinPoint, error: &ErrorInfo);
}

/// 环绕通知
///
/// 可以完全控制目标方法的执行
pub trait AroundAdvice: Send + Sync {
    fn around(&self, pjp: ProceedingJoinPoint<'_>) -> anyhow::Result<RawInstance>;
}

/// 方法拦截器 - 拦截器链上的一个环节
pub trait MethodInterceptor: Send + Sync {
    fn invoke(&self, pjp: ProceedingJoinPoint<'_>) -> ContainerResult<RawInstance>;
}

/// 通知
#[derive(Clone)]
pub enum Advice {
    Before(Arc<dyn BeforeAdvice>),
    After(Arc<dyn AfterAdvice>),
    AfterReturning(Arc<dyn AfterReturningAdvice>),
    AfterThrowing(Arc<dyn AfterThrowingAdvice>),
    Around(Arc<dyn AroundAdvice>),
}

struct FnBefore<F>(F);
struct FnAfter<F>(F);
struct FnAfterReturning<F>(F);
struct FnAfterThrowing<F>(F);
struct FnAround<F>(F);

impl<F> BeforeAdvice for FnBefore<F>
where
    F: Fn(&JoinPoint) -> anyhow::Result<()> + Send + Sync,
{
    fn before(&self, join_point: &JoinPoint) -> anyhow::Result<()> {
        (self.0)(join_point)
    }
}

impl<F> AfterAdvice for FnAfter<F>
where
    F: Fn(&JoinPoint) -> anyhow::Result<()> + Send + Sync,
{
    fn after(&self, join_point: &JoinPoint) -> anyhow::Result<()> {
        (self.0)(join_point)
    }
}

impl<F> AfterReturningAdvice for FnAfterReturning<F>
where
    F: Fn(&JoinPoint, &(dyn Any + Send + Sync)) -> anyhow::Result<()> + Send + Sync,
{
    fn after_returning(&self, join_point: &JoinPoint, result: &(dyn Any + Send + Sync)) -> anyhow::Result<()> {
        (self.0)(join_point, result)
    }
}

impl<F> AfterThrowingAdvice for FnAfterThrowing<F>
where
    F: Fn(&JoinPoint, &ErrorInfo) + Send + Sync,
{
    fn after_throwing(&self, join_point: &JoinPoint, error: &ErrorInfo) {
        (self.0)(join_point, error)
    }
}

impl<F> AroundAdvice for FnAround<F>
where
    F: for<'a> Fn(ProceedingJoinPoint<'a>) -> anyhow::Result<RawInstance> + Send + Sync,
{
    fn around(&self, pjp: ProceedingJoinPoint<'_>) -> anyhow::Result<RawInstance> {
        (self.0)(pjp)
    }
}

impl Advice {
    pub fn before<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Advice::Before(Arc::new(FnBefore(f)))
    }

    pub fn after<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Advice::After(Arc::new(FnAfter(f)))
    }

    pub fn after_returning<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint, &(dyn Any + Send + Sync)) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Advice::AfterReturning(Arc::new(FnAfterReturning(f)))
    }

    pub fn after_throwing<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint, &ErrorInfo) + Send + Sync + 'static,
    {
        Advice::AfterThrowing(Arc::new(FnAfterThrowing(f)))
    }

    pub fn around<F>(f: F) -> Self
    where
        F: for<'a> Fn(ProceedingJoinPoint<'a>) -> anyhow::Result<RawInstance> + Send + Sync + 'static,
    {
        Advice::Around(Arc::new(FnAround(f)))
    }

    /// 获取通知类型
    pub fn advice_type(&self) -> AdviceType {
        match self {
            Advice::Before(_) => AdviceType::Before,
            Advice::After(_) => AdviceType::After,
            Advice::AfterReturning(_) => AdviceType::AfterReturning,
            Advice::AfterThrowing(_) => AdviceType::AfterThrowing,
            Advice::Around(_) => AdviceType::Around,
        }
    }

    /// 转换为拦截器
    pub fn into_interceptor(self) -> Arc<dyn MethodInterceptor> {
        Arc::new(self)
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Advice::{:?}", self.advice_type())
    }
}

/// 通知返回的错误：容器错误原样传播，其他错误包装为 `InvocationFailed`
fn advice_error(join_point: &JoinPoint, err: anyhow::Error) -> ContainerError {
    match err.downcast::<ContainerError>() {
        Ok(err) => err,
        Err(err) => ContainerError::InvocationFailed {
            target: sprout_core::utils::naming::simple_type_name(join_point.target_type).to_string(),
            method: join_point.method_name.to_string(),
            message: format!("{:#}", err),
        },
    }
}

impl MethodInterceptor for Advice {
    fn invoke(&self, pjp: ProceedingJoinPoint<'_>) -> ContainerResult<RawInstance> {
        let join_point = pjp.join_point().clone();

        match self {
            Advice::Before(advice) => {
                advice.before(&join_point).map_err(|e| advice_error(&join_point, e))?;
                pjp.proceed()
            }
            Advice::After(advice) => {
                let result = pjp.proceed();
                let after = advice.after(&join_point);
                let value = result?;
                after.map_err(|e| advice_error(&join_point, e))?;
                Ok(value)
            }
            Advice::AfterReturning(advice) => {
                let value = pjp.proceed()?;
                advice
                    .after_returning(&join_point, value.as_ref())
                    .map_err(|e| advice_error(&join_point, e))?;
                Ok(value)
            }
            Advice::AfterThrowing(advice) => pjp.proceed().map_err(|err| {
                advice.after_throwing(&join_point, &ErrorInfo::new(&join_point, &err));
                err
            }),
            Advice::Around(advice) => advice.around(pjp).map_err(|e| advice_error(&join_point, e)),
        }
    }
}

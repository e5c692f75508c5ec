//! 连接点（JoinPoint）定义
//!
//! 连接点表示一次经过代理的方法调用。[`ProceedingJoinPoint`] 是拦截器链上的
//! 一个位置：调用 `proceed` 交给下一个拦截器，链的末尾调用目标方法。

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sprout_core::proxy::invoke_direct;
use sprout_core::utils::naming::simple_type_name;
use sprout_core::{ContainerResult, Instance, MethodMeta, RawInstance};

use crate::advice::MethodInterceptor;

/// 连接点信息
///
/// 包含方法调用时的上下文信息
#[derive(Clone)]
pub struct JoinPoint {
    /// 目标类型名称（完整路径）
    pub target_type: &'static str,

    /// 方法名称
    pub method_name: &'static str,

    /// 方法参数
    pub args: Vec<Instance>,

    /// 调用时间戳
    pub timestamp: Instant,
}

impl JoinPoint {
    /// 创建新的连接点
    pub fn new(target_type: &'static str, method_name: &'static str, args: Vec<Instance>) -> Self {
        Self {
            target_type,
            method_name,
            args,
            timestamp: Instant::now(),
        }
    }

    /// 获取方法签名，例如 `UserService::find`
    pub fn signature(&self) -> String {
        format!("{}::{}", simple_type_name(self.target_type), self.method_name)
    }

    /// 获取第 `index` 个参数
    pub fn arg<T: Any + Send + Sync>(&self, index: usize) -> Option<&T> {
        self.args.get(index)?.downcast_ref::<T>()
    }

    /// 从调用开始到现在经过的时间
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

impl fmt::Debug for JoinPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinPoint")
            .field("target_type", &self.target_type)
            .field("method_name", &self.method_name)
            .field("args", &self.args.len())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

impl fmt::Display for JoinPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

/// 拦截器链上的一次调用
///
/// `proceed` 消耗自身，因此每个拦截器最多向下传递一次
pub struct ProceedingJoinPoint<'a> {
    /// 连接点信息
    pub join_point: JoinPoint,

    target: &'a Instance,
    method: &'a MethodMeta,
    chain: &'a [Arc<dyn MethodInterceptor>],
}

impl<'a> ProceedingJoinPoint<'a> {
    /// 创建链的起点
    pub fn new(
        join_point: JoinPoint,
        target: &'a Instance,
        method: &'a MethodMeta,
        chain: &'a [Arc<dyn MethodInterceptor>],
    ) -> Self {
        Self {
            join_point,
            target,
            method,
            chain,
        }
    }

    /// 获取连接点信息
    pub fn join_point(&self) -> &JoinPoint {
        &self.join_point
    }

    /// 被调用的方法
    pub fn method(&self) -> &MethodMeta {
        self.method
    }

    /// 被代理的原始对象
    pub fn target(&self) -> &Instance {
        self.target
    }

    /// 继续执行：交给下一个拦截器，没有拦截器时调用目标方法
    pub fn proceed(self) -> ContainerResult<RawInstance> {
        match self.chain.split_first() {
            Some((interceptor, rest)) => interceptor.invoke(ProceedingJoinPoint {
                join_point: self.join_point,
                target: self.target,
                method: self.method,
                chain: rest,
            }),
            None => invoke_direct(self.target, self.method, &self.join_point.args),
        }
    }

    /// 替换参数后继续执行
    pub fn proceed_with(mut self, args: Vec<Instance>) -> ContainerResult<RawInstance> {
        self.join_point.args = args;
        self.proceed()
    }
}

impl fmt::Debug for ProceedingJoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProceedingJoinPoint")
            .field("join_point", &self.join_point)
            .field("remaining", &self.chain.len())
            .finish()
    }
}

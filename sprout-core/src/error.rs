//! 容器错误类型
//!
//! 所有错误在 Bean 构建时都是不可恢复的：容器不会重试，也不会替换默认值，
//! 错误会一直传播到 `get_bean` / `initialize` 的调用方。
//! 用户回调（构造函数、方法、生命周期钩子、通知）统一返回 `anyhow::Result`。

use thiserror::Error;

/// 容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Bean 定义校验失败（缺少返回类型、构建方式冲突）
    #[error("Invalid bean definition '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },

    /// Bean 名称重复注册
    #[error("Bean definition '{0}' is already registered")]
    DuplicateRegistration(String),

    /// 找不到 Bean
    #[error("No bean named '{0}' is defined")]
    UnknownBean(String),

    /// 接口有多个实现或没有实现，且调用方没有指定 Bean 名称
    #[error("No unique bean for type '{type_name}': found {} candidate(s) {candidates:?}", .candidates.len())]
    AmbiguousType {
        type_name: String,
        candidates: Vec<String>,
    },

    /// 构造函数数量或参数不匹配
    #[error("No matching constructor on '{class}': {reason}")]
    NoMatchingConstructor { class: String, reason: String },

    /// 工厂方法名称或参数不匹配
    #[error("No matching factory method '{method}' with {arity} argument(s) on '{owner}'")]
    NoMatchingFactoryMethod {
        owner: String,
        method: String,
        arity: usize,
    },

    /// 初始化方法不存在或执行失败
    #[error("Init method '{method}' of bean '{bean}' failed: {message}")]
    InitInvocationError {
        bean: String,
        method: String,
        message: String,
    },

    /// 类型声明了多个构造函数
    #[error("Type '{class}' declares {count} constructors, only one is supported")]
    MultipleConstructorsUnsupported { class: String, count: usize },

    /// 循环依赖
    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    /// 类型不匹配
    #[error("Type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },

    /// 属性注入失败
    #[error("Failed to inject property '{field}' of bean '{bean}': {message}")]
    PropertyInjection {
        bean: String,
        field: String,
        message: String,
    },

    /// 类型上不存在指定方法
    #[error("No method '{method}' with {arity} argument(s) on '{class}'")]
    NoSuchMethod {
        class: String,
        method: String,
        arity: usize,
    },

    /// 方法调用失败
    #[error("Invocation of '{target}::{method}' failed: {message}")]
    InvocationFailed {
        target: String,
        method: String,
        message: String,
    },

    /// Bean 构建失败（构造函数或工厂方法返回错误）
    #[error("Failed to create bean '{bean}': {message}")]
    BeanCreationFailed { bean: String, message: String },

    /// 上下文之前的初始化已失败，注册表可能只完成了一部分
    #[error("Application context failed to initialize: {0}")]
    ContextInitFailed(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 日志系统初始化失败
    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 容器操作结果
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

//! 错误信息结构
//!
//! 提供结构化的错误信息传递给 after-throwing 通知

use std::error::Error;

use sprout_core::ContainerError;

use crate::JoinPoint;

/// 结构化的错误信息
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// 出错的方法签名
    pub signature: String,

    /// 错误消息
    pub message: String,

    /// 错误类别，例如 `InvocationFailed`
    pub kind: &'static str,

    /// 错误源链（cause chain）
    pub source_chain: Vec<String>,
}

impl ErrorInfo {
    /// 从容器错误创建
    pub fn new(join_point: &JoinPoint, error: &ContainerError) -> Self {
        let mut source_chain = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            source_chain.push(source.to_string());
            current = source.source();
        }

        Self {
            signature: join_point.signature(),
            message: error.to_string(),
            kind: error_kind(error),
            source_chain,
        }
    }

    /// 获取完整的错误描述（包含源链）
    pub fn full_description(&self) -> String {
        if self.source_chain.is_empty() {
            format!("{}: {}", self.signature, self.message)
        } else {
            format!(
                "{}: {}\nCaused by:\n  {}",
                self.signature,
                self.message,
                self.source_chain.join("\n  ")
            )
        }
    }
}

fn error_kind(error: &ContainerError) -> &'static str {
    match error {
        ContainerError::InvalidDefinition { .. } => "InvalidDefinition",
        ContainerError::DuplicateRegistration(_) => "DuplicateRegistration",
        ContainerError::UnknownBean(_) => "UnknownBean",
        ContainerError::AmbiguousType { .. } => "AmbiguousType",
        ContainerError::NoMatchingConstructor { .. } => "NoMatchingConstructor",
        ContainerError::NoMatchingFactoryMethod { .. } => "NoMatchingFactoryMethod",
        ContainerError::InitInvocationError { .. } => "InitInvocationError",
        ContainerError::MultipleConstructorsUnsupported { .. } => "MultipleConstructorsUnsupported",
        ContainerError::CircularDependency(_) => "CircularDependency",
        ContainerError::TypeMismatch { .. } => "TypeMismatch",
        ContainerError::PropertyInjection { .. } => "PropertyInjection",
        ContainerError::NoSuchMethod { .. } => "NoSuchMethod",
        ContainerError::InvocationFailed { .. } => "InvocationFailed",
        ContainerError::BeanCreationFailed { .. } => "BeanCreationFailed",
        ContainerError::ContextInitFailed(_) => "ContextInitFailed",
        ContainerError::Config(_) => "Config",
        ContainerError::LoggingInitFailed(_) => "LoggingInitFailed",
        ContainerError::Other(_) => "Other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_from_invocation_failure() {
        let jp = JoinPoint::new("app::OrderService", "place", vec![]);
        let error = ContainerError::InvocationFailed {
            target: "OrderService".to_string(),
            method: "place".to_string(),
            message: "out of stock".to_string(),
        };

        let info = ErrorInfo::new(&jp, &error);
        assert_eq!(info.kind, "InvocationFailed");
        assert_eq!(info.signature, "OrderService::place");
        assert!(info.message.contains("out of stock"));
        assert!(info.source_chain.is_empty());
        assert!(info.full_description().starts_with("OrderService::place: "));
    }

    #[test]
    fn test_error_info_keeps_source_chain() {
        let jp = JoinPoint::new("app::OrderService", "place", vec![]);
        let inner = anyhow::anyhow!("disk full").context("write failed");
        let error = ContainerError::Other(inner);

        let info = ErrorInfo::new(&jp, &error);
        assert_eq!(info.kind, "Other");
        assert!(info.full_description().contains("Caused by"));
    }
}

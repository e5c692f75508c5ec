//! 配置键常量
//!
//! 容器读取的配置键集中定义在这里，避免在各模块中硬编码

/// 组件扫描的包（模块路径）列表
pub const SCAN_PACKAGES_KEY: &str = "context.scan-packages";

/// 日志配置段前缀
pub const LOGGING_CONFIG_PREFIX: &str = "logging";

/// 默认的环境变量前缀，例如 `SPROUT_CONTEXT_SCAN_PACKAGES`
pub const ENV_PREFIX: &str = "SPROUT_";

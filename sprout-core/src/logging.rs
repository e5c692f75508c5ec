//! 日志初始化
//!
//! 容器本身只通过 `tracing` 宏输出日志；这里根据 `logging.*` 配置安装一个
//! `tracing-subscriber`，由 [`ApplicationContextBuilder::with_logging`](crate::ApplicationContextBuilder::with_logging) 触发。

use serde::Deserialize;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::Environment;
use crate::constants::LOGGING_CONFIG_PREFIX;
use crate::error::{ContainerError, ContainerResult};

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    /// 带时间、级别、目标的完整格式
    Full,
    Json,
    /// 多行格式，适合开发
    Pretty,
}

/// `[logging]` 配置段
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LoggingProperties {
    level: Option<String>,
    format: Option<LogFormat>,
    filter: Option<String>,
    show_timestamp: Option<bool>,
    show_target: Option<bool>,
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    pub show_timestamp: bool,
    /// 是否输出模块路径
    pub show_target: bool,
    /// `EnvFilter` 指令，例如 `"sprout_core=debug,sprout_aop=trace"`，优先于 `level`
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            show_timestamp: true,
            show_target: false,
            filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn show_timestamp(mut self, show: bool) -> Self {
        self.show_timestamp = show;
        self
    }

    pub fn show_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// 从 `logging.*` 配置读取，没有配置的项保持默认值
    pub fn from_environment(environment: &Environment) -> ContainerResult<Self> {
        let props: LoggingProperties = environment.bind(LOGGING_CONFIG_PREFIX)?;
        let defaults = Self::default();

        let level = match props.level {
            Some(level) => level
                .trim()
                .parse::<Level>()
                .map_err(|_| ContainerError::Config(format!("Invalid log level: {}", level)))?,
            None => defaults.level,
        };

        Ok(Self {
            level,
            format: props.format.unwrap_or(defaults.format),
            show_timestamp: props.show_timestamp.unwrap_or(defaults.show_timestamp),
            show_target: props.show_target.unwrap_or(defaults.show_target),
            filter: props.filter,
        })
    }

    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.as_str());
        match &self.filter {
            Some(filter) => EnvFilter::try_new(filter).unwrap_or_else(|_| fallback()),
            // 没有显式过滤器时 RUST_LOG 优先
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::layer().with_target(self.show_target);

        macro_rules! boxed {
            ($layer:expr, $with_time:expr) => {
                if $with_time {
                    $layer.boxed()
                } else {
                    $layer.without_time().boxed()
                }
            };
        }

        let with_time = self.show_timestamp;
        match self.format {
            LogFormat::Compact => boxed!(base.compact(), with_time),
            LogFormat::Full => boxed!(base, with_time),
            LogFormat::Json => boxed!(base.json(), with_time),
            LogFormat::Pretty => boxed!(base.pretty(), with_time),
        }
    }

    /// 安装全局 subscriber，已经安装过时返回 `LoggingInitFailed`
    pub fn init(self) -> ContainerResult<()> {
        tracing_subscriber::registry()
            .with(self.fmt_layer())
            .with(self.env_filter())
            .try_init()
            .map_err(|e| ContainerError::LoggingInitFailed(e.to_string()))
    }
}

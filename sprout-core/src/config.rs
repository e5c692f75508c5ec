//! 配置
//!
//! 配置值直接使用 `toml::Value`。多个配置源按优先级叠加，键是点号分隔的路径，
//! 例如 `context.scan-packages`。

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;

use crate::context::ConfigSource;
use crate::error::{ContainerError, ContainerResult};

/// 配置值
pub type ConfigValue = toml::Value;

/// 配置源
pub trait PropertySource: Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// 该配置源提供的所有键
    fn keys(&self) -> Vec<String>;

    /// 数字越大优先级越高
    fn priority(&self) -> i32 {
        0
    }
}

/// 配置管理器，先命中的高优先级配置源生效
#[derive(Default)]
pub struct Environment {
    /// 按优先级降序
    sources: RwLock<Vec<Box<dyn PropertySource>>>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.sources.read().iter().map(|s| s.name().to_string()).collect();
        f.debug_struct("Environment").field("sources", &names).finish()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_property_source(&self, source: Box<dyn PropertySource>) {
        tracing::debug!("Adding property source '{}' (priority {})", source.name(), source.priority());
        let mut sources = self.sources.write();
        sources.push(source);
        // 稳定排序，同优先级保持添加顺序
        sources.sort_by_key(|s| std::cmp::Reverse(s.priority()));
    }

    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        let found = self
            .sources
            .read()
            .iter()
            .find_map(|source| source.get(key).map(|value| (source.name().to_string(), value)));
        match found {
            Some((source, value)) => {
                tracing::trace!("Config '{}' resolved from '{}'", key, source);
                Some(value)
            }
            None => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(String::from))
    }

    /// 字符串列表，接受 TOML 数组或逗号分隔的字符串
    pub fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        match self.get(key)? {
            ConfigValue::Array(items) => Some(items.iter().filter_map(|v| v.as_str().map(String::from)).collect()),
            ConfigValue::String(s) => Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            _ => None,
        }
    }

    /// 把 `prefix.` 下的所有配置反序列化为结构体
    ///
    /// ```ignore
    /// #[derive(Deserialize)]
    /// struct LoggingProperties { level: Option<String> }
    ///
    /// let props: LoggingProperties = env.bind("logging")?;
    /// ```
    pub fn bind<T: DeserializeOwned>(&self, prefix: &str) -> ContainerResult<T> {
        let key_prefix = format!("{}.", prefix);
        let mut root = toml::value::Table::new();

        // 低优先级先写入，高优先级覆盖
        for source in self.sources.read().iter().rev() {
            for key in source.keys() {
                let Some(path) = key.strip_prefix(&key_prefix) else {
                    continue;
                };
                if let Some(value) = source.get(&key) {
                    insert_path(&mut root, path, value);
                }
            }
        }

        ConfigValue::Table(root)
            .try_into()
            .map_err(|e| ContainerError::Config(format!("Failed to bind '{}': {}", prefix, e)))
    }
}

fn insert_path(table: &mut toml::value::Table, path: &str, value: ConfigValue) {
    let Some((head, rest)) = path.split_once('.') else {
        table.insert(path.to_string(), value);
        return;
    };
    let child = table
        .entry(head.to_string())
        .or_insert_with(|| ConfigValue::Table(toml::value::Table::new()));
    if !child.is_table() {
        *child = ConfigValue::Table(toml::value::Table::new());
    }
    if let ConfigValue::Table(child) = child {
        insert_path(child, rest, value);
    }
}

impl ConfigSource for Environment {
    fn get_config_array(&self, key: &str) -> Vec<String> {
        self.get_string_list(key).unwrap_or_default()
    }
}

/// 环境变量配置源
///
/// `context.scan-packages` 对应 `SPROUT_CONTEXT_SCAN_PACKAGES`，值总是字符串
pub struct EnvironmentPropertySource {
    prefix: String,
}

impl EnvironmentPropertySource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    fn variable_for(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.replace(['.', '-'], "_").to_uppercase())
    }
}

impl PropertySource for EnvironmentPropertySource {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        std::env::var(self.variable_for(key)).ok().map(ConfigValue::String)
    }

    /// 变量名无法区分 `.` 和 `-`，这里统一还原为 `.`
    fn keys(&self) -> Vec<String> {
        std::env::vars()
            .filter_map(|(name, _)| {
                name.strip_prefix(&self.prefix)
                    .map(|rest| rest.to_lowercase().replace('_', "."))
            })
            .collect()
    }

    fn priority(&self) -> i32 {
        100
    }
}

/// 键值表配置源，可以直接构造，也可以从 TOML 文档展平得到
pub struct MapPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
            priority: 50,
        }
    }

    /// 解析 TOML 文档，嵌套表展平为点号路径，优先级为 0
    pub fn from_toml(content: &str, name: impl Into<String>) -> ContainerResult<Self> {
        let document: toml::value::Table = toml::from_str(content)
            .map_err(|e| ContainerError::Config(format!("Failed to parse TOML: {}", e)))?;

        let mut properties = HashMap::new();
        for (key, value) in document {
            flatten(key, value, &mut properties);
        }

        Ok(Self {
            name: name.into(),
            properties,
            priority: 0,
        })
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ContainerError::Config(format!("Failed to read config file {:?}: {}", path, e)))?;
        Self::from_toml(&content, path.to_string_lossy())
    }

    pub fn with_property(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

fn flatten(path: String, value: ConfigValue, out: &mut HashMap<String, ConfigValue>) {
    match value {
        ConfigValue::Table(table) => {
            for (key, child) in table {
                flatten(format!("{}.{}", path, key), child, out);
            }
        }
        leaf => {
            out.insert(path, leaf);
        }
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    const SAMPLE: &str = r#"
[context]
scan-packages = ["app::service", "app::repository"]

[logging]
level = "debug"
format = "json"
"#;

    fn sample() -> Box<MapPropertySource> {
        Box::new(MapPropertySource::from_toml(SAMPLE, "application.toml").unwrap())
    }

    #[test]
    fn test_toml_is_flattened() {
        let source = sample();
        assert_eq!(source.get("logging.level"), Some(ConfigValue::String("debug".to_string())));
        assert!(matches!(source.get("context.scan-packages"), Some(ConfigValue::Array(ref a)) if a.len() == 2));
        assert!(source.get("logging").is_none());
        assert_eq!(source.priority(), 0);
    }

    #[test]
    fn test_invalid_toml() {
        let err = MapPropertySource::from_toml("not = [valid", "broken").err().unwrap();
        assert!(matches!(err, ContainerError::Config(_)));
    }

    #[test]
    fn test_higher_priority_wins() {
        let env = Environment::new();
        env.add_property_source(sample());
        env.add_property_source(Box::new(
            MapPropertySource::new("overrides").with_property("logging.level", ConfigValue::String("warn".to_string())),
        ));

        assert_eq!(env.get_string("logging.level").as_deref(), Some("warn"));
        assert_eq!(env.get_string("logging.format").as_deref(), Some("json"));
        assert!(env.get("logging.filter").is_none());
    }

    #[test]
    fn test_config_array_formats() {
        let env = Environment::new();
        env.add_property_source(sample());
        env.add_property_source(Box::new(
            MapPropertySource::new("map").with_property("extra.packages", ConfigValue::String("a, b ,,c".to_string())),
        ));

        assert_eq!(
            env.get_config_array("context.scan-packages"),
            vec!["app::service", "app::repository"]
        );
        assert_eq!(env.get_config_array("extra.packages"), vec!["a", "b", "c"]);
        assert!(env.get_config_array("missing").is_empty());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct LoggingSection {
        level: String,
        format: Option<String>,
        filter: Option<String>,
    }

    #[test]
    fn test_bind_merges_sources() {
        let env = Environment::new();
        env.add_property_source(sample());
        env.add_property_source(Box::new(
            MapPropertySource::new("map").with_property("logging.level", ConfigValue::String("trace".to_string())),
        ));

        let section: LoggingSection = env.bind("logging").unwrap();
        assert_eq!(
            section,
            LoggingSection {
                level: "trace".to_string(),
                format: Some("json".to_string()),
                filter: None,
            }
        );
    }

    #[test]
    fn test_environment_variable_names() {
        let source = EnvironmentPropertySource::new("SPROUT_");
        assert_eq!(source.variable_for("context.scan-packages"), "SPROUT_CONTEXT_SCAN_PACKAGES");
        assert_eq!(source.priority(), 100);
    }
}

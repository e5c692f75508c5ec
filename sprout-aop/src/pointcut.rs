//! 切点（Pointcut）表达式系统
//!
//! 定义了如何匹配连接点的规则。匹配分两步：先用 `matches_class` 快速过滤类型，
//! 再用 `matches_method` 精确判断某个方法。

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use sprout_core::{BeanClass, MethodMeta};

/// 切点 Trait
pub trait Pointcut: Send + Sync {
    /// 类型级别的预筛选，返回 false 时不再检查该类型的方法
    fn matches_class(&self, class: &BeanClass) -> bool;

    /// 检查具体方法是否匹配
    fn matches_method(&self, class: &BeanClass, method: &MethodMeta) -> bool;
}

/// 切点表达式
///
/// 类型模式同时匹配类型的简单名称和完整路径
#[derive(Clone)]
pub enum PointcutExpression {
    /// 匹配所有方法
    All,

    /// 匹配特定类型的所有方法
    /// 例如：TypePattern("UserService")
    TypePattern(String),

    /// 匹配特定方法名
    /// 例如：MethodPattern("get_user")
    MethodPattern(String),

    /// 匹配特定类型的特定方法
    /// 例如：execution(* UserService.get_user(..))
    Execution {
        type_pattern: String,
        method_pattern: String,
    },

    /// 使用正则表达式匹配类型
    TypeRegex(Regex),

    /// 使用正则表达式匹配方法
    MethodRegex(Regex),

    /// 自定义匹配函数
    Custom(Arc<dyn Fn(&BeanClass, &MethodMeta) -> bool + Send + Sync>),

    /// 与运算（AND）
    And(Box<PointcutExpression>, Box<PointcutExpression>),

    /// 或运算（OR）
    Or(Box<PointcutExpression>, Box<PointcutExpression>),

    /// 非运算（NOT）
    Not(Box<PointcutExpression>),
}

impl PointcutExpression {
    /// 简单的模式匹配（支持 * 通配符）
    ///
    /// 支持的模式：
    /// - `*` - 匹配任意字符串
    /// - `User*` - 以 User 开头
    /// - `*Service` - 以 Service 结尾
    /// - `*Service*` - 包含 Service
    fn pattern_matches(pattern: &str, target: &str) -> bool {
        if pattern == "*" {
            return true;
        }

        if !pattern.contains('*') {
            return pattern == target;
        }

        let parts: Vec<String> = pattern.split('*').map(regex::escape).collect();
        let regex_pattern = format!("^{}$", parts.join(".*"));

        Regex::new(&regex_pattern).is_ok_and(|regex| regex.is_match(target))
    }

    fn type_matches(pattern: &str, class: &BeanClass) -> bool {
        Self::pattern_matches(pattern, class.simple_name()) || Self::pattern_matches(pattern, class.name())
    }

    /// 表达式是否只依赖类型（不看方法）
    fn is_type_only(&self) -> bool {
        match self {
            PointcutExpression::All
            | PointcutExpression::TypePattern(_)
            | PointcutExpression::TypeRegex(_) => true,
            PointcutExpression::And(l, r) | PointcutExpression::Or(l, r) => l.is_type_only() && r.is_type_only(),
            PointcutExpression::Not(e) => e.is_type_only(),
            _ => false,
        }
    }

    /// 创建 execution 表达式
    ///
    /// 例如：`execution(* UserService.get_user(..))` 或 `* UserService.get_user(..)`
    /// 格式：返回类型 类型名.方法名(参数)
    ///
    /// 只支持类型和方法名匹配，返回类型和参数部分被忽略。
    /// 类型部分的 `.` 按路径分隔符 `::` 处理，`app.service.*Service` 等同于 `app::service::*Service`
    pub fn execution(expression: &str) -> Self {
        let expression = expression.trim();
        let expression = expression
            .strip_prefix("execution(")
            .and_then(|e| e.strip_suffix(')'))
            .unwrap_or(expression);

        let parts: Vec<&str> = expression.split_whitespace().collect();
        let Some(method_part) = parts.get(1).or(parts.first()) else {
            return PointcutExpression::All;
        };
        let method_part = method_part.split('(').next().unwrap_or(method_part);

        match method_part.rsplit_once('.') {
            Some((type_pattern, method_pattern)) => PointcutExpression::Execution {
                type_pattern: type_pattern.replace('.', "::"),
                method_pattern: method_pattern.to_string(),
            },
            None => PointcutExpression::MethodPattern(method_part.to_string()),
        }
    }

    pub fn type_pattern(pattern: impl Into<String>) -> Self {
        PointcutExpression::TypePattern(pattern.into())
    }

    pub fn method_pattern(pattern: impl Into<String>) -> Self {
        PointcutExpression::MethodPattern(pattern.into())
    }

    pub fn type_regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(PointcutExpression::TypeRegex(Regex::new(pattern)?))
    }

    pub fn method_regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(PointcutExpression::MethodRegex(Regex::new(pattern)?))
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&BeanClass, &MethodMeta) -> bool + Send + Sync + 'static,
    {
        PointcutExpression::Custom(Arc::new(f))
    }

    /// 与运算
    pub fn and(self, other: PointcutExpression) -> Self {
        PointcutExpression::And(Box::new(self), Box::new(other))
    }

    /// 或运算
    pub fn or(self, other: PointcutExpression) -> Self {
        PointcutExpression::Or(Box::new(self), Box::new(other))
    }

    /// 非运算
    pub fn not(self) -> Self {
        PointcutExpression::Not(Box::new(self))
    }
}

impl Pointcut for PointcutExpression {
    fn matches_class(&self, class: &BeanClass) -> bool {
        match self {
            PointcutExpression::All => true,
            PointcutExpression::TypePattern(pattern) => Self::type_matches(pattern, class),
            PointcutExpression::Execution { type_pattern, .. } => Self::type_matches(type_pattern, class),
            PointcutExpression::TypeRegex(regex) => regex.is_match(class.name()),
            PointcutExpression::MethodPattern(_)
            | PointcutExpression::MethodRegex(_)
            | PointcutExpression::Custom(_) => true,
            PointcutExpression::And(left, right) => left.matches_class(class) && right.matches_class(class),
            PointcutExpression::Or(left, right) => left.matches_class(class) || right.matches_class(class),
            // 取反只有在内部表达式完全由类型决定时才能在类型级别判断
            PointcutExpression::Not(expr) => !expr.is_type_only() || !expr.matches_class(class),
        }
    }

    fn matches_method(&self, class: &BeanClass, method: &MethodMeta) -> bool {
        match self {
            PointcutExpression::All => true,
            PointcutExpression::TypePattern(pattern) => Self::type_matches(pattern, class),
            PointcutExpression::MethodPattern(pattern) => Self::pattern_matches(pattern, method.name()),
            PointcutExpression::Execution {
                type_pattern,
                method_pattern,
            } => Self::type_matches(type_pattern, class) && Self::pattern_matches(method_pattern, method.name()),
            PointcutExpression::TypeRegex(regex) => regex.is_match(class.name()),
            PointcutExpression::MethodRegex(regex) => regex.is_match(method.name()),
            PointcutExpression::Custom(func) => func(class, method),
            PointcutExpression::And(left, right) => {
                left.matches_method(class, method) && right.matches_method(class, method)
            }
            PointcutExpression::Or(left, right) => {
                left.matches_method(class, method) || right.matches_method(class, method)
            }
            PointcutExpression::Not(expr) => !expr.matches_method(class, method),
        }
    }
}

impl fmt::Debug for PointcutExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointcutExpression::All => write!(f, "All"),
            PointcutExpression::TypePattern(p) => write!(f, "TypePattern({})", p),
            PointcutExpression::MethodPattern(p) => write!(f, "MethodPattern({})", p),
            PointcutExpression::Execution {
                type_pattern,
                method_pattern,
            } => write!(f, "Execution({}.{})", type_pattern, method_pattern),
            PointcutExpression::TypeRegex(r) => write!(f, "TypeRegex({})", r.as_str()),
            PointcutExpression::MethodRegex(r) => write!(f, "MethodRegex({})", r.as_str()),
            PointcutExpression::Custom(_) => write!(f, "Custom(...)"),
            PointcutExpression::And(l, r) => write!(f, "And({:?}, {:?})", l, r),
            PointcutExpression::Or(l, r) => write!(f, "Or({:?}, {:?})", l, r),
            PointcutExpression::Not(e) => write!(f, "Not({:?})", e),
        }
    }
}

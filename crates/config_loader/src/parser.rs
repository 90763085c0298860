//! 配置解析模块
//!
//! 回放配置以 TOML 为主，JSON 用于机器生成的配置。
//! 两种格式共用同一结构，缺省字段回落到 `ReplayerConfig` 默认值。

use std::fmt;
use std::path::Path;

use contracts::{ContractError, ReplayerConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式 (大小写不敏感)
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    /// 从路径推断格式
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toml => f.write_str("TOML"),
            Self::Json => f.write_str("JSON"),
        }
    }
}

/// 根据格式解析配置
///
/// 编辑器写入的 UTF-8 BOM 会被忽略。
pub fn parse(content: &str, format: ConfigFormat) -> Result<ReplayerConfig, ContractError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let parsed: Result<ReplayerConfig, _> = match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(boxed),
        ConfigFormat::Json => serde_json::from_str(content).map_err(boxed),
    };
    parsed.map_err(|e| ContractError::ConfigParse {
        message: format!("{format} parse error: {e}"),
        source: Some(e),
    })
}

fn boxed<E>(e: E) -> Box<dyn std::error::Error + Send + Sync>
where
    E: std::error::Error + Send + Sync + 'static,
{
    Box::new(e)
}

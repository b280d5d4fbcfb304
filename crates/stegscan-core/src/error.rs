//! 错误类型（图像解码 / 配置）
//!
//! - `ImageDecodeError`：单次调用内的失败，由 `Engine` 吞掉并转换为安全默认值，不会抛给调用方。
//! - `ConfigurationError`：签名表或参数非法，只在启动期（构建 `Engine` 时）出现。
//! - 码流耗尽不是错误，见 `StopReason::Exhausted`。
use std::path::PathBuf;
use thiserror::Error;

/// 图像无法转换为采样序列
#[derive(Debug, Error)]
pub enum ImageDecodeError {
    #[error("unsupported or corrupt image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// 签名表 / 引擎参数的配置错误
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed signature table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("signature table declares no languages")]
    NoLanguages,
    #[error("language `{0}` has no rules")]
    EmptySignature(String),
    #[error("language `{0}` declared more than once")]
    DuplicateLanguage(String),
    #[error("rule id `{0}` declared more than once")]
    DuplicateRule(String),
    #[error("rule `{0}` has no regex/pattern/literal field")]
    MissingPattern(String),
    #[error("rule `{0}` sets more than one of regex/pattern/literal")]
    AmbiguousPattern(String),
    #[error("rule `{rule_id}` has an invalid regex: {source}")]
    InvalidRegex {
        rule_id: String,
        #[source]
        source: regex::Error,
    },
    #[error("rule `{rule_id}` has an invalid literal: {source}")]
    InvalidLiteral {
        rule_id: String,
        #[source]
        source: aho_corasick::BuildError,
    },
    #[error("sentinel {0:?} must be 5 printable ASCII characters")]
    InvalidSentinel(String),
    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },
}

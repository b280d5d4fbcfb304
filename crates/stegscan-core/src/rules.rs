//! 语言签名表加载（TOML）
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigurationError;

/// 内置签名表（编译期嵌入）
pub(crate) const BUILTIN_SIGNATURES: &str = include_str!("../rules/signatures.toml");

/// 单条规则的配置（regex / pattern / literal 三选一，pattern 为 regex 的别名）
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub literal: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct LanguageEntry {
    pub id: String,
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

/// 顶层规则文件结构
#[derive(Debug, Clone, Deserialize)]
struct RuleFile {
    #[serde(default)]
    pub languages: Vec<LanguageEntry>,
}

/// 规则的匹配方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PatternKind {
    Regex(String),
    Literal(String),
}

/// 归一化后的规则规格（内部使用）
#[derive(Debug, Clone)]
pub(crate) struct RuleSpec {
    pub id: String,
    pub name: Option<String>,
    pub kind: PatternKind,
}

/// 归一化后的语言签名规格，保持文件中的声明顺序
#[derive(Debug, Clone)]
pub(crate) struct LanguageSpec {
    pub id: String,
    pub rules: Vec<RuleSpec>,
}

/// 从 TOML 文件加载
pub(crate) fn load_language_specs(path: &Path) -> Result<Vec<LanguageSpec>, ConfigurationError> {
    let txt = std::fs::read_to_string(path)
        .map_err(|source| ConfigurationError::Read { path: path.to_path_buf(), source })?;
    parse_language_specs(&txt)
}

/// 解析并校验签名表
pub(crate) fn parse_language_specs(txt: &str) -> Result<Vec<LanguageSpec>, ConfigurationError> {
    let parsed: RuleFile = toml::from_str(txt)?;
    if parsed.languages.is_empty() {
        return Err(ConfigurationError::NoLanguages);
    }

    let mut seen_langs: HashSet<String> = HashSet::new();
    let mut seen_rules: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(parsed.languages.len());

    for lang in parsed.languages {
        if !seen_langs.insert(lang.id.clone()) {
            return Err(ConfigurationError::DuplicateLanguage(lang.id));
        }
        if lang.rules.is_empty() {
            return Err(ConfigurationError::EmptySignature(lang.id));
        }

        let mut rules = Vec::with_capacity(lang.rules.len());
        for e in lang.rules {
            if !seen_rules.insert(e.id.clone()) {
                return Err(ConfigurationError::DuplicateRule(e.id));
            }
            let kind = match (e.pattern, e.regex, e.literal) {
                (Some(p), None, None) | (None, Some(p), None) => PatternKind::Regex(p),
                (None, None, Some(l)) => PatternKind::Literal(l),
                (None, None, None) => return Err(ConfigurationError::MissingPattern(e.id)),
                _ => return Err(ConfigurationError::AmbiguousPattern(e.id)),
            };
            rules.push(RuleSpec { id: e.id, name: e.name, kind });
        }
        out.push(LanguageSpec { id: lang.id, rules });
    }

    Ok(out)
}

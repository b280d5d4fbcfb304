//! 规则匹配器（regex / 字面量），打分逻辑只依赖 `RuleMatcher`
use aho_corasick::AhoCorasick;
use regex::{Regex, RegexBuilder};

use crate::error::ConfigurationError;
use crate::rules::{PatternKind, RuleSpec};

/// 单条规则的匹配能力；实现必须可跨线程只读共享
pub trait RuleMatcher: Send + Sync {
    /// 文本中任意位置出现即为命中
    fn matches(&self, text: &str) -> bool;
}

/// 正则匹配（大小写不敏感 + 多行）
pub struct RegexMatcher {
    re: Regex,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let re = RegexBuilder::new(pattern).case_insensitive(true).multi_line(true).build()?;
        Ok(Self { re })
    }
}

impl RuleMatcher for RegexMatcher {
    fn matches(&self, text: &str) -> bool {
        self.re.is_match(text)
    }
}

/// 字面量子串匹配（ASCII 大小写不敏感，基于 Aho-Corasick）
pub struct LiteralMatcher {
    ac: AhoCorasick,
}

impl LiteralMatcher {
    pub fn new(literal: &str) -> Result<Self, aho_corasick::BuildError> {
        let ac = AhoCorasick::builder().ascii_case_insensitive(true).build([literal])?;
        Ok(Self { ac })
    }
}

impl RuleMatcher for LiteralMatcher {
    fn matches(&self, text: &str) -> bool {
        self.ac.is_match(text)
    }
}

/// 已编译的规则
pub struct Rule {
    id: String,
    name: Option<String>,
    matcher: Box<dyn RuleMatcher>,
}

impl Rule {
    /// 由任意匹配器构建（便于替换匹配引擎）
    pub fn new(id: impl Into<String>, matcher: Box<dyn RuleMatcher>) -> Self {
        Self { id: id.into(), name: None, matcher }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 可读名称，缺省时退回 id
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.matcher.matches(text)
    }

    /// 从规则条目编译
    pub(crate) fn from_spec(spec: &RuleSpec) -> Result<Self, ConfigurationError> {
        let matcher: Box<dyn RuleMatcher> = match &spec.kind {
            PatternKind::Regex(p) => Box::new(RegexMatcher::new(p).map_err(|source| {
                ConfigurationError::InvalidRegex { rule_id: spec.id.clone(), source }
            })?),
            PatternKind::Literal(l) => Box::new(LiteralMatcher::new(l).map_err(|source| {
                ConfigurationError::InvalidLiteral { rule_id: spec.id.clone(), source }
            })?),
        };
        Ok(Self { id: spec.id.clone(), name: spec.name.clone(), matcher })
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("id", &self.id).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str, kind: PatternKind) -> RuleSpec {
        RuleSpec { id: id.into(), name: None, kind }
    }

    #[test]
    fn regex_is_case_insensitive_and_multiline() {
        let m = RegexMatcher::new(r"^\s*import\s+\w+").unwrap();
        assert!(m.matches("x = 1\n    IMPORT os\n"));
        assert!(!m.matches("we import goods"));
    }

    #[test]
    fn literal_is_case_insensitive() {
        let m = LiteralMatcher::new("<script").unwrap();
        assert!(m.matches("<SCRIPT src=x>"));
        assert!(!m.matches("script"));
    }

    #[test]
    fn invalid_regex_is_a_configuration_error() {
        let err = Rule::from_spec(&spec("bad", PatternKind::Regex("(".into()))).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidRegex { ref rule_id, .. } if rule_id == "bad"));
    }

    #[test]
    fn custom_matcher_plugs_in() {
        struct Always;
        impl RuleMatcher for Always {
            fn matches(&self, _: &str) -> bool {
                true
            }
        }
        let rule = Rule::new("always", Box::new(Always));
        assert!(rule.matches(""));
        assert_eq!(rule.name(), "always");
    }
}

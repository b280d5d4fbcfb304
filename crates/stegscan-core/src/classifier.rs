//! 文本分类：按语言签名打分，判断是否为源代码
//!
//! 打分口径：每种语言命中的“不同规则数”（不计出现次数）。
//! 最高分胜出；同分时按签名表声明顺序取靠前者，结果确定。
use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::ConfigurationError;
use crate::matcher::Rule;
use crate::options::ClassifierOptions;
use crate::rules::{load_language_specs, parse_language_specs, LanguageSpec, BUILTIN_SIGNATURES};
use crate::types::ClassificationResult;

/// 单种语言的签名（只读配置）
#[derive(Debug)]
pub struct LanguageSignature {
    pub language_id: String,
    pub rules: Vec<Rule>,
}

/// 有序签名表；构建后不再修改，可跨线程共享
#[derive(Debug)]
pub struct SignatureTable {
    languages: Vec<LanguageSignature>,
}

static BUILTIN: Lazy<Arc<SignatureTable>> = Lazy::new(|| {
    Arc::new(SignatureTable::from_toml_str(BUILTIN_SIGNATURES).expect("built-in signature table is valid"))
});

impl SignatureTable {
    /// 内置签名表（进程内只构建一次）
    pub fn builtin() -> Arc<SignatureTable> {
        Arc::clone(&BUILTIN)
    }

    /// 从 TOML 文本构建
    pub fn from_toml_str(txt: &str) -> Result<Self, ConfigurationError> {
        Self::compile(parse_language_specs(txt)?)
    }

    /// 从 TOML 文件构建
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        Self::compile(load_language_specs(path)?)
    }

    /// 直接由已编译的签名构建（顺序即打分顺序）
    pub fn from_signatures(languages: Vec<LanguageSignature>) -> Result<Self, ConfigurationError> {
        if languages.is_empty() {
            return Err(ConfigurationError::NoLanguages);
        }
        if let Some(empty) = languages.iter().find(|l| l.rules.is_empty()) {
            return Err(ConfigurationError::EmptySignature(empty.language_id.clone()));
        }
        Ok(Self { languages })
    }

    fn compile(specs: Vec<LanguageSpec>) -> Result<Self, ConfigurationError> {
        let mut languages = Vec::with_capacity(specs.len());
        for spec in specs {
            let rules = spec.rules.iter().map(Rule::from_spec).collect::<Result<Vec<_>, _>>()?;
            let names: Vec<&str> = rules.iter().map(Rule::name).collect();
            debug!(language = %spec.id, rules = ?names, "signature compiled");
            languages.push(LanguageSignature { language_id: spec.id, rules });
        }
        Self::from_signatures(languages)
    }

    pub fn languages(&self) -> &[LanguageSignature] {
        &self.languages
    }

    pub fn rule_count(&self) -> usize {
        self.languages.iter().map(|l| l.rules.len()).sum()
    }
}

/// 对文本分类
pub fn classify_text(text: &str, table: &SignatureTable, opts: &ClassifierOptions) -> ClassificationResult {
    if text.trim().chars().count() < opts.min_text_len {
        return ClassificationResult::not_code();
    }

    // 严格大于才替换，保证同分时靠前的语言胜出
    let mut best: Option<(&LanguageSignature, BTreeSet<String>)> = None;
    for lang in table.languages() {
        let matched: BTreeSet<String> =
            lang.rules.iter().filter(|r| r.matches(text)).map(|r| r.id().to_string()).collect();
        let better = match &best {
            Some((_, cur)) => matched.len() > cur.len(),
            None => true,
        };
        if better {
            best = Some((lang, matched));
        }
    }

    let (lang, matched) = match best {
        Some(b) => b,
        None => return ClassificationResult::not_code(),
    };
    let score = matched.len();
    let is_code = score >= opts.min_score;
    let confidence = (score as u64 * opts.score_weight as u64).min(opts.max_confidence as u64) as u8;

    ClassificationResult {
        is_code,
        language: if is_code { Some(lang.language_id.clone()) } else { None },
        confidence,
        matched_rule_ids: matched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> ClassificationResult {
        classify_text(text, &SignatureTable::builtin(), &ClassifierOptions::default())
    }

    #[test]
    fn builtin_table_compiles() {
        let table = SignatureTable::builtin();
        assert_eq!(table.languages().len(), 6);
        assert!(table.rule_count() > 20);
    }

    #[test]
    fn rule_names_fall_back_to_id() {
        let table = SignatureTable::builtin();
        let python = &table.languages()[0];
        let name_of = |id: &str| python.rules.iter().find(|r| r.id() == id).map(|r| r.name().to_string());
        assert_eq!(name_of("python.process").as_deref(), Some("shell / process execution"));
        assert_eq!(name_of("python.def").as_deref(), Some("python.def"));
    }

    #[test]
    fn short_text_is_never_code() {
        let r = run("  def f(): \n");
        assert_eq!(r, ClassificationResult::not_code());
        let r = run("SELECT *");
        assert!(!r.is_code);
        assert_eq!(r.confidence, 0);
    }

    #[test]
    fn python_payload() {
        let r = run("def exploit():\n    import os\n    os.system('rm -rf /')\n");
        assert!(r.is_code);
        assert_eq!(r.language.as_deref(), Some("python"));
        assert!(r.confidence >= 40);
        assert!(r.matched_rule_ids.contains("python.def"));
        assert!(r.matched_rule_ids.contains("python.import"));
    }

    #[test]
    fn c_program() {
        let r = run("#include <stdio.h>\nint main(void) {\n  printf(\"hi\\n\");\n  return 0;\n}\n");
        assert!(r.is_code);
        assert_eq!(r.language.as_deref(), Some("c_cpp"));
        assert_eq!(r.confidence, 75);
    }

    #[test]
    fn sql_is_case_insensitive() {
        let r = run("select name from users; delete from users where id = 1;");
        assert_eq!(r.language.as_deref(), Some("sql"));
    }

    #[test]
    fn confidence_is_capped_below_certainty() {
        let text = "def a(self):\n    import os\n    class B(object): pass\n    return self.x\n\
                    os.system('ls')\nif __name__ == '__main__': a()\n";
        let r = run(text);
        assert_eq!(r.language.as_deref(), Some("python"));
        assert_eq!(r.confidence, 95);
    }

    #[test]
    fn plain_prose_is_not_code() {
        let r = run("This is a secret message hidden in the image. It's not code, just plain text.");
        assert!(!r.is_code);
        assert_eq!(r.language, None);
    }

    #[test]
    fn single_match_is_not_code_and_has_no_language() {
        let r = run("please return the borrowed book by friday");
        assert!(!r.is_code);
        assert_eq!(r.language, None);
        assert_eq!(r.confidence, 25);
    }

    #[test]
    fn ties_go_to_the_earliest_signature() {
        let table = SignatureTable::from_toml_str(
            r#"
            [[languages]]
            id = "first"
            [[languages.rules]]
            id = "first.a"
            literal = "alpha"
            [[languages.rules]]
            id = "first.b"
            literal = "beta"
            [[languages]]
            id = "second"
            [[languages.rules]]
            id = "second.a"
            literal = "alpha"
            [[languages.rules]]
            id = "second.b"
            literal = "beta"
            "#,
        )
        .unwrap();
        let r = classify_text("alpha and beta together", &table, &ClassifierOptions::default());
        assert_eq!(r.language.as_deref(), Some("first"));
        assert_eq!(r.matched_rule_ids, BTreeSet::from(["first.a".to_string(), "first.b".to_string()]));
    }

    #[test]
    fn repeated_occurrences_count_once() {
        let r = run("console.log(1); console.log(2); console.log(3);");
        assert!(!r.is_code);
        assert_eq!(r.confidence, 25);
    }
}

//! 公共结果类型（对外暴露，可直接序列化为消息元数据）
use serde::Serialize;
use std::collections::BTreeSet;

/// 码流解码的终止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// 累积文本以哨兵结尾（哨兵已剥离）
    SentinelFound,
    /// 遇到不可打印字节（该字节不计入文本）
    NonPrintable,
    /// 剩余位不足 8 位；也用于图像无法解码时的空结果
    Exhausted,
}

/// 载荷提取结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    /// 解码得到的文本；图像无法解码时为 `None`
    pub text: Option<String>,
    pub stop_reason: StopReason,
    /// 从码流读出的完整字节数（含哨兵字节与被拒绝的不可打印字节）
    pub decoded_byte_count: usize,
}

impl ExtractionResult {
    /// 图像解码失败时返回的空结果
    pub fn absent() -> Self {
        Self { text: None, stop_reason: StopReason::Exhausted, decoded_byte_count: 0 }
    }

    /// 是否以哨兵正常结束
    pub fn sentinel_found(&self) -> bool {
        self.stop_reason == StopReason::SentinelFound
    }

    /// 去除首尾空白后非空的文本
    pub fn non_blank_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// 检测信号来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Sentinel,
    Statistical,
    None,
}

/// 检测结论
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionVerdict {
    pub suspicious: bool,
    /// [0, 100]，保留两位小数
    pub confidence: f64,
    pub signal: Signal,
}

impl DetectionVerdict {
    /// 失败开放：无样本或解码失败时的默认结论
    pub fn clean() -> Self {
        Self { suspicious: false, confidence: 0.0, signal: Signal::None }
    }

    pub(crate) fn sentinel() -> Self {
        Self { suspicious: true, confidence: 100.0, signal: Signal::Sentinel }
    }
}

/// 文本分类结果；`language` 当且仅当 `is_code` 时有值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub is_code: bool,
    pub language: Option<String>,
    pub confidence: u8,
    pub matched_rule_ids: BTreeSet<String>,
}

impl ClassificationResult {
    pub(crate) fn not_code() -> Self {
        Self { is_code: false, language: None, confidence: 0, matched_rule_ids: BTreeSet::new() }
    }
}

/// 综合安全状态（供调用方决定如何展示/投递消息）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityStatus {
    Clean,
    /// 存在隐藏文本，但不像代码
    Warning,
    /// 隐藏文本被识别为代码
    Suspicious,
}

/// `Engine::analyze` 的综合报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityReport {
    pub detection: DetectionVerdict,
    /// 仅在检测为可疑时提取
    pub extraction: Option<ExtractionResult>,
    pub classification: Option<ClassificationResult>,
    pub status: SecurityStatus,
}

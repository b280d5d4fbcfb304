//! 引擎参数与批量扫描选项（模块）
use serde::Deserialize;

use crate::error::ConfigurationError;

/// 默认哨兵，必须与配套编码器逐字节一致
pub const DEFAULT_SENTINEL: &str = "#####";

/// 引擎参数（可从 TOML 读取，缺省字段取校准值）
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineOptions {
    /// 载荷结束标记（5 个可打印 ASCII 字符）
    pub sentinel: String,
    pub detector: DetectorOptions,
    pub classifier: ClassifierOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            detector: DetectorOptions::default(),
            classifier: ClassifierOptions::default(),
        }
    }
}

/// 统计检测参数
///
/// 阈值取自成对分组（`value & !1`）卡方统计的校准：自然图像的平均组内卡方
/// 通常 > 1，写入文本后前部样本的奇偶几乎均分，平均值接近 0。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorOptions {
    /// 平均组内卡方低于该值即判定为可疑
    pub chi_threshold: f64,
    /// 统计窗口占全部样本的比例（从首个样本开始）
    pub window_fraction: f64,
    /// 统计窗口下限（样本数）
    pub min_window: usize,
    /// 统计信号的置信度上限
    pub max_confidence: f64,
    /// 非可疑时残余分数：`(noise_ceiling - avg) * noise_scale`
    pub noise_ceiling: f64,
    pub noise_scale: f64,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            chi_threshold: 0.3,
            window_fraction: 0.2,
            min_window: 256,
            max_confidence: 95.0,
            noise_ceiling: 1.0,
            noise_scale: 50.0,
        }
    }
}

/// 分类器参数
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierOptions {
    /// 去除首尾空白后的最短字符数
    pub min_text_len: usize,
    /// 判定为代码所需的最少命中规则数
    pub min_score: usize,
    /// 每条命中规则的置信度权重
    pub score_weight: u32,
    /// 置信度上限（小于 100，避免虚假的确定性）
    pub max_confidence: u8,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self { min_text_len: 12, min_score: 2, score_weight: 25, max_confidence: 95 }
    }
}

impl EngineOptions {
    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(txt: &str) -> Result<Self, ConfigurationError> {
        let opts: EngineOptions = toml::from_str(txt)?;
        opts.validate()?;
        Ok(opts)
    }

    /// 校验参数范围；非法配置属于启动期错误
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let s = &self.sentinel;
        let sentinel_ok = s.len() == 5 && s.bytes().all(|b| (0x20..=0x7E).contains(&b));
        if !sentinel_ok {
            return Err(ConfigurationError::InvalidSentinel(s.clone()));
        }

        let d = &self.detector;
        if !(d.chi_threshold > 0.0 && d.chi_threshold.is_finite()) {
            return Err(invalid("detector.chi_threshold", "must be a positive number"));
        }
        if !(d.window_fraction > 0.0 && d.window_fraction <= 1.0) {
            return Err(invalid("detector.window_fraction", "must be in (0, 1]"));
        }
        if !(0.0..=100.0).contains(&d.max_confidence) {
            return Err(invalid("detector.max_confidence", "must be in [0, 100]"));
        }
        if !(d.noise_scale >= 0.0 && d.noise_ceiling.is_finite() && d.noise_scale.is_finite()) {
            return Err(invalid("detector.noise_scale", "must be a non-negative number"));
        }

        let c = &self.classifier;
        if c.min_score == 0 {
            return Err(invalid("classifier.min_score", "must be at least 1"));
        }
        if c.max_confidence > 100 {
            return Err(invalid("classifier.max_confidence", "must be in [0, 100]"));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidOption { name, reason: reason.to_string() }
}

/// 批量扫描选项
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// 最大文件大小（字节）；超过则跳过
    pub max_file_size: Option<u64>,
    /// 线程数：None 表示自动（等于 CPU 核数）；Some(1) 走串行
    pub threads: Option<usize>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { max_file_size: None, threads: None }
    }
}

/// 扫描统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub suspicious: usize,
    pub warnings: usize,
}

//! LSB 隐写分析引擎
//!
//! 设计要点：
//! - 图像 → BT.601 灰度采样 → LSB 码流；检测与提取共用同一个解码器。
//! - 检测结合两个信号：哨兵（确定性）与成对分组卡方（统计性）。
//! - 提取出的文本按语言签名打分，判断是否为代码；签名表为只读配置，进程内只构建一次。
//! - 单次调用无状态、无锁；解码失败一律返回安全默认值（失败开放），不向调用方抛错。

mod bitstream;
mod classifier;
mod detector;
mod engine;
mod error;
mod matcher;
mod options;
mod rules;
mod samples;
mod scan;
mod types;

pub use bitstream::{decode, PrintableSet};
pub use classifier::{classify_text, LanguageSignature, SignatureTable};
pub use detector::{detect_decoded, detect_samples, paired_chi_square, statistical_verdict, window_len, ChiSquareStats};
pub use engine::{classify, default_engine, detect, extract, Engine};
pub use error::{ConfigurationError, ImageDecodeError};
pub use matcher::{LiteralMatcher, RegexMatcher, Rule, RuleMatcher};
pub use options::{ClassifierOptions, DetectorOptions, EngineOptions, ScanOptions, ScanStats, DEFAULT_SENTINEL};
pub use samples::{cover_samples, from_image, luma_bt601, CoverSamples};
pub use scan::{scan_and_write, ScanRecord};
pub use types::{
    ClassificationResult, DetectionVerdict, ExtractionResult, SecurityReport, SecurityStatus, Signal, StopReason,
};

//! 引擎门面：检测 / 提取 / 分类 / 综合评估
//!
//! 单次调用内的所有失败都转换为安全的否定结果（失败开放），只记录日志，
//! 不改变返回结构：漏检优于阻塞消息投递。
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bitstream::{decode, PrintableSet};
use crate::classifier::{classify_text, SignatureTable};
use crate::detector::{detect_decoded, detect_samples};
use crate::error::ConfigurationError;
use crate::options::EngineOptions;
use crate::samples::{cover_samples, CoverSamples};
use crate::types::{
    ClassificationResult, DetectionVerdict, ExtractionResult, SecurityReport, SecurityStatus,
};

/// 无状态引擎：只持有只读配置，可在线程间共享
#[derive(Debug, Clone)]
pub struct Engine {
    options: EngineOptions,
    printable: PrintableSet,
    signatures: Arc<SignatureTable>,
}

static DEFAULT_ENGINE: Lazy<Engine> = Lazy::new(Engine::with_defaults);

/// 默认引擎（内置签名表 + 校准参数）
pub fn default_engine() -> &'static Engine {
    &DEFAULT_ENGINE
}

/// 使用默认引擎检测
pub fn detect(image_bytes: &[u8]) -> DetectionVerdict {
    default_engine().detect(image_bytes)
}

/// 使用默认引擎提取
pub fn extract(image_bytes: &[u8]) -> ExtractionResult {
    default_engine().extract(image_bytes)
}

/// 使用默认引擎分类
pub fn classify(text: &str) -> ClassificationResult {
    default_engine().classify(text)
}

impl Engine {
    /// 校验参数后构建
    pub fn new(options: EngineOptions, signatures: Arc<SignatureTable>) -> Result<Self, ConfigurationError> {
        options.validate()?;
        Ok(Self { options, printable: PrintableSet::ascii(), signatures })
    }

    /// 内置签名表 + 默认参数
    pub fn with_defaults() -> Self {
        Self {
            options: EngineOptions::default(),
            printable: PrintableSet::ascii(),
            signatures: SignatureTable::builtin(),
        }
    }

    /// 替换可打印字符集合；哨兵必须全部落在新集合内
    pub fn with_printable(mut self, printable: PrintableSet) -> Result<Self, ConfigurationError> {
        if !self.options.sentinel.bytes().all(|b| printable.contains(b)) {
            return Err(ConfigurationError::InvalidSentinel(self.options.sentinel.clone()));
        }
        self.printable = printable;
        Ok(self)
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn signatures(&self) -> &SignatureTable {
        &self.signatures
    }

    fn load_samples(&self, image_bytes: &[u8], op: &'static str) -> Option<CoverSamples> {
        match cover_samples(image_bytes) {
            Ok(samples) => Some(samples),
            Err(e) => {
                warn!(op, error = %e, bytes = image_bytes.len(), "image decode failed, returning safe default");
                None
            }
        }
    }

    /// 检测图像是否携带 LSB 载荷（不会失败）
    pub fn detect(&self, image_bytes: &[u8]) -> DetectionVerdict {
        match self.load_samples(image_bytes, "detect") {
            Some(samples) => self.detect_samples(&samples),
            None => DetectionVerdict::clean(),
        }
    }

    pub fn detect_samples(&self, samples: &CoverSamples) -> DetectionVerdict {
        detect_samples(
            samples.as_slice(),
            &self.printable,
            self.options.sentinel.as_bytes(),
            &self.options.detector,
        )
    }

    /// 提取 LSB 载荷（不会失败；图像无法解码时文本为 `None`）
    pub fn extract(&self, image_bytes: &[u8]) -> ExtractionResult {
        match self.load_samples(image_bytes, "extract") {
            Some(samples) => self.extract_samples(&samples),
            None => ExtractionResult::absent(),
        }
    }

    pub fn extract_samples(&self, samples: &CoverSamples) -> ExtractionResult {
        let res = decode(samples.as_slice(), &self.printable, self.options.sentinel.as_bytes());
        debug!(stop_reason = ?res.stop_reason, bytes = res.decoded_byte_count, "lsb stream decoded");
        res
    }

    pub fn classify(&self, text: &str) -> ClassificationResult {
        classify_text(text, &self.signatures, &self.options.classifier)
    }

    /// 综合评估：检测 → （可疑时）提取 → 分类
    ///
    /// 可疑但提取不到非空文本时，视为误报并改写为干净结论。
    pub fn analyze(&self, image_bytes: &[u8]) -> SecurityReport {
        self.analyze_image(image_bytes, None)
    }

    /// 同 [`Engine::analyze`]，审计事件中带上图像标识（文件名、消息 id 等）
    pub fn analyze_named(&self, image_bytes: &[u8], image: &str) -> SecurityReport {
        self.analyze_image(image_bytes, Some(image))
    }

    fn analyze_image(&self, image_bytes: &[u8], image: Option<&str>) -> SecurityReport {
        match self.load_samples(image_bytes, "analyze") {
            Some(samples) => self.assess(&samples, image),
            None => SecurityReport::clean(DetectionVerdict::clean(), None),
        }
    }

    pub fn analyze_samples(&self, samples: &CoverSamples) -> SecurityReport {
        self.assess(samples, None)
    }

    // 码流只解码一次，检测与提取共用
    fn assess(&self, samples: &CoverSamples, image: Option<&str>) -> SecurityReport {
        let extraction = self.extract_samples(samples);
        let detection = detect_decoded(samples.as_slice(), &extraction, &self.options.detector);
        if !detection.suspicious {
            return SecurityReport::clean(detection, None);
        }

        let classification = match extraction.non_blank_text() {
            Some(text) => self.classify(text),
            None => {
                debug!(signal = ?detection.signal, "suspicious image yielded no text, treating as clean");
                return SecurityReport::clean(DetectionVerdict::clean(), Some(extraction));
            }
        };

        let status = if classification.is_code { SecurityStatus::Suspicious } else { SecurityStatus::Warning };
        audit(image.unwrap_or("-"), &detection, &classification, status);
        SecurityReport { detection, extraction: Some(extraction), classification: Some(classification), status }
    }
}

impl SecurityReport {
    fn clean(detection: DetectionVerdict, extraction: Option<ExtractionResult>) -> Self {
        Self { detection, extraction, classification: None, status: SecurityStatus::Clean }
    }
}

/// 载荷事件日志（独立 target，便于调用方单独收集）
fn audit(image: &str, detection: &DetectionVerdict, classification: &ClassificationResult, status: SecurityStatus) {
    let language = classification.language.as_deref().unwrap_or("unknown");
    match status {
        SecurityStatus::Suspicious => warn!(
            target: "stegscan::audit",
            image = %image,
            language,
            signal = ?detection.signal,
            confidence = detection.confidence,
            reason = "code_payload",
            "hidden payload flagged"
        ),
        _ => info!(
            target: "stegscan::audit",
            image = %image,
            language,
            signal = ?detection.signal,
            confidence = detection.confidence,
            reason = "text_payload",
            "hidden payload flagged"
        ),
    }
}

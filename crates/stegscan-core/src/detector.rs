//! LSB 隐写检测：哨兵信号 + 成对分组卡方统计
//!
//! 1. 先用码流解码器查找哨兵，命中即为确定性检测（置信度 100）。
//! 2. 否则在前部窗口上做统计：按 `value & !1` 分组，统计组内 LSB 的 0/1 数，
//!    对样本数 ≥ 2 的组累加卡方值并取平均。自然噪声的平均值通常 > 1，
//!    写入文本后奇偶几乎均分，平均值接近 0。
use tracing::debug;

use crate::bitstream::{decode, PrintableSet};
use crate::options::DetectorOptions;
use crate::types::{DetectionVerdict, ExtractionResult, Signal};

/// 统计信号的中间结果（便于调试与测试）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChiSquareStats {
    /// 实际参与统计的样本数
    pub window: usize,
    /// 样本数 ≥ 2 的分组数
    pub groups: usize,
    /// 平均组内卡方值
    pub average: f64,
}

/// 统计窗口：`min(len, max(min_window, floor(len * fraction)))`
pub fn window_len(total: usize, opts: &DetectorOptions) -> usize {
    let by_fraction = (total as f64 * opts.window_fraction).floor() as usize;
    by_fraction.max(opts.min_window).min(total)
}

/// 计算窗口内的平均组内卡方值；没有可统计分组时返回 `None`
pub fn paired_chi_square(samples: &[u8], opts: &DetectorOptions) -> Option<ChiSquareStats> {
    let window = window_len(samples.len(), opts);
    // 下标为 value >> 1，对应 base = value & !1
    let mut counts = [[0u32; 2]; 128];
    for &v in &samples[..window] {
        counts[(v >> 1) as usize][(v & 1) as usize] += 1;
    }

    let mut chi_sq = 0.0f64;
    let mut groups = 0usize;
    for [c0, c1] in counts {
        let total = c0 + c1;
        if total < 2 {
            continue;
        }
        let expected = total as f64 / 2.0;
        let d0 = c0 as f64 - expected;
        let d1 = c1 as f64 - expected;
        chi_sq += (d0 * d0 + d1 * d1) / expected;
        groups += 1;
    }

    if groups == 0 {
        return None;
    }
    Some(ChiSquareStats { window, groups, average: chi_sq / groups as f64 })
}

/// 平均卡方值 → 统计结论
pub fn statistical_verdict(average: f64, opts: &DetectorOptions) -> DetectionVerdict {
    let thr = opts.chi_threshold;
    let (suspicious, raw) = if average < thr {
        (true, (thr - average) / thr * opts.max_confidence)
    } else {
        (false, (opts.noise_ceiling - average) * opts.noise_scale)
    };
    let confidence = round2(raw.clamp(0.0, opts.max_confidence));
    DetectionVerdict { suspicious, confidence, signal: Signal::Statistical }
}

/// 在采样序列上执行完整检测（不会失败；无样本时返回干净结论）
pub fn detect_samples(
    samples: &[u8],
    printable: &PrintableSet,
    sentinel: &[u8],
    opts: &DetectorOptions,
) -> DetectionVerdict {
    if samples.is_empty() {
        return DetectionVerdict::clean();
    }

    let decoded = decode(samples, printable, sentinel);
    detect_decoded(samples, &decoded, opts)
}

/// 在已解码的码流上检测：调用方已持有解码结果时避免重复解码
pub fn detect_decoded(samples: &[u8], decoded: &ExtractionResult, opts: &DetectorOptions) -> DetectionVerdict {
    if samples.is_empty() {
        return DetectionVerdict::clean();
    }
    if decoded.sentinel_found() {
        debug!(bytes = decoded.decoded_byte_count, "sentinel found in lsb stream");
        return DetectionVerdict::sentinel();
    }

    match paired_chi_square(samples, opts) {
        Some(stats) => {
            let verdict = statistical_verdict(stats.average, opts);
            debug!(
                window = stats.window,
                groups = stats.groups,
                average = stats.average,
                suspicious = verdict.suspicious,
                "paired chi-square"
            );
            verdict
        }
        None => DetectionVerdict::clean(),
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

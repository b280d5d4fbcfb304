//! LSB 码流解码（检测与提取共用的唯一实现）
//!
//! `bit[i] = sample[i] & 1`，每 8 位按高位在前组成一个字节。
//! 终止条件（按优先级逐字节判定）：
//! 1. 剩余不足 8 位 → `Exhausted`
//! 2. 字节不在可打印集合 → `NonPrintable`（该字节不计入文本）
//! 3. 累积文本以哨兵结尾 → 剥离哨兵，`SentinelFound`
use crate::types::{ExtractionResult, StopReason};

/// 可打印字符集合（按字节位图）
#[derive(Clone, PartialEq, Eq)]
pub struct PrintableSet {
    allowed: [bool; 256],
}

impl PrintableSet {
    /// 默认集合：0x20..=0x7E 及空白 `\t \n \r \x0B \x0C`
    pub fn ascii() -> Self {
        let mut allowed = [false; 256];
        for b in 0x20u8..=0x7E {
            allowed[b as usize] = true;
        }
        for b in [b'\t', b'\n', b'\r', 0x0B, 0x0C] {
            allowed[b as usize] = true;
        }
        Self { allowed }
    }

    /// 由显式字节集合构建
    pub fn from_bytes(bytes: impl IntoIterator<Item = u8>) -> Self {
        let mut allowed = [false; 256];
        for b in bytes {
            allowed[b as usize] = true;
        }
        Self { allowed }
    }

    #[inline]
    pub fn contains(&self, b: u8) -> bool {
        self.allowed[b as usize]
    }
}

impl Default for PrintableSet {
    fn default() -> Self {
        Self::ascii()
    }
}

impl std::fmt::Debug for PrintableSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.allowed.iter().filter(|&&a| a).count();
        f.debug_struct("PrintableSet").field("len", &n).finish()
    }
}

/// 解码采样序列的 LSB 码流
///
/// 返回的文本总是 `Some`（可能为空），哨兵不会出现在文本中。
pub fn decode(samples: &[u8], printable: &PrintableSet, sentinel: &[u8]) -> ExtractionResult {
    let mut acc: Vec<u8> = Vec::new();
    let mut decoded = 0usize;

    let stop_reason = loop {
        let start = decoded * 8;
        let chunk = match samples.get(start..start + 8) {
            Some(c) => c,
            None => break StopReason::Exhausted,
        };
        let byte = chunk.iter().fold(0u8, |b, &s| (b << 1) | (s & 1));
        decoded += 1;

        if !printable.contains(byte) {
            break StopReason::NonPrintable;
        }
        acc.push(byte);
        if !sentinel.is_empty() && acc.ends_with(sentinel) {
            acc.truncate(acc.len() - sentinel.len());
            break StopReason::SentinelFound;
        }
    };

    ExtractionResult {
        // 自定义可打印集合可能包含 0x80 以上字节，按 Latin-1 映射为字符
        text: Some(acc.iter().map(|&b| b as char).collect()),
        stop_reason,
        decoded_byte_count: decoded,
    }
}

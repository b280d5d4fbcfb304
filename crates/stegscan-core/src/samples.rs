//! 图像 → 灰度采样序列（CoverSamples）
//!
//! 灰度公式固定为 ITU-R BT.601（16 位定点）：
//! `L = (19595*R + 38470*G + 7471*B + 0x8000) >> 16`
//! 单通道 8 位图像直接使用原值；alpha 通道忽略。公式固定，保证置信度可复现。
use image::DynamicImage;

use crate::error::ImageDecodeError;

/// 只读的采样序列，行优先，每像素一个 [0,255] 强度值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverSamples {
    values: Vec<u8>,
}

impl CoverSamples {
    /// 直接由强度序列构建（测试 / 调用方已有灰度数据时使用）
    pub fn from_values(values: Vec<u8>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 解码原始图像字节并转换为采样序列
pub fn cover_samples(image_bytes: &[u8]) -> Result<CoverSamples, ImageDecodeError> {
    let img = image::load_from_memory(image_bytes)?;
    from_image(&img)
}

/// 已解码图像 → 采样序列
pub fn from_image(img: &DynamicImage) -> Result<CoverSamples, ImageDecodeError> {
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(ImageDecodeError::Empty { width, height });
    }

    let values = match img {
        DynamicImage::ImageLuma8(gray) => gray.as_raw().clone(),
        DynamicImage::ImageLumaA8(gray) => gray.pixels().map(|p| p.0[0]).collect(),
        other => other.to_rgb8().pixels().map(|p| luma_bt601(p.0)).collect(),
    };
    Ok(CoverSamples { values })
}

/// BT.601 灰度（与常见图像库的 RGB→L 转换一致）
#[inline]
pub fn luma_bt601([r, g, b]: [u8; 3]) -> u8 {
    let l = 19595 * r as u32 + 38470 * g as u32 + 7471 * b as u32 + 0x8000;
    (l >> 16) as u8
}

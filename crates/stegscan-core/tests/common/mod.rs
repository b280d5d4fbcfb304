//! 集成测试公共工具：生成灰度封面并按引擎约定写入 LSB 载荷
#![allow(dead_code)]

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Cursor;

pub const SENTINEL: &str = "#####";

/// 纯色灰度封面
pub fn flat_cover(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// 随机强度封面（固定种子，结果可复现）
pub fn noise_cover(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    GrayImage::from_fn(width, height, |_, _| Luma([rng.gen()]))
}

/// 把 `text + SENTINEL` 按高位在前写入像素 LSB（行优先）
pub fn embed(cover: &GrayImage, text: &str) -> GrayImage {
    embed_raw(cover, format!("{text}{SENTINEL}").as_bytes())
}

/// 写入任意字节（不追加哨兵）
pub fn embed_raw(cover: &GrayImage, payload: &[u8]) -> GrayImage {
    let mut img = cover.clone();
    let bits = payload.iter().flat_map(|&b| (0..8).rev().map(move |i| (b >> i) & 1));
    for (px, bit) in img.pixels_mut().zip(bits) {
        px.0[0] = (px.0[0] & !1) | bit;
    }
    img
}

/// R=G=B 的彩色图，BT.601 灰度恰好等于原值
pub fn gray_as_rgb(img: &GrayImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let v = img.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    })
}

pub fn png_bytes(img: DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).expect("encode png");
    buf
}

pub fn gray_png(img: &GrayImage) -> Vec<u8> {
    png_bytes(DynamicImage::ImageLuma8(img.clone()))
}

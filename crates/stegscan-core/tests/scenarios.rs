//! 端到端场景：PNG 封面 → 检测 / 提取 / 分类

mod common;

use common::*;
use image::DynamicImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stegscan_core::{
    classify, detect, extract, luma_bt601, Engine, SecurityStatus, Signal, StopReason,
};

const PYTHON_PAYLOAD: &str = "def exploit():\n    import os\n    os.system('rm -rf /')\n";
const PROSE_PAYLOAD: &str = "Meet me by the old harbor gate at nine tonight and bring the blue umbrellas, ok?";

fn light_blue_cover() -> image::GrayImage {
    flat_cover(400, 300, luma_bt601([173, 216, 230]))
}

#[test]
fn random_noise_is_not_flagged() {
    // 100,000 个独立随机采样，无嵌入
    let png = gray_png(&noise_cover(400, 250, 0xC0FFEE));
    let verdict = detect(&png);
    assert!(!verdict.suspicious, "{verdict:?}");
    assert_eq!(verdict.signal, Signal::Statistical);
    assert!(verdict.confidence >= 0.0 && verdict.confidence <= 100.0);
}

#[test]
fn python_payload_is_recovered_and_classified() {
    let png = gray_png(&embed(&light_blue_cover(), PYTHON_PAYLOAD));

    let verdict = detect(&png);
    assert!(verdict.suspicious);
    assert_eq!(verdict.confidence, 100.0);
    assert_eq!(verdict.signal, Signal::Sentinel);

    let extraction = extract(&png);
    assert_eq!(extraction.text.as_deref(), Some(PYTHON_PAYLOAD));
    assert_eq!(extraction.stop_reason, StopReason::SentinelFound);
    assert_eq!(extraction.decoded_byte_count, PYTHON_PAYLOAD.len() + SENTINEL.len());

    let class = classify(PYTHON_PAYLOAD);
    assert!(class.is_code);
    assert_eq!(class.language.as_deref(), Some("python"));
    assert!(class.confidence >= 40);
}

#[test]
fn prose_payload_is_recovered_but_not_code() {
    assert_eq!(PROSE_PAYLOAD.len(), 80);
    let png = gray_png(&embed(&light_blue_cover(), PROSE_PAYLOAD));

    let extraction = extract(&png);
    assert_eq!(extraction.text.as_deref(), Some(PROSE_PAYLOAD));

    let class = classify(PROSE_PAYLOAD);
    assert!(!class.is_code);
    assert_eq!(class.language, None);
}

#[test]
fn corrupted_image_fails_open() {
    let png = gray_png(&embed(&light_blue_cover(), PYTHON_PAYLOAD));
    let truncated = &png[..png.len() / 3];

    let verdict = detect(truncated);
    assert!(!verdict.suspicious);
    assert_eq!(verdict.confidence, 0.0);
    assert_eq!(verdict.signal, Signal::None);

    let extraction = extract(truncated);
    assert_eq!(extraction.text, None);
    assert_eq!(extraction.decoded_byte_count, 0);

    let report = Engine::with_defaults().analyze(truncated);
    assert_eq!(report.status, SecurityStatus::Clean);
}

#[test]
fn rgb_cover_with_gray_pixels_round_trips() {
    let stego = embed(&noise_cover(64, 64, 3), "SELECT password FROM users; DROP TABLE users;");
    let png = png_bytes(DynamicImage::ImageRgb8(gray_as_rgb(&stego)));
    let report = Engine::with_defaults().analyze(&png);
    assert_eq!(report.status, SecurityStatus::Suspicious);
    assert_eq!(report.classification.and_then(|c| c.language).as_deref(), Some("sql"));
}

#[test]
fn printable_text_round_trips() {
    // '#' 不参与生成：文本以 '#' 结尾时会与哨兵相连，提前终止
    let alphabet: Vec<u8> = (0x20u8..=0x7E).filter(|&b| b != b'#').chain([b'\t', b'\n', b'\r']).collect();
    let mut rng = StdRng::seed_from_u64(2024);
    let cover = noise_cover(96, 96, 11);
    let capacity = (96 * 96) / 8 - SENTINEL.len();

    for len in [0usize, 1, 7, 12, 100, 512, capacity] {
        let text: String = (0..len).map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char).collect();
        let extraction = extract(&gray_png(&embed(&cover, &text)));
        assert_eq!(extraction.text.as_deref(), Some(text.as_str()), "len = {len}");
        assert_eq!(extraction.stop_reason, StopReason::SentinelFound);
    }
}

#[test]
fn payload_without_sentinel_is_still_extracted() {
    let cover = flat_cover(32, 32, 120);
    let png = gray_png(&embed_raw(&cover, b"partial payload"));
    let extraction = extract(&png);
    // 封面全为偶数，载荷之后解码为 0x00
    assert_eq!(extraction.text.as_deref(), Some("partial payload"));
    assert_eq!(extraction.stop_reason, StopReason::NonPrintable);
    assert_eq!(detect(&png).signal, Signal::Statistical);
}

#[test]
fn calls_are_idempotent() {
    let png = gray_png(&embed(&noise_cover(50, 50, 9), PYTHON_PAYLOAD));
    assert_eq!(detect(&png), detect(&png));
    assert_eq!(extract(&png), extract(&png));
    assert_eq!(classify(PYTHON_PAYLOAD), classify(PYTHON_PAYLOAD));

    let noise = gray_png(&noise_cover(80, 80, 5));
    assert_eq!(detect(&noise), detect(&noise));
}

#[test]
fn short_text_is_never_code() {
    for text in ["", "   ", "import os", "def f(): 1", "x = 1;\n\n\n\n\n\n\n\n\n"] {
        let r = classify(text);
        assert!(!r.is_code, "{text:?}");
        assert_eq!(r.confidence, 0);
    }
}

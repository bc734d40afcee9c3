//! CAPTCHA画像の前処理
//!
//! OCR前にノイズを落としてグリフを立たせる固定フィルタチェーン:
//! グレースケール → 正規化 → コントラスト1.2 → 明度1.2 → 弱ブラー

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat};

use crate::error::ScraperError;

const CONTRAST_FACTOR: f32 = 1.2;
const CONTRAST_OFFSET: f32 = 0.0;
const BRIGHTNESS_FACTOR: f32 = 1.2;
const BLUR_SIGMA: f32 = 1.0;

/// PNGバイト列を前処理してPNGバイト列を返す
pub fn preprocess_captcha(png: &[u8]) -> Result<Vec<u8>, ScraperError> {
    let img = image::load_from_memory(png)?;
    let mut gray = img.to_luma8();

    normalize(&mut gray);
    apply_linear(&mut gray, CONTRAST_FACTOR, CONTRAST_OFFSET);
    apply_linear(&mut gray, BRIGHTNESS_FACTOR, 0.0);
    let blurred = image::imageops::blur(&gray, BLUR_SIGMA);

    let mut out = Vec::new();
    DynamicImage::ImageLuma8(blurred).write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

/// 輝度レンジを0..255へ引き伸ばす
fn normalize(img: &mut GrayImage) {
    let (mut min, mut max) = (u8::MAX, u8::MIN);
    for pixel in img.pixels() {
        min = min.min(pixel.0[0]);
        max = max.max(pixel.0[0]);
    }
    if max <= min {
        return;
    }
    let range = (max - min) as f32;
    for pixel in img.pixels_mut() {
        let value = (pixel.0[0] - min) as f32 * 255.0 / range;
        pixel.0[0] = value.round().clamp(0.0, 255.0) as u8;
    }
}

/// 輝度の一次変換 out = in * factor + offset（0..255で飽和）
fn apply_linear(img: &mut GrayImage, factor: f32, offset: f32) {
    for pixel in img.pixels_mut() {
        let value = pixel.0[0] as f32 * factor + offset;
        pixel.0[0] = value.round().clamp(0.0, 255.0) as u8;
    }
}

//! OCRモジュール
//!
//! CAPTCHA画像の前処理と tesseract CLI によるテキスト認識

mod preprocess;
mod tesseract;

pub use preprocess::preprocess_captcha;
pub use tesseract::{TesseractOcr, CHAR_WHITELIST};

//! tesseract CLIによるOCRエンジン実装

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::ScraperError;
use crate::traits::OcrEngine;

/// 認識対象を英数字に制限するホワイトリスト
pub const CHAR_WHITELIST: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// tesseractバイナリを起動するOCRエンジン
pub struct TesseractOcr {
    binary: PathBuf,
}

impl TesseractOcr {
    /// 環境変数 TESSERACT_PATH、なければPATH上の "tesseract" を使う
    pub fn new() -> Self {
        let binary = std::env::var("TESSERACT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("tesseract"));
        Self { binary }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image_path: &Path) -> Result<String, ScraperError> {
        debug!("Running tesseract on {:?}", image_path);

        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", "eng", "--psm", "7"])
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", CHAR_WHITELIST))
            .output()
            .await
            .map_err(|e| ScraperError::Ocr(format!("tesseract起動失敗: {}", e)))?;

        if !output.status.success() {
            return Err(ScraperError::Ocr(format!(
                "tesseract異常終了 ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

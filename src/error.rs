use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ストアファイルが見つかりません: {0}")]
    StoreNotFound(PathBuf),

    #[error("ストアを解析できません: {0}")]
    StoreMalformed(String),

    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("JavaScript実行エラー: {0}")]
    JavaScript(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("CAPTCHAウィジェットが見つかりません")]
    CaptchaWidgetMissing,

    #[error("CAPTCHAを認識できません: {0}")]
    CaptchaUnreadable(String),

    #[error("OCRエンジンエラー: {0}")]
    Ocr(String),

    #[error("画像処理エラー: {0}")]
    Image(#[from] image::ImageError),

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("ファイル操作エラー: {0}")]
    FileIo(#[from] std::io::Error),
}

impl ScraperError {
    /// リトライで回復可能なエラーか
    ///
    /// ストア・起動系のエラーのみ致命扱い。それ以外は試行/レコード単位の
    /// リトライループに吸収される。
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScraperError::Navigation(_)
                | ScraperError::JavaScript(_)
                | ScraperError::ElementNotFound(_)
                | ScraperError::CaptchaWidgetMissing
                | ScraperError::CaptchaUnreadable(_)
                | ScraperError::Ocr(_)
                | ScraperError::Image(_)
                | ScraperError::Timeout(_)
        )
    }
}

//! CAPTCHA解決の1試行
//!
//! キャプチャ → 前処理 → 認識 → 送信 → ナビゲーション待ち。
//! 戻り値はナビゲーションが成立したかどうかのみ。
//! `CaptchaWidgetMissing` / `CaptchaUnreadable` だけは呼び出し側が
//! 捕捉してリロード後に再試行する契約。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::ScraperError;
use crate::ocr::preprocess_captcha;
use crate::traits::{LookupDriver, OcrEngine};

use super::types::selectors;

/// 送信後のURL変化ポーリング間隔（ミリ秒）
const URL_POLL_INTERVAL_MS: u64 = 250;

/// 生キャプチャ/前処理済みキャプチャの保存ファイル名（毎試行上書き）
const RAW_CAPTCHA_FILE: &str = "captcha.png";
const PROCESSED_CAPTCHA_FILE: &str = "captcha_processed.png";

pub struct CaptchaResolver {
    ocr: Arc<dyn OcrEngine>,
    screenshots_dir: PathBuf,
    navigation_timeout: Duration,
    debug: bool,
}

impl CaptchaResolver {
    pub fn new(
        ocr: Arc<dyn OcrEngine>,
        screenshots_dir: impl Into<PathBuf>,
        navigation_timeout: Duration,
        debug: bool,
    ) -> Self {
        Self {
            ocr,
            screenshots_dir: screenshots_dir.into(),
            navigation_timeout,
            debug,
        }
    }

    /// 1試行を実行し、ナビゲーションが成立したら true を返す
    pub async fn attempt(&self, driver: &dyn LookupDriver) -> Result<bool, ScraperError> {
        // キャプチャ: ウィジェットの位置を取得して切り抜く
        let bounds = driver
            .element_box(selectors::CAPTCHA_IMAGE)
            .await?
            .ok_or(ScraperError::CaptchaWidgetMissing)?;
        debug!("Captcha bounds: {:?}", bounds);

        let raw = driver.screenshot_clip(&bounds).await?;
        let raw_path = self.screenshots_dir.join(RAW_CAPTCHA_FILE);
        std::fs::write(&raw_path, &raw)?;
        debug!("Captcha screenshot saved at {:?}", raw_path);

        // 前処理
        let processed = preprocess_captcha(&raw)?;
        let processed_path = self.screenshots_dir.join(PROCESSED_CAPTCHA_FILE);
        std::fs::write(&processed_path, &processed)?;

        if self.debug {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&processed);
            debug!("Processed captcha: data:image/png;base64,{}", encoded);
        }

        // 認識
        let text = self
            .ocr
            .recognize(&processed_path)
            .await
            .map_err(|e| ScraperError::CaptchaUnreadable(e.to_string()))?;
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ScraperError::CaptchaUnreadable("OCR結果が空".into()));
        }
        info!("Captcha text: {}", text);

        // 送信
        driver.type_text(selectors::CAPTCHA_INPUT, &text).await?;
        let url_before = driver.current_url().await?;
        driver.click(selectors::SUBMIT_BUTTON).await?;

        // ナビゲーション待ち: 上限までURL変化をポーリング
        let start = Instant::now();
        loop {
            let url_now = driver.current_url().await?;
            if url_now != url_before {
                info!("Successfully navigated to the next page");
                return Ok(true);
            }
            if start.elapsed() >= self.navigation_timeout {
                break;
            }
            sleep(Duration::from_millis(URL_POLL_INTERVAL_MS)).await;
        }

        info!("Navigation failed within {:?}", self.navigation_timeout);
        Ok(false)
    }
}

//! chromiumoxide による照会ページドライバ実装

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, ReloadParams, Viewport,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::ScraperError;
use crate::traits::LookupDriver;

use super::types::ElementBox;

/// DOM構築完了待ちの上限（秒）
const DOM_READY_TIMEOUT_SECS: u64 = 30;
/// ネットワークアイドル待機のタイムアウト（ミリ秒）
const NETWORK_IDLE_TIMEOUT_MS: u64 = 30000;
/// ネットワークアイドル判定のインターバル（ミリ秒）
const NETWORK_IDLE_CHECK_INTERVAL_MS: u64 = 500;
/// 連続何回アイドルならOKとみなすか
const REQUIRED_IDLE_CHECKS: u32 = 3;

/// 照会ページを操作するブラウザセッション
pub struct TicaBrowser {
    browser: Browser,
    page: Arc<Page>,
}

impl TicaBrowser {
    /// ブラウザを起動して空ページを開く
    pub async fn launch(headless: bool) -> Result<Self, ScraperError> {
        info!("Initializing browser for TICA lookup...");

        // ユニークなユーザーデータディレクトリを生成
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("tica-scraper-{}", unique_id));

        // Chrome パスを取得
        let chrome_path = std::env::var("CHROME_PATH")
            .or_else(|_| std::env::var("CHROMIUM_PATH"))
            .unwrap_or_else(|_| "chromium".to_string());

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(&user_data_dir)
            .window_size(1280, 800)
            .no_sandbox()
            .request_timeout(Duration::from_secs(60))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if !headless {
            builder = builder.with_head();
        }

        let config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ブラウザイベントハンドラをバックグラウンドで実行
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        info!("Browser initialized");
        Ok(Self {
            browser,
            page: Arc::new(page),
        })
    }

    /// ブラウザを終了してセッションを解放する
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
    }

    /// document.readyState が complete になるまで待つ
    async fn wait_dom_ready(&self) -> Result<(), ScraperError> {
        for i in 0..DOM_READY_TIMEOUT_SECS {
            let ready_state = self
                .page
                .evaluate("document.readyState")
                .await
                .map_err(|e| ScraperError::JavaScript(e.to_string()))?;

            let state = ready_state.into_value::<String>().unwrap_or_default();
            if state == "complete" {
                return Ok(());
            }

            if i % 5 == 0 {
                debug!("Waiting for DOM... ({}/{}) state={}", i + 1, DOM_READY_TIMEOUT_SECS, state);
            }
            sleep(Duration::from_secs(1)).await;
        }

        warn!("DOM ready timeout, proceeding anyway");
        Ok(())
    }

    /// ネットワークリクエストがアイドル状態になるまで待機
    async fn wait_request_idle(&self) -> Result<(), ScraperError> {
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(NETWORK_IDLE_TIMEOUT_MS);
        let mut idle_count = 0;

        while start.elapsed() < timeout {
            let result = self
                .page
                .evaluate(
                    r#"
                    (() => {
                        const entries = performance.getEntriesByType('resource');
                        const now = performance.now();
                        const recent = entries.filter(e => {
                            return (now - e.startTime) < 500 && e.duration === 0;
                        });
                        return recent.length === 0;
                    })()
                "#,
                )
                .await;

            match result {
                Ok(val) => {
                    if val.into_value::<bool>().unwrap_or(false) {
                        idle_count += 1;
                        if idle_count >= REQUIRED_IDLE_CHECKS {
                            debug!("Network idle after {:?}", start.elapsed());
                            return Ok(());
                        }
                    } else {
                        idle_count = 0;
                    }
                }
                Err(e) => {
                    debug!("Network idle check error: {}", e);
                    idle_count = 0;
                }
            }

            sleep(Duration::from_millis(NETWORK_IDLE_CHECK_INTERVAL_MS)).await;
        }

        warn!("Network idle timeout after {:?}, proceeding anyway", start.elapsed());
        Ok(())
    }
}

#[async_trait]
impl LookupDriver for TicaBrowser {
    async fn goto(&self, url: &str) -> Result<(), ScraperError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        self.wait_dom_ready().await?;
        Ok(())
    }

    async fn reload(&self) -> Result<(), ScraperError> {
        self.page
            .execute(ReloadParams::default())
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        self.wait_dom_ready().await?;
        self.wait_request_idle().await?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), ScraperError> {
        self.page
            .find_element(selector)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("{}: {}", selector, e)))?
            .type_str(text)
            .await
            .map_err(|e| ScraperError::Navigation(format!("入力失敗 {}: {}", selector, e)))?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), ScraperError> {
        self.page
            .find_element(selector)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("{}: {}", selector, e)))?
            .click()
            .await
            .map_err(|e| ScraperError::Navigation(format!("クリック失敗 {}: {}", selector, e)))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ScraperError> {
        let result = self
            .page
            .evaluate("window.location.href")
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;
        result
            .into_value::<String>()
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }

    async fn element_box(&self, selector: &str) -> Result<Option<ElementBox>, ScraperError> {
        let script = format!(
            r#"
            (() => {{
                const el = document.querySelector("{}");
                if (!el) return null;
                const r = el.getBoundingClientRect();
                return {{ x: r.x, y: r.y, width: r.width, height: r.height }};
            }})()
        "#,
            selector
        );

        let result = self
            .page
            .evaluate(script.as_str())
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;
        result
            .into_value::<Option<ElementBox>>()
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }

    async fn screenshot_clip(&self, clip: &ElementBox) -> Result<Vec<u8>, ScraperError> {
        let viewport = Viewport {
            x: clip.x,
            y: clip.y,
            width: clip.width,
            height: clip.height,
            scale: 1.0,
        };
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .clip(viewport)
            .build();

        self.page
            .screenshot(params)
            .await
            .map_err(|e| ScraperError::JavaScript(format!("スクリーンショット失敗: {}", e)))
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>, ScraperError> {
        let script = format!(
            r#"
            (() => {{
                const el = document.querySelector("{}");
                return el ? el.textContent : null;
            }})()
        "#,
            selector
        );

        let result = self
            .page
            .evaluate(script.as_str())
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;
        result
            .into_value::<Option<String>>()
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }
}

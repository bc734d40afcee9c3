//! TICA照会スクレイパー本体
//!
//! ストア・ブラウザ・OCRの具象アダプタを束ね、initialize → run → close
//! のパイプラインでバッチ全体を処理する。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::TicaConfig;
use crate::error::ScraperError;
use crate::ocr::TesseractOcr;
use crate::store::{Record, XlsxStore};
use crate::traits::{CustomsLookup, OcrEngine, RecordStore};

use super::browser::TicaBrowser;
use super::captcha::CaptchaResolver;
use super::controller::BatchController;
use super::types::{RunContext, RunSummary};

pub struct TicaScraper {
    config: TicaConfig,
    store: XlsxStore,
    ocr: Arc<dyn OcrEngine>,
    browser: Option<TicaBrowser>,
    batch: Vec<Record>,
    ctx: RunContext,
}

impl TicaScraper {
    pub fn new(config: TicaConfig) -> Self {
        let ocr: Arc<dyn OcrEngine> = match &config.tesseract_path {
            Some(path) => Arc::new(TesseractOcr::with_binary(path)),
            None => Arc::new(TesseractOcr::new()),
        };
        Self {
            config,
            store: XlsxStore::new(),
            ocr,
            browser: None,
            batch: Vec::new(),
            ctx: RunContext::new(),
        }
    }

    /// 実行コンテキストを差し替える（割り込みハンドラと共有する用）
    pub fn with_context(mut self, ctx: RunContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn context(&self) -> RunContext {
        self.ctx
    }

    /// 実行サマリをファイルに保存（デバッグモード時のみ）
    fn save_summary(&self, summary: &RunSummary) {
        let timestamp = summary.started_at.format("%Y%m%d_%H%M%S");
        let filename = format!("./data/summary_{}.json", timestamp);

        if let Err(e) = std::fs::create_dir_all("./data") {
            warn!("Failed to create data directory: {}", e);
            return;
        }

        match serde_json::to_string_pretty(summary) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&filename, json) {
                    error!("Failed to save run summary: {}", e);
                } else {
                    info!("Saved run summary to {}", filename);
                }
            }
            Err(e) => error!("Failed to serialize run summary: {}", e),
        }
    }
}

#[async_trait]
impl CustomsLookup for TicaScraper {
    async fn initialize(&mut self) -> Result<(), ScraperError> {
        // ストアを先に読む。ここで失敗したらブラウザセッションは作らない
        let loaded = self
            .store
            .load(&self.config.store_path, self.config.resume_mode)?;
        match loaded.resume_row {
            Some(row) => info!(
                "Loaded {} records, resuming from row {}",
                loaded.records.len(),
                row
            ),
            None => info!("Loaded {} records, no resume point", loaded.records.len()),
        }
        self.batch = loaded.records;

        std::fs::create_dir_all(&self.config.screenshots_dir)?;

        self.browser = Some(TicaBrowser::launch(self.config.headless).await?);
        Ok(())
    }

    async fn run(&mut self) -> Result<RunSummary, ScraperError> {
        let browser = self.browser.as_ref().ok_or_else(|| {
            ScraperError::BrowserInit("ブラウザが初期化されていません".into())
        })?;

        let resolver = CaptchaResolver::new(
            self.ocr.clone(),
            &self.config.screenshots_dir,
            self.config.navigation_timeout,
            self.config.debug,
        );
        let controller =
            BatchController::new(browser, &self.store, &resolver, &self.config, self.ctx);
        let summary = controller.run(&self.batch).await?;

        if self.config.debug {
            self.save_summary(&summary);
        }
        Ok(summary)
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        if let Some(browser) = self.browser.take() {
            browser.shutdown().await;
        }
        info!("Browser session released");
        Ok(())
    }
}

/// 割り込み(Ctrl-C)と競争させながら最後まで実行する
///
/// 割り込み時は共有コンテキストから経過時間サマリをログに出して
/// `Ok(None)` を返す。ブラウザの後始末は行わない（プロセス終了に任せる）。
pub async fn run_to_completion(
    mut scraper: TicaScraper,
) -> Result<Option<RunSummary>, ScraperError> {
    let ctx = scraper.context();
    tokio::select! {
        result = scraper.execute() => result.map(Some),
        _ = tokio::signal::ctrl_c() => {
            info!(
                "Interrupted after {:?} (started at {})",
                ctx.elapsed(),
                ctx.started_at()
            );
            Ok(None)
        }
    }
}

//! テスト用モック（ドライバ / OCR / ストア）

use std::collections::VecDeque;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::ResumeMode;
use crate::error::ScraperError;
use crate::store::{LoadedBatch, LocationPatch};
use crate::traits::{LookupDriver, OcrEngine, RecordStore};

use super::types::{selectors, ElementBox};

/// 1回の送信クリックに対する応答シナリオ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockAttempt {
    /// ナビゲーション成立、結果スパンあり
    NavWithData,
    /// ナビゲーション成立、結果スパンなし
    NavNoData,
    /// URL変化なし
    NoNav,
}

/// シナリオ駆動の照会ページドライバ
pub struct MockDriver {
    plan: Mutex<VecDeque<MockAttempt>>,
    url_version: AtomicUsize,
    spans_present: AtomicBool,
    widget_present: AtomicBool,
    typed: Mutex<Vec<(String, String)>>,
    clicked: Mutex<Vec<String>>,
    gotos: Mutex<Vec<String>>,
    reloads: AtomicUsize,
}

impl MockDriver {
    pub fn new(plan: Vec<MockAttempt>) -> Self {
        Self {
            plan: Mutex::new(plan.into()),
            url_version: AtomicUsize::new(0),
            spans_present: AtomicBool::new(false),
            widget_present: AtomicBool::new(true),
            typed: Mutex::new(Vec::new()),
            clicked: Mutex::new(Vec::new()),
            gotos: Mutex::new(Vec::new()),
            reloads: AtomicUsize::new(0),
        }
    }

    pub fn remove_captcha_widget(&self) {
        self.widget_present.store(false, Ordering::SeqCst);
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.typed.lock().unwrap().clone()
    }

    pub fn clicked(&self) -> Vec<String> {
        self.clicked.lock().unwrap().clone()
    }

    pub fn gotos(&self) -> Vec<String> {
        self.gotos.lock().unwrap().clone()
    }

    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    /// 小さな有効PNG（前処理に通せる）
    fn tiny_png() -> Vec<u8> {
        let img = image::GrayImage::from_pixel(16, 8, image::Luma([128]));
        let mut out = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }
}

#[async_trait]
impl LookupDriver for MockDriver {
    async fn goto(&self, url: &str) -> Result<(), ScraperError> {
        self.gotos.lock().unwrap().push(url.to_string());
        self.spans_present.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn reload(&self) -> Result<(), ScraperError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        self.spans_present.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), ScraperError> {
        self.typed
            .lock()
            .unwrap()
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), ScraperError> {
        self.clicked.lock().unwrap().push(selector.to_string());

        if selector == selectors::SUBMIT_BUTTON {
            let next = self
                .plan
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(MockAttempt::NoNav);
            match next {
                MockAttempt::NavWithData => {
                    self.url_version.fetch_add(1, Ordering::SeqCst);
                    self.spans_present.store(true, Ordering::SeqCst);
                }
                MockAttempt::NavNoData => {
                    self.url_version.fetch_add(1, Ordering::SeqCst);
                    self.spans_present.store(false, Ordering::SeqCst);
                }
                MockAttempt::NoNav => {}
            }
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ScraperError> {
        Ok(format!(
            "https://mock.tica/page/{}",
            self.url_version.load(Ordering::SeqCst)
        ))
    }

    async fn element_box(&self, selector: &str) -> Result<Option<ElementBox>, ScraperError> {
        if selector == selectors::CAPTCHA_IMAGE && self.widget_present.load(Ordering::SeqCst) {
            Ok(Some(ElementBox {
                x: 10.0,
                y: 20.0,
                width: 160.0,
                height: 40.0,
            }))
        } else {
            Ok(None)
        }
    }

    async fn screenshot_clip(&self, _clip: &ElementBox) -> Result<Vec<u8>, ScraperError> {
        Ok(Self::tiny_png())
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>, ScraperError> {
        if !self.spans_present.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let text = match selector {
            selectors::SPAN_CODI_ALMA => "01",
            selectors::SPAN_DRSOCIAL => "ALMACEN CENTRAL",
            selectors::SPAN_CALMDEST => "02",
            selectors::SPAN_RGRSOC => "DEPOSITO FISCAL",
            _ => return Ok(None),
        };
        Ok(Some(text.to_string()))
    }
}

/// 固定応答のOCRエンジン
pub struct MockOcr {
    text: Option<String>,
    error: Option<String>,
    calls: AtomicUsize,
}

impl MockOcr {
    pub fn reading(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            error: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            text: None,
            error: Some(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for MockOcr {
    async fn recognize(&self, _image_path: &Path) -> Result<String, ScraperError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.error {
            Some(message) => Err(ScraperError::Ocr(message.clone())),
            None => Ok(self.text.clone().unwrap_or_default()),
        }
    }
}

/// 書き戻しを記録するだけのインメモリストア
pub struct MemoryStore {
    patches: Mutex<Vec<LocationPatch>>,
    fail_write: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            patches: Mutex::new(Vec::new()),
            fail_write: false,
        }
    }

    /// write_back が常に失敗するストア
    pub fn failing() -> Self {
        Self {
            patches: Mutex::new(Vec::new()),
            fail_write: true,
        }
    }

    pub fn patches(&self) -> Vec<LocationPatch> {
        self.patches.lock().unwrap().clone()
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, _path: &Path, _mode: ResumeMode) -> Result<LoadedBatch, ScraperError> {
        Ok(LoadedBatch {
            records: Vec::new(),
            resume_row: None,
        })
    }

    fn write_back(&self, _path: &Path, patch: &LocationPatch) -> Result<(), ScraperError> {
        if self.fail_write {
            return Err(ScraperError::StoreMalformed("書き込み失敗".into()));
        }
        self.patches.lock().unwrap().push(patch.clone());
        Ok(())
    }
}

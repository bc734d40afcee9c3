//! 1レコードの照会処理
//!
//! フォームにレコードの値を入力してから、CAPTCHA解決の試行を
//! リトライポリシーの範囲で繰り返す。両ロケーションが取得できたら
//! ストアへ書き戻して成功を返す。

use std::path::Path;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::RetryPolicy;
use crate::error::ScraperError;
use crate::store::{LocationPatch, Record};
use crate::traits::{LookupDriver, RecordStore};

use super::captcha::CaptchaResolver;
use super::types::{selectors, AttemptOutcome};

pub struct RecordProcessor<'a> {
    driver: &'a dyn LookupDriver,
    store: &'a dyn RecordStore,
    resolver: &'a CaptchaResolver,
    store_path: &'a Path,
    retry: &'a RetryPolicy,
}

impl<'a> RecordProcessor<'a> {
    pub fn new(
        driver: &'a dyn LookupDriver,
        store: &'a dyn RecordStore,
        resolver: &'a CaptchaResolver,
        store_path: &'a Path,
        retry: &'a RetryPolicy,
    ) -> Self {
        Self {
            driver,
            store,
            resolver,
            store_path,
            retry,
        }
    }

    /// レコード1件を処理する
    ///
    /// 成功で `Ok(true)`、ポリシー上限で打ち切ったら `Ok(false)`。
    /// ドライバ/ストアの例外は呼び出し側（バッチ側）へ伝播する。
    pub async fn process(&self, record: &Record) -> Result<bool, ScraperError> {
        self.driver
            .type_text(selectors::FIELD_ADUANA, record.aduana())
            .await?;
        self.driver
            .type_text(selectors::FIELD_ANO, record.ano())
            .await?;
        self.driver
            .type_text(selectors::FIELD_NUMERO, record.numero())
            .await?;

        info!("Aduana: {}", record.aduana());
        info!("Año: {}", record.ano());
        info!("Numero: {}", record.numero());

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            if !self.retry.allows(attempt) {
                warn!(
                    "Attempt limit reached for Numero {} after {} attempts",
                    record.numero(),
                    attempt - 1
                );
                return Ok(false);
            }

            let outcome = self.attempt_once(record).await?;
            info!("Attempt {} outcome: {}", attempt, outcome);

            if outcome == AttemptOutcome::Advanced {
                return Ok(true);
            }

            // 不成立時はページを完全リロードして一呼吸置く
            info!("Refreshing page...");
            self.driver.reload().await?;
            sleep(self.retry.delay).await;
        }
    }

    async fn attempt_once(&self, record: &Record) -> Result<AttemptOutcome, ScraperError> {
        let navigated = match self.resolver.attempt(self.driver).await {
            Ok(navigated) => navigated,
            // この2つだけは失敗試行と等価に扱う契約
            Err(ScraperError::CaptchaWidgetMissing) => {
                warn!("Captcha widget missing, treating attempt as failed");
                return Ok(AttemptOutcome::CaptchaRejected);
            }
            Err(ScraperError::CaptchaUnreadable(reason)) => {
                warn!("Captcha unreadable: {}", reason);
                return Ok(AttemptOutcome::CaptchaRejected);
            }
            Err(e) => return Err(e),
        };

        if !navigated {
            return Ok(AttemptOutcome::TimedOut);
        }

        match self.extract_locations().await? {
            Some((actual, destino)) => {
                info!("Localización Actual: {}", actual);
                info!("Localización Destino: {}", destino);

                let patch = LocationPatch {
                    numero: record.numero().to_string(),
                    localizacion_actual: actual,
                    localizacion_destino: destino,
                };
                // ストアエラーは致命としてそのまま伝播
                self.store.write_back(self.store_path, &patch)?;
                Ok(AttemptOutcome::Advanced)
            }
            None => {
                info!("No data found on the page");
                Ok(AttemptOutcome::NoData)
            }
        }
    }

    /// 結果ページのスパン2組からロケーションを組み立てる
    async fn extract_locations(&self) -> Result<Option<(String, String)>, ScraperError> {
        let actual = self
            .join_spans(selectors::SPAN_CODI_ALMA, selectors::SPAN_DRSOCIAL)
            .await?;
        let destino = self
            .join_spans(selectors::SPAN_CALMDEST, selectors::SPAN_RGRSOC)
            .await?;
        Ok(actual.zip(destino))
    }

    /// コードと名称のスパンを "-" で連結する（どちらか欠けたら None）
    async fn join_spans(
        &self,
        code_selector: &str,
        desc_selector: &str,
    ) -> Result<Option<String>, ScraperError> {
        let code = self.driver.text_content(code_selector).await?;
        let desc = self.driver.text_content(desc_selector).await?;
        Ok(match (code, desc) {
            (Some(code), Some(desc)) => Some(format!("{}-{}", code, desc)),
            _ => None,
        })
    }
}

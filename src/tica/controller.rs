//! バッチコントローラ
//!
//! 作業バッチをインデックス順に処理する。失敗したレコードは
//! 同じインデックスのまま再試行し、成功するまで次へ進まない。

use tracing::{error, info, warn};

use crate::config::TicaConfig;
use crate::error::ScraperError;
use crate::store::Record;
use crate::traits::{LookupDriver, RecordStore};

use super::captcha::CaptchaResolver;
use super::processor::RecordProcessor;
use super::types::{RunContext, RunSummary};

pub struct BatchController<'a> {
    driver: &'a dyn LookupDriver,
    store: &'a dyn RecordStore,
    resolver: &'a CaptchaResolver,
    config: &'a TicaConfig,
    ctx: RunContext,
}

impl<'a> BatchController<'a> {
    pub fn new(
        driver: &'a dyn LookupDriver,
        store: &'a dyn RecordStore,
        resolver: &'a CaptchaResolver,
        config: &'a TicaConfig,
        ctx: RunContext,
    ) -> Self {
        Self {
            driver,
            store,
            resolver,
            config,
            ctx,
        }
    }

    pub async fn run(&self, batch: &[Record]) -> Result<RunSummary, ScraperError> {
        let total = batch.len();
        let mut processed = 0usize;
        let mut retries = 0usize;
        let mut index = 0usize;

        while index < total {
            let record = &batch[index];
            info!(
                "Processing record {} of {} (Numero: {})",
                index + 1,
                total,
                record.numero()
            );

            match self.process_record(record).await {
                Ok(true) => {
                    info!("Record {} processed successfully", index + 1);
                    processed += 1;
                    index += 1;
                }
                Ok(false) => {
                    // 同じインデックスのまま再試行
                    warn!("Record {} failed to process, retrying...", index + 1);
                    retries += 1;
                }
                Err(e) if e.is_recoverable() => {
                    error!("Error during record {}: {}, retrying...", index + 1, e);
                    retries += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let summary = RunSummary {
            records_processed: processed,
            retries,
            elapsed: self.ctx.elapsed(),
            started_at: self.ctx.started_at(),
        };
        info!(
            "All data processed: {} records in {:?} ({} batch retries)",
            summary.records_processed, summary.elapsed, summary.retries
        );
        Ok(summary)
    }

    /// 入力ページへ遷移してから1レコードを処理する
    async fn process_record(&self, record: &Record) -> Result<bool, ScraperError> {
        self.driver.goto(&self.config.lookup_url).await?;

        let processor = RecordProcessor::new(
            self.driver,
            self.store,
            self.resolver,
            &self.config.store_path,
            &self.config.retry,
        );
        processor.process(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::RetryPolicy;
    use crate::store::Record;
    use crate::tica::mock::{MemoryStore, MockAttempt, MockDriver, MockOcr};

    fn record(numero: &str) -> Record {
        Record::from_pairs([
            ("Aduana", "001".to_string()),
            ("Año", "2024".to_string()),
            ("Numero", numero.to_string()),
        ])
    }

    fn fast_config() -> TicaConfig {
        TicaConfig::new("Penta.xlsx")
            .with_navigation_timeout(Duration::from_millis(50))
            .with_retry(RetryPolicy::unbounded().with_delay(Duration::from_millis(1)))
    }

    struct Fixture {
        store: MemoryStore,
        resolver: CaptchaResolver,
        config: TicaConfig,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = fast_config();
        let resolver = CaptchaResolver::new(
            Arc::new(MockOcr::reading("abc123")),
            dir.path(),
            config.navigation_timeout,
            false,
        );
        Fixture {
            store: MemoryStore::new(),
            resolver,
            config,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_all_records_succeed_first_attempt() {
        // 3件とも1回目のCAPTCHAで成功するケース
        let f = fixture();
        let driver = MockDriver::new(vec![
            MockAttempt::NavWithData,
            MockAttempt::NavWithData,
            MockAttempt::NavWithData,
        ]);
        let controller = BatchController::new(
            &driver,
            &f.store,
            &f.resolver,
            &f.config,
            RunContext::new(),
        );

        let batch = [record("1"), record("2"), record("3")];
        let summary = controller.run(&batch).await.unwrap();

        assert_eq!(summary.records_processed, 3);
        assert_eq!(summary.retries, 0);
        assert_eq!(driver.reload_count(), 0);

        // 元の順序どおりに書き戻されている
        let numeros: Vec<String> = f.store.patches().into_iter().map(|p| p.numero).collect();
        assert_eq!(numeros, vec!["1", "2", "3"]);

        // レコードごとに入力ページへ遷移している
        assert_eq!(driver.gotos().len(), 3);
    }

    #[tokio::test]
    async fn test_record_retried_until_success_before_advancing() {
        // 2件目の最初の2試行はナビゲーション不成立、3回目で成功するケース
        let f = fixture();
        let driver = MockDriver::new(vec![
            MockAttempt::NavWithData, // record 1
            MockAttempt::NoNav,       // record 2, attempt 1
            MockAttempt::NoNav,       // record 2, attempt 2
            MockAttempt::NavWithData, // record 2, attempt 3
            MockAttempt::NavWithData, // record 3
        ]);
        let controller = BatchController::new(
            &driver,
            &f.store,
            &f.resolver,
            &f.config,
            RunContext::new(),
        );

        let batch = [record("1"), record("2"), record("3")];
        let summary = controller.run(&batch).await.unwrap();

        assert_eq!(summary.records_processed, 3);
        // 処理側の無制限リトライ内で解決するのでバッチレベルの再試行はゼロ
        assert_eq!(summary.retries, 0);
        // 2件目の失敗2回分だけリロードされている
        assert_eq!(driver.reload_count(), 2);

        // 2件目が成功するまで3件目に進んでいない
        let numeros: Vec<String> = f.store.patches().into_iter().map(|p| p.numero).collect();
        assert_eq!(numeros, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_processor_failure_retries_same_record_at_batch_level() {
        // 上限付きポリシーで処理が false を返しても、バッチ側が同じ
        // レコードを再試行して最終的に完走する
        let dir = tempfile::tempdir().unwrap();
        let config = fast_config().with_retry(
            RetryPolicy::bounded(1).with_delay(Duration::from_millis(1)),
        );
        let resolver = CaptchaResolver::new(
            Arc::new(MockOcr::reading("abc123")),
            dir.path(),
            config.navigation_timeout,
            false,
        );
        let store = MemoryStore::new();
        let driver = MockDriver::new(vec![
            MockAttempt::NoNav,       // record 1, pass 1 → processor gives up
            MockAttempt::NavWithData, // record 1, pass 2 → success
        ]);
        let controller =
            BatchController::new(&driver, &store, &resolver, &config, RunContext::new());

        let batch = [record("1")];
        let summary = controller.run(&batch).await.unwrap();

        assert_eq!(summary.records_processed, 1);
        assert_eq!(summary.retries, 1);
        // バッチ再試行のたびに入力ページへ遷移し直す
        assert_eq!(driver.gotos().len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_terminates_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = fast_config();
        let resolver = CaptchaResolver::new(
            Arc::new(MockOcr::reading("abc123")),
            dir.path(),
            config.navigation_timeout,
            false,
        );
        let store = MemoryStore::failing();
        let driver = MockDriver::new(vec![MockAttempt::NavWithData]);
        let controller =
            BatchController::new(&driver, &store, &resolver, &config, RunContext::new());

        let batch = [record("1")];
        let err = controller.run(&batch).await.unwrap_err();
        assert!(matches!(err, ScraperError::StoreMalformed(_)));
    }

    #[tokio::test]
    async fn test_empty_batch_completes_immediately() {
        let f = fixture();
        let driver = MockDriver::new(vec![]);
        let controller = BatchController::new(
            &driver,
            &f.store,
            &f.resolver,
            &f.config,
            RunContext::new(),
        );

        let summary = controller.run(&[]).await.unwrap();
        assert_eq!(summary.records_processed, 0);
        assert_eq!(summary.retries, 0);
        assert!(driver.gotos().is_empty());
    }
}

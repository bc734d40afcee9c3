use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::info;

use crate::config::{TicaConfig, TICA_LOOKUP_URL};
use crate::error::ScraperError;
use crate::tica::{RunSummary, TicaScraper};
use crate::traits::CustomsLookup;

/// 照会リクエスト
#[derive(Debug, Clone)]
pub struct LookupRequest {
    pub store_path: PathBuf,
    pub lookup_url: String,
    pub headless: bool,
    pub debug: bool,
}

impl LookupRequest {
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            lookup_url: TICA_LOOKUP_URL.to_string(),
            headless: true,
            debug: false,
        }
    }

    pub fn with_lookup_url(mut self, url: impl Into<String>) -> Self {
        self.lookup_url = url.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl From<LookupRequest> for TicaConfig {
    fn from(req: LookupRequest) -> Self {
        TicaConfig::new(req.store_path)
            .with_lookup_url(req.lookup_url)
            .with_headless(req.headless)
            .with_debug(req.debug)
    }
}

/// 照会結果
#[derive(Debug, Clone)]
pub struct LookupResult {
    pub summary: RunSummary,
}

/// tower::Serviceを実装したスクレイパーサービス
#[derive(Debug, Clone, Default)]
pub struct ScraperService {
    // 将来的な拡張用（レートリミット、キャッシュなど）
}

impl ScraperService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<LookupRequest> for ScraperService {
    type Response = LookupResult;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: LookupRequest) -> Self::Future {
        info!("Lookup request received: store={:?}", req.store_path);

        Box::pin(async move {
            let config: TicaConfig = req.into();
            let mut scraper = TicaScraper::new(config);

            let summary = scraper.execute().await?;

            info!(
                "Lookup finished: {} records in {:?}",
                summary.records_processed, summary.elapsed
            );

            Ok(LookupResult { summary })
        })
    }
}

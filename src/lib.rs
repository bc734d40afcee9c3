//! TICA通関照会スクレイパーライブラリ
//!
//! - XLSXワークブックから通関申告レコードを読み込み
//! - 照会ポータルのCAPTCHAをOCRで突破してロケーション2欄を取得
//! - 取得結果を同じワークブックへ書き戻す
//!
//! 未完了の先頭レコードから再開し、レコードごとに成功するまで
//! リトライする。中断(Ctrl-C)時は経過時間サマリを出して終了する。
//!
//! # 使用例
//!
//! ```rust,ignore
//! use tica_scraper::{run_to_completion, TicaConfig, TicaScraper};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TicaConfig::new("Penta.xlsx").with_headless(true);
//!     let scraper = TicaScraper::new(config);
//!
//!     match run_to_completion(scraper).await.unwrap() {
//!         Some(summary) => println!("Processed {} records", summary.records_processed),
//!         None => println!("Interrupted"),
//!     }
//! }
//! ```
//!
//! # tower Service としての使用例
//!
//! ```rust,ignore
//! use tica_scraper::{LookupRequest, ScraperService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ScraperService::new();
//!     let request = LookupRequest::new("Penta.xlsx").with_headless(true);
//!     let result = service.call(request).await.unwrap();
//!     println!("Elapsed: {:?}", result.summary.elapsed);
//! }
//! ```

pub mod config;
pub mod error;
pub mod ocr;
pub mod service;
pub mod store;
pub mod tica;
pub mod traits;

// 主要な型をリエクスポート
pub use config::{ResumeMode, RetryPolicy, TicaConfig, TICA_LOOKUP_URL};
pub use error::ScraperError;
pub use service::{LookupRequest, LookupResult, ScraperService};
pub use store::{LoadedBatch, LocationPatch, Record, XlsxStore};
pub use tica::{
    run_to_completion, AttemptOutcome, BatchController, CaptchaResolver, RecordProcessor,
    RunContext, RunSummary, TicaBrowser, TicaScraper,
};
pub use traits::{CustomsLookup, LookupDriver, OcrEngine, RecordStore};

//! TICA照会モジュール
//!
//! 照会ポータルをブラウザで操作し、CAPTCHAをOCRで突破して
//! ロケーション2欄を取得する

mod browser;
mod captcha;
mod controller;
mod processor;
mod scraper;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use browser::TicaBrowser;
pub use captcha::CaptchaResolver;
pub use controller::BatchController;
pub use processor::RecordProcessor;
pub use scraper::{run_to_completion, TicaScraper};
pub use types::{AttemptOutcome, ElementBox, RunContext, RunSummary};

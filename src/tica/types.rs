//! TICA照会関連の型定義

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 照会ページのセレクタ
pub mod selectors {
    pub const CAPTCHA_IMAGE: &str = "#captchaImage img";
    pub const CAPTCHA_INPUT: &str = "#_cfield";
    pub const SUBMIT_BUTTON: &str = "input[name='DETALLE']";

    pub const FIELD_ADUANA: &str = "#vVCODI_ADUA";
    pub const FIELD_ANO: &str = "#vVANO_PRE";
    pub const FIELD_NUMERO: &str = "#vVNUME_CORR";

    /// Localización Actual のコード/名称スパン
    pub const SPAN_CODI_ALMA: &str = "#span_CODI_ALMA";
    pub const SPAN_DRSOCIAL: &str = "#span_vVDRSOCIAL";
    /// Localización Destino のコード/名称スパン
    pub const SPAN_CALMDEST: &str = "#span_vVCALMDEST";
    pub const SPAN_RGRSOC: &str = "#span_vVRGRSOC";
}

/// ページ上の要素のバウンディングボックス（CSSピクセル）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// 1試行の結末
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// ナビゲーション成立、対象フィールドも取得できた
    Advanced,
    /// ナビゲーションは成立したが結果フィールドがない
    NoData,
    /// CAPTCHAウィジェット欠落・OCR不能などで送信に至らなかった
    CaptchaRejected,
    /// 送信後、制限時間内にURLが変化しなかった
    TimedOut,
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AttemptOutcome::Advanced => "advanced",
            AttemptOutcome::NoData => "no-data",
            AttemptOutcome::CaptchaRejected => "captcha-rejected",
            AttemptOutcome::TimedOut => "timed-out",
        };
        f.write_str(label)
    }
}

/// 実行コンテキスト
///
/// 開始時刻を保持し、正常終了パスと割り込みハンドラの両方から参照される。
/// プロセスグローバルは使わない。
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    started: Instant,
    started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// バッチ実行のサマリ
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// 書き戻しまで完了したレコード数
    pub records_processed: usize,
    /// バッチレベルで同一レコードを再試行した回数
    pub retries: usize,
    /// 実行開始からの経過時間
    pub elapsed: Duration,
    /// 実行開始時刻（壁時計）
    pub started_at: DateTime<Utc>,
}

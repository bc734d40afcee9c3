use std::path::PathBuf;
use std::time::Duration;

/// TICA照会ポータルの入力ページURL
pub const TICA_LOOKUP_URL: &str = "https://ticaconsultas.hacienda.go.cr/Tica/hcimppon.aspx";

/// 再開位置の判定ポリシー
///
/// 「未完了」レコードの定義が運用上2通りあるため、明示的に選択させる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeMode {
    /// どちらか一方でもロケーション欄が空なら未完了（デフォルト）
    #[default]
    EitherEmpty,
    /// 両方のロケーション欄が空の場合のみ未完了
    BothEmpty,
}

/// レコード処理のリトライポリシー
///
/// `max_attempts: None` は成功するまで無制限に試行する。
/// `delay` はリロード後の安定待ちを兼ねる。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// 無制限リトライ（デフォルトと同じ）
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// 試行回数に上限を設ける
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 次の試行が許可されるか（attemptは1始まり）
    pub fn allows(&self, attempt: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt <= max,
            None => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TicaConfig {
    /// レコードストア（XLSXワークブック）のパス
    pub store_path: PathBuf,
    /// 照会ポータルの入力ページURL
    pub lookup_url: String,
    /// CAPTCHAスクリーンショットの保存先
    pub screenshots_dir: PathBuf,
    /// tesseractバイナリのパス（Noneなら環境変数 → "tesseract"）
    pub tesseract_path: Option<PathBuf>,
    /// ヘッドレスモード
    pub headless: bool,
    /// デバッグモード（処理済みCAPTCHA画像をbase64でログ出力）
    pub debug: bool,
    /// 送信後のURL変化を待つ上限
    pub navigation_timeout: Duration,
    pub resume_mode: ResumeMode,
    pub retry: RetryPolicy,
}

impl Default for TicaConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("Penta.xlsx"),
            lookup_url: TICA_LOOKUP_URL.to_string(),
            screenshots_dir: PathBuf::from("./screenshots"),
            tesseract_path: None,
            headless: true,
            debug: false,
            navigation_timeout: Duration::from_secs(5),
            resume_mode: ResumeMode::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl TicaConfig {
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            ..Default::default()
        }
    }

    pub fn with_lookup_url(mut self, url: impl Into<String>) -> Self {
        self.lookup_url = url.into();
        self
    }

    pub fn with_screenshots_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshots_dir = dir.into();
        self
    }

    pub fn with_tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tesseract_path = Some(path.into());
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

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_resume_mode(mut self, mode: ResumeMode) -> Self {
        self.resume_mode = mode;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

use std::path::Path;

use async_trait::async_trait;

use crate::config::ResumeMode;
use crate::error::ScraperError;
use crate::store::{LoadedBatch, LocationPatch};
use crate::tica::types::{ElementBox, RunSummary};

/// 照会処理全体のパイプライン
#[async_trait]
pub trait CustomsLookup: Send + Sync {
    /// ストア読み込み + ブラウザ初期化
    ///
    /// ストアの失敗はブラウザセッション生成前に返ること。
    async fn initialize(&mut self) -> Result<(), ScraperError>;

    /// バッチ全件を処理
    async fn run(&mut self) -> Result<RunSummary, ScraperError>;

    /// リソース解放
    async fn close(&mut self) -> Result<(), ScraperError>;

    /// 一括実行（initialize → run → close）
    async fn execute(&mut self) -> Result<RunSummary, ScraperError> {
        self.initialize().await?;
        let summary = self.run().await?;
        self.close().await?;
        Ok(summary)
    }
}

/// ブラウザドライバ能力
///
/// 照会ページに対する操作を抽象化する。実装は chromiumoxide だが、
/// コアはこのトレイト越しにのみページへ触る。
#[async_trait]
pub trait LookupDriver: Send + Sync {
    /// 指定URLへ遷移する
    async fn goto(&self, url: &str) -> Result<(), ScraperError>;

    /// ページを完全リロードする（ネットワークアイドル + DOM構築完了まで待つ）
    async fn reload(&self) -> Result<(), ScraperError>;

    /// セレクタの要素に文字列をタイプする
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), ScraperError>;

    /// セレクタの要素をクリックする
    async fn click(&self, selector: &str) -> Result<(), ScraperError>;

    /// 現在のページURL
    async fn current_url(&self) -> Result<String, ScraperError>;

    /// 要素のバウンディングボックス（要素がなければ None）
    async fn element_box(&self, selector: &str) -> Result<Option<ElementBox>, ScraperError>;

    /// 指定範囲を切り抜いたスクリーンショット（PNG）
    async fn screenshot_clip(&self, clip: &ElementBox) -> Result<Vec<u8>, ScraperError>;

    /// 要素のテキスト内容（要素がなければ None）
    async fn text_content(&self, selector: &str) -> Result<Option<String>, ScraperError>;
}

/// OCRエンジン能力（画像ファイル → テキスト）
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image_path: &Path) -> Result<String, ScraperError>;
}

/// レコードストア能力
///
/// ワークブックI/OはブロッキングのファイルワークなのでSyncなAPIのまま。
pub trait RecordStore: Send + Sync {
    /// 全件を読み込み、再開位置まで切り詰めた作業バッチを返す
    fn load(&self, path: &Path, mode: ResumeMode) -> Result<LoadedBatch, ScraperError>;

    /// キー一致行に対象2列をマージしてワークブック全体を書き直す
    fn write_back(&self, path: &Path, patch: &LocationPatch) -> Result<(), ScraperError>;
}

//! レコードストアモジュール
//!
//! 通関申告レコードをXLSXワークブックから読み込み、照会結果を書き戻す

mod types;
mod xlsx;

pub use types::{
    LoadedBatch, LocationPatch, Record, FIELD_NAMES, KEY_FIELD, TARGET_ACTUAL, TARGET_DESTINO,
};
pub use xlsx::XlsxStore;

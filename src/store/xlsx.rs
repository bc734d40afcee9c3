//! XLSXワークブックのレコードストア実装
//!
//! 読み込みは calamine、書き戻しは rust_xlsxwriter。書き戻しは毎回
//! ワークブック全体を読み直してからマージし、全体を書き直す。

use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use tracing::{info, warn};

use crate::config::ResumeMode;
use crate::error::ScraperError;
use crate::traits::RecordStore;

use super::types::{LoadedBatch, LocationPatch, Record, FIELD_NAMES, TARGET_ACTUAL, TARGET_DESTINO};

/// XLSXストアアダプタ
#[derive(Debug, Clone, Default)]
pub struct XlsxStore;

impl XlsxStore {
    pub fn new() -> Self {
        Self
    }
}

/// セル値を文字列に正規化する
///
/// 数値セルは整数値なら小数点なしで出力する（Numero等が "123.0" に
/// ならないように）。
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// ワークブック全体をレコード列として読み込む
fn read_all(path: &Path) -> Result<Vec<Record>, ScraperError> {
    if !path.exists() {
        return Err(ScraperError::StoreNotFound(path.to_path_buf()));
    }

    let mut workbook: Xlsx<std::io::BufReader<std::fs::File>> =
        open_workbook(path).map_err(|e: calamine::XlsxError| ScraperError::StoreMalformed(e.to_string()))?;

    // 先頭シートのみ対象
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ScraperError::StoreMalformed("シートがありません".into()))?
        .map_err(|e| ScraperError::StoreMalformed(e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(cell_to_string).collect(),
        None => return Ok(Vec::new()),
    };

    let records = rows
        .map(|row| {
            Record::from_pairs(
                headers
                    .iter()
                    .zip(row.iter())
                    .map(|(name, cell)| (name.as_str(), cell_to_string(cell))),
            )
        })
        .collect();

    Ok(records)
}

/// レコード列をワークブックとして書き直す（ヘッダ + 全行、正規の列順）
fn write_all(path: &Path, records: &[Record]) -> Result<(), ScraperError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in FIELD_NAMES.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *name)
            .map_err(|e| ScraperError::StoreMalformed(e.to_string()))?;
    }

    for (i, record) in records.iter().enumerate() {
        for (col, name) in FIELD_NAMES.iter().enumerate() {
            let value = record.get(name);
            if !value.is_empty() {
                worksheet
                    .write_string((i + 1) as u32, col as u16, value)
                    .map_err(|e| ScraperError::StoreMalformed(e.to_string()))?;
            }
        }
    }

    workbook
        .save(path)
        .map_err(|e| ScraperError::StoreMalformed(e.to_string()))?;

    Ok(())
}

impl RecordStore for XlsxStore {
    fn load(&self, path: &Path, mode: ResumeMode) -> Result<LoadedBatch, ScraperError> {
        let records = read_all(path)?;

        match records.iter().position(|r| r.is_incomplete(mode)) {
            Some(idx) => {
                // ヘッダ行の分を加えた元ワークブック上の行番号
                let resume_row = idx + 2;
                info!(
                    "First incomplete record at row {} (Numero: {})",
                    resume_row,
                    records[idx].numero()
                );
                Ok(LoadedBatch {
                    records: records[idx..].to_vec(),
                    resume_row: Some(resume_row),
                })
            }
            None => {
                info!("All records are complete");
                Ok(LoadedBatch {
                    records,
                    resume_row: None,
                })
            }
        }
    }

    fn write_back(&self, path: &Path, patch: &LocationPatch) -> Result<(), ScraperError> {
        if !path.exists() {
            return Err(ScraperError::StoreNotFound(path.to_path_buf()));
        }

        // メモリ上のバッチは使わず、必ず読み直してからマージする
        let mut records = read_all(path)?;

        match records.iter_mut().find(|r| r.numero() == patch.numero) {
            Some(row) => {
                row.set(TARGET_ACTUAL, patch.localizacion_actual.clone());
                row.set(TARGET_DESTINO, patch.localizacion_destino.clone());
            }
            None => {
                warn!("No row with Numero {} found, nothing merged", patch.numero);
            }
        }

        write_all(path, &records)
    }
}

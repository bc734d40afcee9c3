//! レコードストア関連の型定義

use std::collections::HashMap;

use serde::Serialize;

use crate::config::ResumeMode;

/// ワークブックの列名（この順序で書き戻す）
pub const FIELD_NAMES: [&str; 31] = [
    "Aduana",
    "Año",
    "Numero",
    "Item",
    "Fecha",
    "Aduana_1",
    "Regimen",
    "Modalidad",
    "Importador",
    "Marca",
    "Modelo",
    "Factura",
    "Código SAC",
    "Vía Transporte",
    "País de Origen",
    "Pais de Procedencia",
    "Pais de Adquisición",
    "Cantidad Comercial",
    "Unidad de Medida",
    "Bultos",
    "U$S FOB",
    "U$S FOB, Unit.",
    "U$S Flete",
    "U$S Seguro",
    "U$S CIF",
    "U$S Unitario",
    "KGS. Netos",
    "Kgs. Brutos",
    "Descripción de Mercadería",
    "Localización Actual",
    "Localización Destino",
];

/// 行を特定するキー列
pub const KEY_FIELD: &str = "Numero";
/// 照会結果を書き込む2列
pub const TARGET_ACTUAL: &str = "Localización Actual";
pub const TARGET_DESTINO: &str = "Localización Destino";

/// 通関申告1行分のレコード
///
/// 全列を文字列に正規化して保持する。欠損セルは空文字になり、
/// キー集合は常に `FIELD_NAMES` 全体と一致する。
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    /// 全列を空文字で初期化したレコード
    pub fn empty() -> Self {
        let fields = FIELD_NAMES
            .iter()
            .map(|name| (name.to_string(), String::new()))
            .collect();
        Self { fields }
    }

    /// (列名, 値) の列からレコードを構築する
    ///
    /// 既知の列のみ取り込み、欠けている列は空文字で補う。
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, String)>) -> Self {
        let mut record = Self::empty();
        for (name, value) in pairs {
            if record.fields.contains_key(name) {
                record.fields.insert(name.to_string(), value);
            }
        }
        record
    }

    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        if self.fields.contains_key(name) {
            self.fields.insert(name.to_string(), value.into());
        }
    }

    pub fn aduana(&self) -> &str {
        self.get("Aduana")
    }

    pub fn ano(&self) -> &str {
        self.get("Año")
    }

    pub fn numero(&self) -> &str {
        self.get(KEY_FIELD)
    }

    pub fn localizacion_actual(&self) -> &str {
        self.get(TARGET_ACTUAL)
    }

    pub fn localizacion_destino(&self) -> &str {
        self.get(TARGET_DESTINO)
    }

    /// 再開ポリシーに照らして未完了か
    pub fn is_incomplete(&self, mode: ResumeMode) -> bool {
        let actual = self.localizacion_actual().is_empty();
        let destino = self.localizacion_destino().is_empty();
        match mode {
            ResumeMode::EitherEmpty => actual || destino,
            ResumeMode::BothEmpty => actual && destino,
        }
    }
}

/// 照会成功時に書き戻すパッチ（キー + 対象2列のみ）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationPatch {
    pub numero: String,
    pub localizacion_actual: String,
    pub localizacion_destino: String,
}

/// ロード結果
///
/// `records` は再開位置まで切り詰め済みの作業バッチ。`resume_row` は
/// 元ワークブック上の1始まり行番号（ヘッダ行分を加味、ログ用）。
/// 全レコード完了済みの場合は `resume_row: None` で全件を返す。
#[derive(Debug)]
pub struct LoadedBatch {
    pub records: Vec<Record>,
    pub resume_row: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_has_all_fields() {
        let record = Record::empty();
        for name in FIELD_NAMES {
            assert_eq!(record.get(name), "");
        }
    }

    #[test]
    fn test_from_pairs_ignores_unknown_columns() {
        let record = Record::from_pairs([
            ("Aduana", "001".to_string()),
            ("Columna Fantasma", "x".to_string()),
        ]);
        assert_eq!(record.aduana(), "001");
        assert_eq!(record.get("Columna Fantasma"), "");
    }

    #[test]
    fn test_is_incomplete_modes() {
        let mut record = Record::empty();
        record.set(TARGET_ACTUAL, "01-ALMACEN");

        // 片方のみ埋まっている行
        assert!(record.is_incomplete(ResumeMode::EitherEmpty));
        assert!(!record.is_incomplete(ResumeMode::BothEmpty));

        record.set(TARGET_DESTINO, "02-DEPOSITO");
        assert!(!record.is_incomplete(ResumeMode::EitherEmpty));
        assert!(!record.is_incomplete(ResumeMode::BothEmpty));
    }

    #[test]
    fn test_set_ignores_unknown_field() {
        let mut record = Record::empty();
        record.set("No Existe", "x");
        assert_eq!(record.get("No Existe"), "");
    }
}

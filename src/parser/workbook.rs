//! Workbook Parser
//!
//! calamineを使用してシートのセル値と結合範囲を読み込み、
//! XMLメタデータ（数値書式、非表示行/列、1904年エポック）と組み合わせます。

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets, Xlsx};
use std::io::Cursor;

use crate::api::SheetSelector;
use crate::builder::ConversionConfig;
use crate::error::XlsxToHtmlError;
use crate::formatter::excel_serial_to_datetime;
use crate::parser::XlsxMetadataParser;
use crate::types::{CellCoord, CellRange, CellValue, MergedRegion, RawCellData, SheetMetadata};

/// ワークブックパーサー
///
/// calamineのラッパーとして、ワークブックレベルの操作を提供します。
pub(crate) struct WorkbookParser {
    /// calamineのワークブック（XLSX形式のみサポート）
    workbook: Xlsx<Cursor<Vec<u8>>>,
    /// XMLメタデータ
    metadata: XlsxMetadataParser,
}

impl WorkbookParser {
    /// ワークブックを開き、XMLメタデータも解析する
    ///
    /// メタデータの解析でアーカイブのセキュリティ検証を先に行うため、
    /// 制限違反はcalamineの解析エラーより優先して報告されます。
    ///
    /// # 引数
    ///
    /// * `buffer` - XLSXファイルのバイト列
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - ワークブックとメタデータの読み込みに成功した場合
    /// * `Err(XlsxToHtmlError)` - エラーが発生した場合
    pub fn open_with_metadata(buffer: &[u8]) -> Result<Self, XlsxToHtmlError> {
        let metadata = XlsxMetadataParser::new(Cursor::new(buffer))?;
        Self::open_with_existing_metadata(buffer, metadata)
    }

    /// ワークブックを開き、既存のメタデータを再利用する（並列処理用）
    pub fn open_with_existing_metadata(
        buffer: &[u8],
        metadata: XlsxMetadataParser,
    ) -> Result<Self, XlsxToHtmlError> {
        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer.to_vec()))
            .map_err(XlsxToHtmlError::Parse)?;
        let workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(XlsxToHtmlError::Config(
                    "Only XLSX format is supported".to_string(),
                ))
            }
        };

        Ok(WorkbookParser { workbook, metadata })
    }

    /// すべてのシート名を取得（ワークブック内の定義順）
    pub fn get_sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    /// メタデータを取得（並列処理での再利用用）
    pub fn metadata(&self) -> &XlsxMetadataParser {
        &self.metadata
    }

    /// シート選択方式に基づいてシートを選択
    ///
    /// `SheetSelector::All` の場合のみ、非表示シートと除外リストのシートを取り除きます。
    /// 名前やインデックスで明示的に指定されたシートはそのまま変換対象になります。
    ///
    /// # 引数
    ///
    /// * `selector` - シート選択方式
    /// * `include_hidden` - 非表示シートを含めるかどうか
    /// * `skipped_sheets` - 除外するシート名（大文字・小文字を区別しない）
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<String>)` - 選択されたシート名のリスト
    /// * `Err(XlsxToHtmlError::Config)` - シートが見つからない、またはインデックスが範囲外の場合
    pub fn select_sheets(
        &self,
        selector: &SheetSelector,
        include_hidden: bool,
        skipped_sheets: &[String],
    ) -> Result<Vec<String>, XlsxToHtmlError> {
        let all_sheet_names = self.get_sheet_names();

        let by_index = |index: usize| {
            all_sheet_names.get(index).cloned().ok_or_else(|| {
                XlsxToHtmlError::Config(format!(
                    "Sheet index {} is out of range (total: {})",
                    index,
                    all_sheet_names.len()
                ))
            })
        };
        let by_name = |name: &String| {
            if all_sheet_names.contains(name) {
                Ok(name.clone())
            } else {
                Err(XlsxToHtmlError::Config(format!("Sheet '{}' not found", name)))
            }
        };

        match selector {
            SheetSelector::All => Ok(all_sheet_names
                .iter()
                .filter(|name| {
                    if !include_hidden && self.metadata.is_sheet_hidden(name) {
                        log::debug!("skipping hidden sheet '{}'", name);
                        return false;
                    }
                    if is_skipped(name, skipped_sheets) {
                        log::info!("skipping excluded sheet '{}'", name);
                        return false;
                    }
                    true
                })
                .cloned()
                .collect()),
            SheetSelector::Index(index) => Ok(vec![by_index(*index)?]),
            SheetSelector::Name(name) => Ok(vec![by_name(name)?]),
            SheetSelector::Indices(indices) => indices.iter().map(|&i| by_index(i)).collect(),
            SheetSelector::Names(names) => names.iter().map(by_name).collect(),
        }
    }

    /// シートをパースして、メタデータとセルデータを抽出
    ///
    /// 値を持たないセルは結果に含めません。座標はシートの絶対座標（A1 = (0, 0)）です。
    ///
    /// # 引数
    ///
    /// * `sheet_name` - パースするシート名
    /// * `config` - 変換設定
    ///
    /// # 戻り値
    ///
    /// * `Ok((SheetMetadata, Vec<RawCellData>))` - メタデータとセルデータのペア
    /// * `Err(XlsxToHtmlError)` - パースエラーが発生した場合
    pub fn parse_sheet(
        &mut self,
        sheet_name: &str,
        config: &ConversionConfig,
    ) -> Result<(SheetMetadata, Vec<RawCellData>), XlsxToHtmlError> {
        let range = self
            .workbook
            .worksheet_range(sheet_name)
            .map_err(|e| XlsxToHtmlError::Parse(e.into()))?;

        let metadata = self.collect_metadata(sheet_name, config.include_hidden)?;

        // Range は使用範囲の左上から始まるため、絶対座標に戻す
        let (row_offset, col_offset) = range.start().unwrap_or((0, 0));

        let mut cells = Vec::new();
        for (row_idx, row) in range.rows().enumerate() {
            for (col_idx, data) in row.iter().enumerate() {
                let value = convert_value(data, metadata.is_1904);
                if value.is_empty() {
                    continue;
                }

                let coord = CellCoord::new(row_offset + row_idx as u32, col_offset + col_idx as u32);
                let format_string = match value {
                    CellValue::Number(_) => self
                        .metadata
                        .cell_format(sheet_name, coord.row, coord.col)
                        .map(str::to_string),
                    _ => None,
                };

                cells.push(RawCellData {
                    coord,
                    value,
                    format_string,
                });
            }
        }

        log::trace!("sheet '{}': {} populated cells", sheet_name, cells.len());

        Ok((metadata, cells))
    }

    /// シートのメタデータを収集
    fn collect_metadata(
        &mut self,
        sheet_name: &str,
        include_hidden: bool,
    ) -> Result<SheetMetadata, XlsxToHtmlError> {
        let index = self
            .workbook
            .sheet_names()
            .iter()
            .position(|name| name == sheet_name)
            .ok_or_else(|| XlsxToHtmlError::Config(format!("Sheet '{}' not found", sheet_name)))?;

        self.workbook
            .load_merged_regions()
            .map_err(|e| XlsxToHtmlError::Parse(e.into()))?;
        let merged_regions = match self.workbook.worksheet_merge_cells(sheet_name) {
            Some(Ok(regions)) => regions
                .iter()
                .map(|dims| {
                    let start = CellCoord::new(dims.start.0, dims.start.1);
                    let end = CellCoord::new(dims.end.0, dims.end.1);
                    MergedRegion::new(CellRange::new(start, end))
                })
                .collect(),
            Some(Err(e)) => {
                log::warn!("sheet '{}': failed to read merged regions: {}", sheet_name, e);
                Vec::new()
            }
            None => Vec::new(),
        };

        let (hidden_rows, hidden_cols) = if include_hidden {
            (Vec::new(), Vec::new())
        } else {
            (
                self.metadata.hidden_rows(sheet_name),
                self.metadata.hidden_cols(sheet_name),
            )
        };

        Ok(SheetMetadata {
            name: sheet_name.to_string(),
            index,
            merged_regions,
            hidden_rows,
            hidden_cols,
            is_1904: self.metadata.is_1904(),
        })
    }
}

/// 除外リストに含まれるシートかどうか
fn is_skipped(name: &str, skipped_sheets: &[String]) -> bool {
    let name = name.trim().to_lowercase();
    skipped_sheets.iter().any(|s| s.trim().to_lowercase() == name)
}

/// calamineのセル値を変換
fn convert_value(data: &Data, is_1904: bool) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            if dt.is_duration() {
                CellValue::Number(serial)
            } else {
                excel_serial_to_datetime(serial, is_1904)
                    .map(CellValue::DateTime)
                    .unwrap_or(CellValue::Number(serial))
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::Empty => CellValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_value_scalars() {
        assert_eq!(convert_value(&Data::Int(3), false), CellValue::Number(3.0));
        assert_eq!(
            convert_value(&Data::String("Norte".to_string()), false),
            CellValue::String("Norte".to_string())
        );
        assert_eq!(convert_value(&Data::Bool(true), false), CellValue::Bool(true));
        assert_eq!(convert_value(&Data::Empty, false), CellValue::Empty);
    }

    #[test]
    fn test_convert_value_error_uses_excel_notation() {
        let value = convert_value(&Data::Error(calamine::CellErrorType::Div0), false);
        assert_eq!(value, CellValue::Error("#DIV/0!".to_string()));
    }

    #[test]
    fn test_convert_value_dates_and_durations() {
        use calamine::{ExcelDateTime, ExcelDateTimeType};

        let date = ExcelDateTime::new(45658.0, ExcelDateTimeType::DateTime, false);
        assert_eq!(
            convert_value(&Data::DateTime(date), false),
            CellValue::DateTime(excel_serial_to_datetime(45658.0, false).unwrap())
        );

        // 経過時間（[h]:mm）は日付に変換せず数値のまま扱う
        let elapsed = ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false);
        assert_eq!(convert_value(&Data::DateTime(elapsed), false), CellValue::Number(1.5));
    }

    #[test]
    fn test_is_skipped_is_case_insensitive() {
        let skipped = vec!["índice".to_string(), "datoscbox".to_string()];
        assert!(is_skipped("Índice", &skipped));
        assert!(is_skipped(" DatosCBox ", &skipped));
        assert!(!is_skipped("Resumen", &skipped));
    }
}

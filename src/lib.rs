//! xlsxhtml - Spreadsheet segmentation into semantic HTML
//!
//! Excelシート（XLSX）を上から走査し、タイトル・セクション見出し・説明文などの
//! 独立テキストと、テーブルブロックに分割して、意味的なHTML断片を生成するクレートです。
//!
//! - 結合セルはアンカー（左上）の値に解決され、ヘッダー行では `colspan` になります
//! - パーセント書式の数値セルは `12.34%` 形式で出力されます
//! - 全空行・全空列はテーブルから除去されます
//! - シートページ、ワークブック索引、ライブラリ索引を組み立てられます
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use xlsxhtml::ConverterBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = ConverterBuilder::new().build()?;
//!
//!     // 各シートの本文HTMLを1つの出力にまとめる
//!     let input = File::open("informe.xlsx")?;
//!     let output = File::create("informe.html")?;
//!     converter.convert(input, output)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # ワークブック文書の生成
//!
//! ```rust,no_run
//! use std::fs::{self, File};
//! use xlsxhtml::ConverterBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = ConverterBuilder::new()
//!         .with_heading_min_len(5)
//!         .build()?;
//!
//!     let workbook = converter.convert_workbook(File::open("informe.xlsx")?, "informe")?;
//!     fs::create_dir_all("html/informe")?;
//!     for sheet in workbook.sheets() {
//!         let page = sheet.render_page(workbook.name(), converter.stylesheet());
//!         fs::write(format!("html/informe/{}", sheet.file_name()), page)?;
//!     }
//!     fs::write("html/informe/index.html", workbook.render_index(converter.stylesheet()))?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # 独自のローダーからの利用
//!
//! セルデータを自前で用意できる場合は、`SheetGrid` を構築して `segment_sheet` を呼び出します。
//!
//! ```rust
//! use xlsxhtml::{segment_sheet, CellValue, FragmentKind, RawCellData, SheetGrid, Thresholds};
//!
//! let cells = vec![
//!     RawCellData::new(0, 0, CellValue::String("Informe".to_string())),
//!     RawCellData::new(1, 0, CellValue::String("Region".to_string())),
//!     RawCellData::new(1, 1, CellValue::String("Avance".to_string())),
//!     RawCellData::new(2, 0, CellValue::String("Norte".to_string())),
//!     RawCellData::new(2, 1, CellValue::Number(0.5)).with_format("0.00%"),
//! ];
//! let grid = SheetGrid::new("Hoja1", cells, vec![]);
//! let body = segment_sheet(&grid, &Thresholds::default());
//!
//! assert_eq!(body.title(), "Informe");
//! assert_eq!(body.fragments()[0].kind(), FragmentKind::Table);
//! assert!(body.html().contains("<td class=\"percentage-cell\">50.00%</td>"));
//! ```

mod api;
mod builder;
mod document;
mod error;
mod formatter;
mod grid;
mod merge;
mod output;
mod parser;
mod security;
mod segment;
mod types;

// 公開API
pub use api::{
    DateFormat, SheetSelector, Thresholds, BANNER_LENGTH_THRESHOLD, HEADING_LENGTH_THRESHOLD,
    MIN_TABLE_CELLS,
};
pub use builder::{Converter, ConverterBuilder};
pub use document::{
    render_library_index, slugify, SheetDocument, WorkbookDocument, INDEX_FILE_NAME,
};
pub use error::XlsxToHtmlError;
pub use grid::SheetGrid;
pub use output::{merge_headers, Fragment, FragmentKind, HeaderCell};
pub use segment::{classify_row, segment_sheet, DataQualityIssue, RowClass, SheetBody};
pub use types::{CellCoord, CellRange, CellValue, MergedRegion, RawCellData};

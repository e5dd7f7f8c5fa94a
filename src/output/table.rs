//! Table Rendering
//!
//! テーブルブロックの値の整理（全空行・全空列の除去）、ヘッダーのcolspan結合、
//! テーブルHTMLの描画を提供します。

use std::io::Write;

use super::write_escaped;
use crate::error::XlsxToHtmlError;

/// 空テーブルの代わりに出力するプレースホルダー
const EMPTY_TABLE_PLACEHOLDER: &str = "Tabla vacía";

/// ヘッダーセル（ラベルと結合列数）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    /// ラベル
    pub label: String,
    /// 結合する列数（1以上）
    pub colspan: usize,
}

/// テーブルブロック
///
/// `[start_row, end_row)` の行範囲から抽出したセルテキストを保持します。
/// `None` は値なしのセルです。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableBlock {
    /// 開始行（0始まり、含む）
    pub start_row: u32,
    /// 終了行（0始まり、含まない）
    pub end_row: u32,
    rows: Vec<Vec<Option<String>>>,
}

impl TableBlock {
    /// 抽出済みの行からブロックを生成
    pub fn new(start_row: u32, end_row: u32, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            start_row,
            end_row,
            rows,
        }
    }

    /// すべて空の行を除去し、続いてすべて空の列を除去する
    pub fn pruned(self) -> Self {
        let rows: Vec<Vec<Option<String>>> = self
            .rows
            .into_iter()
            .filter(|row| row.iter().any(|v| !is_blank(v)))
            .collect();

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let keep: Vec<usize> = (0..width)
            .filter(|&col| rows.iter().any(|row| row.get(col).is_some_and(|v| !is_blank(v))))
            .collect();

        let rows = rows
            .into_iter()
            .map(|row| {
                keep.iter()
                    .map(|&col| row.get(col).cloned().flatten())
                    .collect()
            })
            .collect();

        Self {
            start_row: self.start_row,
            end_row: self.end_row,
            rows,
        }
    }

    /// 行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 列数
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// 空のブロックかどうか
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// ヘッダー行（先頭行）
    pub fn header(&self) -> Option<&[Option<String>]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// ボディ行（2行目以降）
    pub fn body(&self) -> &[Vec<Option<String>>] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// ヘッダー行の空セルを直前のラベルに結合する
///
/// 左から順に走査し、ラベルを持つセルに続く空セルの数だけcolspanを増やします。
/// 最初のラベルより前にある空セルは出力に含めません。
///
/// # 使用例
///
/// ```rust
/// use xlsxhtml::{merge_headers, HeaderCell};
///
/// let headers = vec![Some("Region".to_string()), None, None, Some("Total".to_string())];
/// assert_eq!(
///     merge_headers(&headers),
///     vec![
///         HeaderCell { label: "Region".to_string(), colspan: 3 },
///         HeaderCell { label: "Total".to_string(), colspan: 1 },
///     ]
/// );
/// ```
pub fn merge_headers(values: &[Option<String>]) -> Vec<HeaderCell> {
    let mut cells = Vec::new();
    let mut i = 0;

    while i < values.len() {
        if is_blank(&values[i]) {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < values.len() && is_blank(&values[j]) {
            j += 1;
        }

        cells.push(HeaderCell {
            label: values[i].clone().unwrap_or_default(),
            colspan: j - i,
        });
        i = j;
    }

    cells
}

/// テーブルブロックをHTMLとして描画する
///
/// 出力形式:
///
/// ```html
/// <div class="tabla-contenedor">
/// <table class="tabla-estructurada">
///   <thead>
///     <tr>
///       <th colspan="3">Region</th>
///       <th>Total</th>
///     </tr>
///   </thead>
///   <tbody>
///     <tr>
///       <td>Norte</td>
///       ...
/// ```
///
/// 空のブロックの場合は `<table>` の代わりにプレースホルダーを出力します。
pub(crate) fn render_table<W: Write>(
    block: &TableBlock,
    writer: &mut W,
) -> Result<(), XlsxToHtmlError> {
    writeln!(writer, "<div class=\"tabla-contenedor\">")?;

    match block.header() {
        None => {
            writeln!(writer, "<p>{}</p>", EMPTY_TABLE_PLACEHOLDER)?;
        }
        Some(header) => {
            let columns = block.column_count();
            let headers = merge_headers(header);
            let spanned: usize = headers.iter().map(|h| h.colspan).sum();

            writeln!(writer, "<table class=\"tabla-estructurada\">")?;
            writeln!(writer, "  <thead>\n    <tr>")?;

            // 先頭の空ヘッダー列は無ラベルのセルで埋め、colspan合計を列数に揃える
            if spanned < columns {
                write_header_cell(writer, "", columns - spanned)?;
            }
            for cell in &headers {
                write_header_cell(writer, &cell.label, cell.colspan)?;
            }

            writeln!(writer, "    </tr>\n  </thead>")?;
            writeln!(writer, "  <tbody>")?;

            for row in block.body() {
                writeln!(writer, "    <tr>")?;
                for value in row {
                    match value.as_deref() {
                        Some(text) if text.ends_with('%') => {
                            write!(writer, "      <td class=\"percentage-cell\">")?;
                            write_escaped(writer, text)?;
                            writeln!(writer, "</td>")?;
                        }
                        Some(text) => {
                            write!(writer, "      <td>")?;
                            write_escaped(writer, text)?;
                            writeln!(writer, "</td>")?;
                        }
                        None => writeln!(writer, "      <td></td>")?,
                    }
                }
                writeln!(writer, "    </tr>")?;
            }

            writeln!(writer, "  </tbody>\n</table>")?;
        }
    }

    writeln!(writer, "</div>")?;
    Ok(())
}

fn write_header_cell<W: Write>(
    writer: &mut W,
    label: &str,
    colspan: usize,
) -> Result<(), XlsxToHtmlError> {
    if colspan > 1 {
        write!(writer, "      <th colspan=\"{}\">", colspan)?;
    } else {
        write!(writer, "      <th>")?;
    }
    write_escaped(writer, label)?;
    writeln!(writer, "</th>")?;
    Ok(())
}

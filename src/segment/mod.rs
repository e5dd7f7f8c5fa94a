//! Segmentation Module
//!
//! シートのグリッドを上から1行ずつ走査し、独立テキスト行とテーブルブロックに分割して
//! HTML断片の列を生成するモジュール。
//!
//! 走査は状態機械として実装されており、後戻りはしません:
//!
//! - `Scanning(row)`: 行を分類する。空行・非表示行は読み飛ばす
//! - `EmittingText`: 独立テキスト行を見出しまたはテキストとして出力し、次の行へ
//! - `EmittingTable`: テーブルの終端を探し、値を整理して出力し、終端行から走査を再開
//! - `Done`: 最終行を超えたら終了
//!
//! 結合範囲の重なりなどのデータ品質の問題は致命的ではなく、該当行（またはテーブル）を
//! スキップして`DataQualityIssue`として記録し、走査を継続します。

mod classify;

use serde::Serialize;
use std::io::Write;

use crate::api::{DateFormat, Thresholds};
use crate::error::XlsxToHtmlError;
use crate::formatter::CellFormatter;
use crate::grid::SheetGrid;
use crate::output::{render_table, render_text, render_to_string, Fragment, FragmentKind, TableBlock};

pub use classify::{classify_row, RowClass};
pub(crate) use classify::is_upper_case;

/// データ品質の問題
///
/// 変換は継続されますが、該当する行やテーブルは出力に含まれません。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataQualityIssue {
    /// シート名
    pub sheet: String,
    /// 問題のあるセル（A1記法、特定できない場合は空）
    pub cell: String,
    /// 詳細メッセージ
    pub message: String,
}

impl DataQualityIssue {
    fn from_error(sheet: &str, error: XlsxToHtmlError, skipped: &str) -> Self {
        match error {
            XlsxToHtmlError::AmbiguousMerge {
                sheet,
                cell,
                regions,
            } => Self {
                sheet,
                cell,
                message: format!(
                    "cell is covered by overlapping merged regions {}; {} skipped",
                    regions, skipped
                ),
            },
            other => Self {
                sheet: sheet.to_string(),
                cell: String::new(),
                message: format!("{}; {} skipped", other, skipped),
            },
        }
    }
}

/// 1シート分のセグメント分割結果
#[derive(Debug, Clone)]
pub struct SheetBody {
    title: String,
    fragments: Vec<Fragment>,
    issues: Vec<DataQualityIssue>,
}

impl SheetBody {
    /// シートタイトル（シート内で最初に現れる空でないセルの値、なければシート名）
    pub fn title(&self) -> &str {
        &self.title
    }

    /// スキャン順のHTML断片
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// 記録されたデータ品質の問題
    pub fn issues(&self) -> &[DataQualityIssue] {
        &self.issues
    }

    /// 断片を連結した本文HTML
    pub fn html(&self) -> String {
        self.fragments.iter().map(Fragment::html).collect()
    }

    /// 本文HTMLを書き込む
    pub fn write_html<W: Write>(&self, writer: &mut W) -> Result<(), XlsxToHtmlError> {
        for fragment in &self.fragments {
            writer.write_all(fragment.html().as_bytes())?;
        }
        Ok(())
    }
}

/// グリッドをセグメント分割する
///
/// 日付はISO 8601形式で出力されます。日付形式を変えたい場合は`Converter`を使用してください。
pub fn segment_sheet(grid: &SheetGrid, thresholds: &Thresholds) -> SheetBody {
    SheetSegmenter::new(grid, *thresholds, CellFormatter::new(DateFormat::Iso8601)).run()
}

/// 走査の状態
#[derive(Debug)]
enum State {
    Scanning(u32),
    EmittingText { row: u32, values: Vec<Option<String>> },
    EmittingTable { start: u32 },
    Done,
}

/// シートのセグメント分割器
pub(crate) struct SheetSegmenter<'a> {
    grid: &'a SheetGrid,
    thresholds: Thresholds,
    formatter: CellFormatter,
    title: String,
    fragments: Vec<Fragment>,
    issues: Vec<DataQualityIssue>,
}

impl<'a> SheetSegmenter<'a> {
    pub fn new(grid: &'a SheetGrid, thresholds: Thresholds, formatter: CellFormatter) -> Self {
        let title = Self::find_title(grid, &formatter).unwrap_or_else(|| grid.name().to_string());
        Self {
            grid,
            thresholds,
            formatter,
            title,
            fragments: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// シート内で最初に現れる空でないセルの値
    fn find_title(grid: &SheetGrid, formatter: &CellFormatter) -> Option<String> {
        grid.visible_cells()
            .find_map(|(_, cell)| formatter.display_text(cell))
    }

    /// 走査を実行し、結果を返す
    pub fn run(mut self) -> SheetBody {
        let mut state = State::Scanning(0);
        loop {
            state = match state {
                State::Scanning(row) => self.scan(row),
                State::EmittingText { row, values } => {
                    self.emit_text(row, &values);
                    State::Scanning(row + 1)
                }
                State::EmittingTable { start } => State::Scanning(self.emit_table(start)),
                State::Done => break,
            };
        }

        log::debug!(
            "sheet '{}': {} fragments, {} issues",
            self.grid.name(),
            self.fragments.len(),
            self.issues.len()
        );

        SheetBody {
            title: self.title,
            fragments: self.fragments,
            issues: self.issues,
        }
    }

    fn scan(&mut self, row: u32) -> State {
        // 空行・非表示行は読み飛ばす
        let Some(row) = self.grid.next_populated_row(row) else {
            return State::Done;
        };

        match self.row_texts(row) {
            Ok(values) => match classify_row(&values, &self.thresholds) {
                RowClass::IsolatedText => State::EmittingText { row, values },
                RowClass::TableData => State::EmittingTable { start: row },
            },
            Err(e) => {
                self.record(e, &format!("row {}", row + 1));
                State::Scanning(row + 1)
            }
        }
    }

    /// 行の各セルを解決し、表示テキストに変換する
    fn row_texts(&self, row: u32) -> Result<Vec<Option<String>>, XlsxToHtmlError> {
        Ok(self
            .grid
            .resolve_row(row)?
            .into_iter()
            .map(|cell| cell.and_then(|c| self.formatter.display_text(c)))
            .collect())
    }

    /// テーブルの終端行（含まない）を探す
    ///
    /// 開始行の次から、独立テキスト行に達するまで進みます。
    /// 結合範囲が解決できない行はテーブルの一部とみなし、ブロック全体を`emit_table`でスキップします。
    /// 戻り値は常に `start + 1` 以上です。
    fn scan_table(&self, start: u32) -> u32 {
        let mut end = start + 1;
        while end < self.grid.row_count() {
            if !self.grid.is_row_hidden(end) {
                if self.grid.is_row_blank(end) {
                    break;
                }
                if let Ok(values) = self.row_texts(end) {
                    if classify_row(&values, &self.thresholds) == RowClass::IsolatedText {
                        break;
                    }
                }
            }
            end += 1;
        }
        end
    }

    fn emit_text(&mut self, row: u32, values: &[Option<String>]) {
        let mut heading = false;
        let rendered = render_to_string(|w| {
            heading = render_text(values, &self.title, &self.thresholds, w)?;
            Ok(())
        });

        match rendered {
            Ok(html) if html.is_empty() => {}
            Ok(html) => {
                let kind = if heading {
                    FragmentKind::SectionHeading
                } else {
                    FragmentKind::TextContent
                };
                self.fragments.push(Fragment::new(kind, html));
            }
            Err(e) => self.record(e, &format!("row {}", row + 1)),
        }
    }

    fn emit_table(&mut self, start: u32) -> u32 {
        let end = self.scan_table(start);

        let mut rows: Vec<Vec<Option<String>>> = Vec::with_capacity((end - start) as usize);
        for row in start..end {
            if self.grid.is_row_hidden(row) {
                continue;
            }
            match self.grid.resolve_row(row) {
                Ok(cells) => rows.push(
                    cells
                        .into_iter()
                        .map(|cell| cell.and_then(|c| self.formatter.table_text(c)))
                        .collect(),
                ),
                Err(e) => {
                    self.record(e, &format!("table rows {}-{}", start + 1, end));
                    return end;
                }
            }
        }

        let block = TableBlock::new(start, end, rows).pruned();
        log::debug!(
            "sheet '{}': table rows {}-{} ({} x {})",
            self.grid.name(),
            block.start_row + 1,
            block.end_row,
            block.row_count(),
            block.column_count()
        );

        match render_to_string(|w| render_table(&block, w)) {
            Ok(html) => self.fragments.push(Fragment::new(FragmentKind::Table, html)),
            Err(e) => self.record(e, &format!("table rows {}-{}", start + 1, end)),
        }
        end
    }

    fn record(&mut self, error: XlsxToHtmlError, skipped: &str) {
        let issue = DataQualityIssue::from_error(self.grid.name(), error, skipped);
        log::warn!(
            "sheet '{}', cell {}: {}",
            issue.sheet,
            issue.cell,
            issue.message
        );
        self.issues.push(issue);
    }
}

//! Grid Module
//!
//! 1シート分のセルを疎なグリッドとして保持し、結合セルの解決を提供するモジュール。
//! グリッドは構築後は読み取り専用で、セグメント分割はこのグリッドに対して行われます。
//!
//! 値を持つセルだけを格納するため、離れた位置に値が1つあるだけのシート
//! （例: A1とXFD1048576）でも、メモリ使用量は値の数に比例します。

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::XlsxToHtmlError;
use crate::merge::{MergeIndex, Resolution};
use crate::types::{CellCoord, CellValue, MergedRegion, RawCellData};

/// グリッド上の1セル
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GridCell {
    /// セルの値
    pub value: CellValue,
    /// 数値書式文字列
    pub format_string: Option<String>,
}

/// 1シート分のセルグリッド
///
/// 行・列は0始まりです。結合範囲はシートごとに1度だけインデックス化されます。
///
/// # 使用例
///
/// ```rust
/// use xlsxhtml::{segment_sheet, CellValue, RawCellData, SheetGrid, Thresholds};
///
/// let grid = SheetGrid::new(
///     "Ventas",
///     vec![
///         RawCellData::new(0, 0, CellValue::String("Region".into())),
///         RawCellData::new(0, 1, CellValue::String("Total".into())),
///         RawCellData::new(1, 0, CellValue::String("Norte".into())),
///         RawCellData::new(1, 1, CellValue::Number(42.0)),
///     ],
///     vec![],
/// );
/// let body = segment_sheet(&grid, &Thresholds::default());
/// assert_eq!(body.fragments().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SheetGrid {
    /// シート名
    name: String,

    /// 値を持つセル（行 -> 列 -> セル）
    cells: BTreeMap<u32, BTreeMap<u32, GridCell>>,

    /// 行数
    rows: u32,

    /// 列数
    cols: u32,

    /// 結合範囲インデックス
    merges: MergeIndex,

    /// 非表示行
    hidden_rows: HashSet<u32>,

    /// 非表示列
    hidden_cols: HashSet<u32>,

    /// 行の解決対象となる列（昇順）
    columns: Vec<u32>,
}

impl SheetGrid {
    /// セルデータと結合範囲からグリッドを構築
    ///
    /// # 引数
    ///
    /// * `name` - シート名
    /// * `cells` - セルデータ（順不同、値が空のセルは省略可）
    /// * `merged_regions` - 結合範囲（アンカーは左上セル）
    pub fn new(
        name: impl Into<String>,
        cells: Vec<RawCellData>,
        merged_regions: Vec<MergedRegion>,
    ) -> Self {
        let mut rows = 0;
        let mut cols = 0;
        let mut populated: BTreeMap<u32, BTreeMap<u32, GridCell>> = BTreeMap::new();

        for cell in cells {
            if cell.value.is_empty() {
                continue;
            }
            let CellCoord { row, col } = cell.coord;
            rows = rows.max(row + 1);
            cols = cols.max(col + 1);
            populated.entry(row).or_default().insert(
                col,
                GridCell {
                    value: cell.value,
                    format_string: cell.format_string,
                },
            );
        }

        let mut grid = Self {
            name: name.into(),
            cells: populated,
            rows,
            cols,
            merges: MergeIndex::default(),
            hidden_rows: HashSet::new(),
            hidden_cols: HashSet::new(),
            columns: Vec::new(),
        };
        grid.reindex(merged_regions);
        grid
    }

    /// 非表示行を設定する（非表示行はセグメント分割でスキップされる）
    pub fn with_hidden_rows(mut self, rows: impl IntoIterator<Item = u32>) -> Self {
        self.hidden_rows = rows.into_iter().collect();
        self
    }

    /// 非表示列を設定する（非表示列はすべての行から除外される）
    pub fn with_hidden_cols(mut self, cols: impl IntoIterator<Item = u32>) -> Self {
        self.hidden_cols = cols.into_iter().collect();
        let regions = std::mem::take(&mut self.merges).into_regions();
        self.reindex(regions);
        self
    }

    /// 解決対象の列と結合インデックスを構築する
    ///
    /// 対象列は、先頭の表示列・値を持つ列・結合範囲に含まれる列のうち表示されているもの。
    /// シート全体で空の列はどの行でも値を持たないため、行の解決から除外しても分類・出力は変わりません。
    fn reindex(&mut self, regions: Vec<MergedRegion>) {
        let mut columns: BTreeSet<u32> = self
            .cells
            .values()
            .flat_map(|row| row.keys().copied())
            .collect();

        columns.extend((0..self.cols).find(|c| !self.hidden_cols.contains(c)));

        for (first, last) in merged_col_spans(&regions, self.cols) {
            columns.extend(first..=last);
        }

        self.columns = columns
            .into_iter()
            .filter(|c| !self.hidden_cols.contains(c))
            .collect();

        let rows: Vec<u32> = self.cells.keys().copied().collect();
        self.merges = MergeIndex::build(regions, &rows, &self.columns);
    }

    /// シート名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 行数
    pub fn row_count(&self) -> u32 {
        self.rows
    }

    /// 列数
    pub fn col_count(&self) -> u32 {
        self.cols
    }

    /// 結合範囲のリスト
    pub fn merged_regions(&self) -> &[MergedRegion] {
        self.merges.regions()
    }

    /// 行が非表示かどうか
    pub(crate) fn is_row_hidden(&self, row: u32) -> bool {
        self.hidden_rows.contains(&row)
    }

    /// 行の解決対象となる列
    pub(crate) fn visible_cols(&self) -> &[u32] {
        &self.columns
    }

    /// 結合を考慮しない生のセル
    pub(crate) fn raw_cell(&self, coord: CellCoord) -> Option<&GridCell> {
        self.cells.get(&coord.row).and_then(|row| row.get(&coord.col))
    }

    /// 行のすべての表示セルが（結合を考慮せず）空かどうか
    pub(crate) fn is_row_blank(&self, row: u32) -> bool {
        self.cells.get(&row).map_or(true, |cells| {
            cells
                .iter()
                .all(|(col, cell)| self.hidden_cols.contains(col) || cell.value.is_empty())
        })
    }

    /// `from`以降で最初の、表示されていて空でない行
    pub(crate) fn next_populated_row(&self, from: u32) -> Option<u32> {
        self.cells
            .range(from..)
            .map(|(&row, _)| row)
            .find(|&row| !self.is_row_hidden(row) && !self.is_row_blank(row))
    }

    /// 表示されているセルを行優先の順で列挙する（結合は考慮しない）
    pub(crate) fn visible_cells(&self) -> impl Iterator<Item = (CellCoord, &GridCell)> + '_ {
        self.cells
            .iter()
            .filter(move |(row, _)| !self.is_row_hidden(**row))
            .flat_map(move |(&row, cells)| {
                cells
                    .iter()
                    .filter(move |(col, _)| !self.hidden_cols.contains(*col))
                    .map(move |(&col, cell)| (CellCoord::new(row, col), cell))
            })
    }

    /// 座標の論理値を解決する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some(cell))` - 値を持つセル（結合範囲外のセル、またはアンカー）
    /// * `Ok(None)` - 値なし（空セル、またはアンカー以外の結合メンバー）
    /// * `Err(XlsxToHtmlError::AmbiguousMerge)` - 座標が複数の結合範囲に含まれる場合
    pub(crate) fn resolve(&self, coord: CellCoord) -> Result<Option<&GridCell>, XlsxToHtmlError> {
        match self.merges.resolve(coord) {
            Resolution::Own | Resolution::Anchor => Ok(self
                .raw_cell(coord)
                .filter(|cell| !cell.value.is_empty())),
            Resolution::Suppressed => Ok(None),
            Resolution::Ambiguous(ranges) => Err(XlsxToHtmlError::AmbiguousMerge {
                sheet: self.name.clone(),
                cell: coord.to_a1_notation(),
                regions: ranges
                    .iter()
                    .map(|r| r.to_a1_notation())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// 1行分の表示セルを解決する
    ///
    /// 1つでも曖昧なセルがあれば、その行全体をエラーとします。
    pub(crate) fn resolve_row(&self, row: u32) -> Result<Vec<Option<&GridCell>>, XlsxToHtmlError> {
        self.visible_cols()
            .iter()
            .map(|&col| self.resolve(CellCoord::new(row, col)))
            .collect()
    }
}

/// 結合範囲が覆う列の区間（重なりを統合し、グリッドの列数で切り詰める）
fn merged_col_spans(regions: &[MergedRegion], cols: u32) -> Vec<(u32, u32)> {
    let mut spans: Vec<(u32, u32)> = regions
        .iter()
        .map(|r| (r.range.start.col, r.range.end.col.min(cols.saturating_sub(1))))
        .filter(|&(first, last)| cols > 0 && first <= last)
        .collect();
    spans.sort_unstable();

    let mut merged: Vec<(u32, u32)> = Vec::with_capacity(spans.len());
    for (first, last) in spans {
        match merged.last_mut() {
            Some(prev) if first <= prev.1.saturating_add(1) => prev.1 = prev.1.max(last),
            _ => merged.push((first, last)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellRange;

    fn text(row: u32, col: u32, s: &str) -> RawCellData {
        RawCellData::new(row, col, CellValue::String(s.to_string()))
    }

    fn region(r1: u32, c1: u32, r2: u32, c2: u32) -> MergedRegion {
        MergedRegion::new(CellRange::new(CellCoord::new(r1, c1), CellCoord::new(r2, c2)))
    }

    #[test]
    fn test_grid_size_from_populated_cells() {
        let grid = SheetGrid::new(
            "S",
            vec![
                text(0, 0, "a"),
                text(4, 2, "b"),
                RawCellData::new(9, 9, CellValue::Empty),
            ],
            vec![],
        );
        assert_eq!(grid.row_count(), 5);
        assert_eq!(grid.col_count(), 3);
    }

    #[test]
    fn test_far_apart_cells_stay_sparse() {
        let grid = SheetGrid::new(
            "S",
            vec![text(0, 0, "Inicio"), text(1_048_575, 16_383, "Fin")],
            vec![],
        );
        assert_eq!(grid.row_count(), 1_048_576);
        assert_eq!(grid.col_count(), 16_384);
        assert_eq!(grid.visible_cols(), &[0, 16_383]);
        assert_eq!(grid.resolve_row(1_048_575).unwrap().len(), 2);
        assert_eq!(grid.next_populated_row(1), Some(1_048_575));
        assert_eq!(grid.next_populated_row(1_048_576), None);
    }

    #[test]
    fn test_columns_include_first_visible_and_merged() {
        let grid = SheetGrid::new(
            "S",
            vec![text(0, 3, "a"), text(1, 5, "b"), text(3, 9, "c")],
            vec![region(2, 7, 2, 8), region(4, 12, 4, 14)],
        );
        // 最終列を超える結合範囲は切り捨てられる
        assert_eq!(grid.visible_cols(), &[0, 3, 5, 7, 8, 9]);

        let grid = grid.with_hidden_cols([0]);
        assert_eq!(grid.visible_cols(), &[1, 3, 5, 7, 8, 9]);
    }

    #[test]
    fn test_empty_grid() {
        let grid = SheetGrid::new("S", vec![], vec![]);
        assert_eq!(grid.row_count(), 0);
        assert_eq!(grid.col_count(), 0);
    }

    #[test]
    fn test_resolve_merged_members() {
        let grid = SheetGrid::new(
            "S",
            vec![text(0, 0, "Header"), text(1, 2, "x")],
            vec![region(0, 0, 0, 2)],
        );

        let anchor = grid.resolve(CellCoord::new(0, 0)).unwrap();
        assert_eq!(
            anchor.map(|c| c.value.clone()),
            Some(CellValue::String("Header".to_string()))
        );
        assert!(grid.resolve(CellCoord::new(0, 1)).unwrap().is_none());
        assert!(grid.resolve(CellCoord::new(0, 2)).unwrap().is_none());
        assert!(grid.resolve(CellCoord::new(1, 2)).unwrap().is_some());
    }

    #[test]
    fn test_resolve_whitespace_is_null() {
        let grid = SheetGrid::new("S", vec![text(0, 0, "   "), text(0, 1, "x")], vec![]);
        assert!(grid.resolve(CellCoord::new(0, 0)).unwrap().is_none());
    }

    #[test]
    fn test_resolve_overlap_reports_error() {
        let grid = SheetGrid::new(
            "Datos",
            vec![text(0, 0, "a"), text(0, 3, "b")],
            vec![region(0, 0, 0, 2), region(0, 2, 0, 3)],
        );

        match grid.resolve(CellCoord::new(0, 2)) {
            Err(XlsxToHtmlError::AmbiguousMerge {
                sheet,
                cell,
                regions,
            }) => {
                assert_eq!(sheet, "Datos");
                assert_eq!(cell, "C1");
                assert_eq!(regions, "A1:C1, C1:D1");
            }
            _ => panic!("Expected AmbiguousMerge error"),
        }
        assert!(grid.resolve_row(0).is_err());
    }

    #[test]
    fn test_hidden_cols_are_excluded_from_rows() {
        let grid = SheetGrid::new(
            "S",
            vec![text(0, 0, "a"), text(0, 1, "hidden"), text(0, 2, "c")],
            vec![],
        )
        .with_hidden_cols([1]);

        let row = grid.resolve_row(0).unwrap();
        assert_eq!(row.len(), 2);
        assert_eq!(grid.visible_cols(), &[0, 2]);
    }

    #[test]
    fn test_is_row_blank_ignores_merge_resolution() {
        let grid = SheetGrid::new(
            "S",
            vec![text(0, 0, "Top"), text(2, 0, "x")],
            vec![region(0, 0, 1, 0)],
        );
        assert!(!grid.is_row_blank(0));
        assert!(grid.is_row_blank(1));
    }
}

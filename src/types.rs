//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use chrono::NaiveDateTime;

/// セルの値を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 数値（f64）
    Number(f64),

    /// 文字列
    String(String),

    /// 論理値
    Bool(bool),

    /// 日付・日時（シリアル値からエポック変換済み）
    DateTime(NaiveDateTime),

    /// エラー値（例: #DIV/0!）
    Error(String),

    /// 空セル
    Empty,
}

impl CellValue {
    /// 値が空かどうかを判定
    ///
    /// 空白のみの文字列も空として扱います。
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1形式の文字列に変換（例: (0, 0) -> "A1"）
    #[allow(clippy::wrong_self_convention)]
    pub fn to_a1_notation(&self) -> String {
        let col_str = Self::col_index_to_letter(self.col);
        format!("{}{}", col_str, self.row + 1)
    }

    /// 列インデックスを文字列に変換（0 -> "A", 25 -> "Z", 26 -> "AA"）
    fn col_index_to_letter(mut col: u32) -> String {
        let mut result = String::new();
        loop {
            let remainder = col % 26;
            result.insert(0, (b'A' + remainder as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        result
    }
}

/// セル範囲（両端を含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellCoord,
    pub end: CellCoord,
}

impl CellRange {
    /// 新しい範囲を生成
    pub fn new(start: CellCoord, end: CellCoord) -> Self {
        Self { start, end }
    }

    /// 指定された座標が範囲内にあるかを判定
    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.row >= self.start.row
            && coord.row <= self.end.row
            && coord.col >= self.start.col
            && coord.col <= self.end.col
    }

    /// 範囲をA1形式で表す（例: "A1:C1"）
    #[allow(clippy::wrong_self_convention)]
    pub fn to_a1_notation(&self) -> String {
        format!(
            "{}:{}",
            self.start.to_a1_notation(),
            self.end.to_a1_notation()
        )
    }
}

/// セル結合範囲の情報
///
/// 左上セル（アンカー）のみが値を持ち、範囲内の他のセルは値を持たないものとして扱います。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRegion {
    /// 結合範囲
    pub range: CellRange,

    /// アンカーセル（左上セル）の座標
    pub anchor: CellCoord,
}

impl MergedRegion {
    /// 新しい結合範囲を生成
    pub fn new(range: CellRange) -> Self {
        Self {
            anchor: range.start,
            range,
        }
    }

    /// 指定された座標が結合範囲内にあるかを判定
    pub fn contains(&self, coord: CellCoord) -> bool {
        self.range.contains(coord)
    }
}

/// パーサーから抽出された生のセルデータ
#[derive(Debug, Clone, PartialEq)]
pub struct RawCellData {
    /// セル座標
    pub coord: CellCoord,

    /// セルの値
    pub value: CellValue,

    /// 数値書式文字列（例: "0.00%"）
    pub format_string: Option<String>,
}

impl RawCellData {
    /// 書式なしのセルデータを生成
    pub fn new(row: u32, col: u32, value: CellValue) -> Self {
        Self {
            coord: CellCoord::new(row, col),
            value,
            format_string: None,
        }
    }

    /// 数値書式文字列を設定する
    pub fn with_format(mut self, format_string: impl Into<String>) -> Self {
        self.format_string = Some(format_string.into());
        self
    }
}

/// シートのメタデータ
#[derive(Debug, Clone)]
pub(crate) struct SheetMetadata {
    /// シート名
    pub name: String,

    /// シートインデックス（0始まり）
    pub index: usize,

    /// セル結合範囲のリスト
    pub merged_regions: Vec<MergedRegion>,

    /// 非表示行のインデックス
    pub hidden_rows: Vec<u32>,

    /// 非表示列のインデックス
    pub hidden_cols: Vec<u32>,

    /// 1904年エポックを使用するか（ワークブック全体の設定）
    pub is_1904: bool,
}

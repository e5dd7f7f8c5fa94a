//! Public API Types
//!
//! 公開APIで使用する列挙型と設定値を定義するモジュール。

use serde::Serialize;

/// テーブル行と見なすために必要な、値を持つセルの最小数
pub const MIN_TABLE_CELLS: usize = 2;

/// 先頭セルがこの文字数を超える大文字テキストの行は、バナー行（独立テキスト）と見なす
pub const BANNER_LENGTH_THRESHOLD: usize = 10;

/// 独立テキストがこの文字数を超える大文字テキストであれば、セクション見出しとして出力する
pub const HEADING_LENGTH_THRESHOLD: usize = 7;

/// 日付の出力形式
///
/// 日付セルをHTMLに変換する際の出力形式を指定します。
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DateFormat {
    /// ISO 8601形式（YYYY-MM-DD、時刻成分がある場合は YYYY-MM-DD HH:MM:SS）
    ///
    /// 例: `2025-11-20`
    Iso8601,

    /// カスタム形式（chrono互換フォーマット文字列）
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxhtml::{ConverterBuilder, DateFormat};
    ///
    /// # fn main() -> Result<(), xlsxhtml::XlsxToHtmlError> {
    /// let converter = ConverterBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%d/%m/%Y".to_string()))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    Custom(String),
}

/// シート選択方式
///
/// 変換対象のシートを選択する方法を指定します。
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SheetSelector {
    /// すべてのシートを変換（デフォルト）
    All,

    /// インデックス指定（0始まり）
    Index(usize),

    /// シート名指定
    Name(String),

    /// 複数のインデックス指定
    Indices(Vec<usize>),

    /// 複数のシート名指定
    Names(Vec<String>),
}

/// 行分類とテキスト出力のしきい値
///
/// 3つの値は互いに独立しており、個別に調整できます。
///
/// # 使用例
///
/// ```rust
/// use xlsxhtml::Thresholds;
///
/// let thresholds = Thresholds {
///     banner_min_len: 12,
///     ..Thresholds::default()
/// };
/// assert_eq!(thresholds.min_table_cells, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    /// 行をテーブル候補とするために必要な、値を持つセルの最小数
    pub min_table_cells: usize,

    /// バナー判定: 先頭セルの大文字テキストがこの文字数を超えると独立テキスト
    pub banner_min_len: usize,

    /// 見出し判定: 大文字テキストがこの文字数を超えるとセクション見出し
    pub heading_min_len: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_table_cells: MIN_TABLE_CELLS,
            banner_min_len: BANNER_LENGTH_THRESHOLD,
            heading_min_len: HEADING_LENGTH_THRESHOLD,
        }
    }
}

//! Row Classification
//!
//! 解決済みの行の値から、その行が独立テキストかテーブルデータかを判定します。
//! 判定は純粋関数で、同じ入力に対して常に同じ結果を返します。

use serde::Serialize;

use crate::api::Thresholds;

/// 行の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowClass {
    /// タイトル、説明文、セクション見出しなどの独立テキスト
    IsolatedText,
    /// テーブルの一部となるデータ行
    TableData,
}

/// 行を分類する
///
/// 1. 値を持つセルが `min_table_cells` 未満なら独立テキスト
/// 2. 先頭セルのテキストがすべて大文字で、`banner_min_len` 文字を超えるなら独立テキスト（バナー行）
/// 3. それ以外はテーブルデータ
///
/// # 引数
///
/// * `values` - 結合解決済み・空白除去済みの行の値（`None` は値なし）
/// * `thresholds` - 判定しきい値
///
/// # 使用例
///
/// ```rust
/// use xlsxhtml::{classify_row, RowClass, Thresholds};
///
/// let row = vec![Some("Region".to_string()), Some("Total".to_string())];
/// assert_eq!(classify_row(&row, &Thresholds::default()), RowClass::TableData);
///
/// let banner = vec![Some("RESUMEN GENERAL".to_string()), Some("x".to_string())];
/// assert_eq!(classify_row(&banner, &Thresholds::default()), RowClass::IsolatedText);
/// ```
pub fn classify_row(values: &[Option<String>], thresholds: &Thresholds) -> RowClass {
    let populated = values
        .iter()
        .filter(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
        .count();

    if populated < thresholds.min_table_cells {
        return RowClass::IsolatedText;
    }

    let first = values
        .first()
        .and_then(|v| v.as_deref())
        .map(str::trim)
        .unwrap_or("");

    if is_upper_case(first) && first.chars().count() > thresholds.banner_min_len {
        return RowClass::IsolatedText;
    }

    RowClass::TableData
}

/// 大文字・小文字の区別がある文字を1つ以上含み、そのすべてが大文字かどうか
pub(crate) fn is_upper_case(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

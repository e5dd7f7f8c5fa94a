//! Formatter Module
//!
//! セル値を表示用テキストに変換するモジュール。
//! 独立テキストの判定・出力には素の文字列化を、テーブルセルにはパーセント書式を適用します。

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::api::DateFormat;
use crate::grid::GridCell;
use crate::types::CellValue;

/// セルフォーマッター
#[derive(Debug, Clone)]
pub(crate) struct CellFormatter {
    /// 日付形式
    date_format: DateFormat,
}

impl CellFormatter {
    /// 新しいCellFormatterインスタンスを生成
    pub fn new(date_format: DateFormat) -> Self {
        Self { date_format }
    }

    /// セル値を文字列化し、前後の空白を除去する
    ///
    /// # 戻り値
    ///
    /// * `Some(String)` - 空でないテキスト
    /// * `None` - 空セル、または空白のみの文字列
    pub fn display_text(&self, cell: &GridCell) -> Option<String> {
        let text = match &cell.value {
            CellValue::Number(n) => format_number(*n),
            CellValue::String(s) => s.trim().to_string(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::DateTime(dt) => self.format_datetime(dt),
            CellValue::Error(e) => e.clone(),
            CellValue::Empty => String::new(),
        };
        (!text.is_empty()).then_some(text)
    }

    /// テーブルセル用のテキスト
    ///
    /// 数値セルの書式にパーセント記号が含まれる場合は、100倍して小数点以下2桁で
    /// `%` を付けた文字列にします（例: `0.1234` -> `"12.34%"`）。
    pub fn table_text(&self, cell: &GridCell) -> Option<String> {
        if let CellValue::Number(n) = cell.value {
            if cell.format_string.as_deref().is_some_and(is_percent_format) {
                return Some(format!("{:.2}%", n * 100.0));
            }
        }
        self.display_text(cell)
    }

    fn format_datetime(&self, dt: &NaiveDateTime) -> String {
        match &self.date_format {
            DateFormat::Iso8601 if dt.time() == NaiveTime::MIN => {
                dt.format("%Y-%m-%d").to_string()
            }
            DateFormat::Iso8601 => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            DateFormat::Custom(format_str) => dt.format(format_str).to_string(),
        }
    }
}

/// 数値を文字列化する（整数値は小数点なし）
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// 数値書式がパーセント書式かどうかを判定
///
/// 引用符で囲まれたリテラル、`\` によるエスケープ、`[...]` 内の `%` は無視します。
pub(crate) fn is_percent_format(format: &str) -> bool {
    let mut chars = format.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                }
            }
            '[' => {
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '%' => return true,
            _ => {}
        }
    }
    false
}

/// Excelのシリアル日付値を日時に変換
///
/// # エポックシステム
///
/// - 1900年システム（デフォルト）: 1899年12月30日起算。Excelの1900年うるう年バグにより、
///   シリアル値60未満は1日ずれるため1899年12月31日起算で補正する
/// - 1904年システム: 1904年1月1日起算（シリアル値0 = 1904-01-01）
///
/// # 戻り値
///
/// * `Some(NaiveDateTime)` - 変換に成功した場合
/// * `None` - 負の値、または範囲外の場合
pub(crate) fn excel_serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    // 9999-12-31 を超える値は日付として扱わない
    if !serial.is_finite() || !(0.0..2_958_466.0).contains(&serial) {
        return None;
    }

    let epoch = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if serial < 60.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };

    let days = serial.floor();
    let seconds = ((serial - days) * 86_400.0).round() as i64;

    epoch
        .and_time(NaiveTime::MIN)
        .checked_add_signed(Duration::days(days as i64))?
        .checked_add_signed(Duration::seconds(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(value: CellValue) -> GridCell {
        GridCell {
            value,
            format_string: None,
        }
    }

    fn formatted(value: CellValue, format: &str) -> GridCell {
        GridCell {
            value,
            format_string: Some(format.to_string()),
        }
    }

    fn iso() -> CellFormatter {
        CellFormatter::new(DateFormat::Iso8601)
    }

    #[test]
    fn test_display_text_number() {
        assert_eq!(iso().display_text(&cell(CellValue::Number(10.0))), Some("10".to_string()));
        assert_eq!(iso().display_text(&cell(CellValue::Number(10.5))), Some("10.5".to_string()));
        assert_eq!(iso().display_text(&cell(CellValue::Number(-3.0))), Some("-3".to_string()));
    }

    #[test]
    fn test_display_text_trims_strings() {
        assert_eq!(
            iso().display_text(&cell(CellValue::String("  Norte \n".to_string()))),
            Some("Norte".to_string())
        );
        assert_eq!(iso().display_text(&cell(CellValue::String("   ".to_string()))), None);
        assert_eq!(iso().display_text(&cell(CellValue::Empty)), None);
    }

    #[test]
    fn test_display_text_bool_and_error() {
        assert_eq!(iso().display_text(&cell(CellValue::Bool(true))), Some("TRUE".to_string()));
        assert_eq!(
            iso().display_text(&cell(CellValue::Error("#DIV/0!".to_string()))),
            Some("#DIV/0!".to_string())
        );
    }

    #[test]
    fn test_display_text_dates() {
        let date = excel_serial_to_datetime(45658.0, false).unwrap();
        assert_eq!(iso().display_text(&cell(CellValue::DateTime(date))), Some("2025-01-01".to_string()));

        let with_time = excel_serial_to_datetime(45658.5, false).unwrap();
        assert_eq!(
            iso().display_text(&cell(CellValue::DateTime(with_time))),
            Some("2025-01-01 12:00:00".to_string())
        );

        let custom = CellFormatter::new(DateFormat::Custom("%d/%m/%Y".to_string()));
        assert_eq!(custom.display_text(&cell(CellValue::DateTime(date))), Some("01/01/2025".to_string()));
    }

    #[test]
    fn test_table_text_percentage() {
        assert_eq!(
            iso().table_text(&formatted(CellValue::Number(0.1234), "0.00%")),
            Some("12.34%".to_string())
        );
        assert_eq!(
            iso().table_text(&formatted(CellValue::Number(0.5), "0%")),
            Some("50.00%".to_string())
        );
        assert_eq!(
            iso().table_text(&formatted(CellValue::Number(1.0), "0.0%")),
            Some("100.00%".to_string())
        );
    }

    #[test]
    fn test_table_text_non_percentage() {
        assert_eq!(
            iso().table_text(&formatted(CellValue::Number(0.5), "0.00")),
            Some("0.5".to_string())
        );
        // 文字列セルには書式を適用しない
        assert_eq!(
            iso().table_text(&formatted(CellValue::String("abc".to_string()), "0%")),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_is_percent_format() {
        assert!(is_percent_format("0%"));
        assert!(is_percent_format("0.00%"));
        assert!(is_percent_format("#,##0.0%;[Red]-#,##0.0%"));
        assert!(!is_percent_format("General"));
        assert!(!is_percent_format("0.00\"%\""));
        assert!(!is_percent_format("0.00\\%"));
        assert!(!is_percent_format("[$%-409]0.00"));
    }

    #[test]
    fn test_excel_serial_to_datetime_1900() {
        let dt = excel_serial_to_datetime(1.0, false).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(1900, 1, 1).unwrap());

        let dt = excel_serial_to_datetime(61.0, false).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(1900, 3, 1).unwrap());

        let dt = excel_serial_to_datetime(45658.0, false).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn test_excel_serial_to_datetime_1904() {
        let dt = excel_serial_to_datetime(0.0, true).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(1904, 1, 1).unwrap());

        let dt = excel_serial_to_datetime(365.0, true).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(1904, 12, 31).unwrap());
    }

    #[test]
    fn test_excel_serial_to_datetime_invalid() {
        assert!(excel_serial_to_datetime(-1.0, false).is_none());
        assert!(excel_serial_to_datetime(f64::NAN, false).is_none());
    }
}

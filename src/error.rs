//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// xlsxhtmlクレート全体で使用するエラー型
///
/// Excelファイルの読み込み、解析、セグメント分割、HTML出力の処理中に発生する
/// すべてのエラーを統一的に扱います。
///
/// # エラーの種類
///
/// - `Io`: I/O操作中に発生したエラー
/// - `Parse`: Excelファイルの解析中に発生したエラー（calamine由来）
/// - `Config`: 設定の検証に失敗したエラー
/// - `AmbiguousMerge`: 同じセルが複数の結合範囲に含まれているデータ品質エラー
/// - `SecurityViolation`: ZIP bombやパストラバーサルなどのセキュリティ制限違反
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxhtml::XlsxToHtmlError;
/// use std::fs::File;
///
/// fn read_excel_file(path: &str) -> Result<(), XlsxToHtmlError> {
///     let file = File::open(path)?;  // Ioエラーが自動的に変換される
///     // ... 処理 ...
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum XlsxToHtmlError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excelファイルの解析中に発生したエラー
    ///
    /// ファイル形式が不正、破損したファイルなどが原因となります。
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// UTF-8文字列の変換エラー（XML属性値の読み取り時）
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// ZIPアーカイブの解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// 数値の解析エラー
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// 設定の検証に失敗したエラー
    ///
    /// `ConverterBuilder::build()`時に無効な設定が検出された場合、
    /// またはシート選択で存在しないシートが指定された場合に発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use xlsxhtml::{ConverterBuilder, XlsxToHtmlError};
    ///
    /// let result = ConverterBuilder::new()
    ///     .with_min_table_cells(0)
    ///     .build();
    ///
    /// match result {
    ///     Err(XlsxToHtmlError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// 結合範囲が重なっているセル
    ///
    /// 1つのセル座標が複数の結合範囲に含まれている場合、どの値を採用すべきか
    /// 決定できないため、このエラーを返します。セグメント分割中は致命的ではなく、
    /// 該当行（またはテーブル）をスキップして処理を継続します。
    #[error("Ambiguous merge at sheet '{sheet}', cell {cell}: covered by {regions}")]
    AmbiguousMerge {
        /// シート名
        sheet: String,
        /// セルの座標（A1記法）
        cell: String,
        /// 重なっている結合範囲（例: "A1:B2, B1:C1"）
        regions: String,
    },

    /// レポートのJSONシリアライズエラー
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// セキュリティ制限に違反したエラー
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error: XlsxToHtmlError = io_err.into();

        match error {
            XlsxToHtmlError::Io(e) => {
                assert_eq!(e.kind(), io::ErrorKind::NotFound);
                assert_eq!(e.to_string(), "File not found");
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_parse_error_display() {
        let parse_err = calamine::Error::Msg("Corrupted file");
        let error: XlsxToHtmlError = parse_err.into();

        let error_msg = error.to_string();
        assert!(error_msg.contains("Failed to parse Excel file"));
        assert!(error_msg.contains("Corrupted file"));
    }

    #[test]
    fn test_config_error_display() {
        let error = XlsxToHtmlError::Config("Invalid date format: 'xyz'".to_string());
        let error_msg = error.to_string();

        assert!(error_msg.contains("Configuration error"));
        assert!(error_msg.contains("Invalid date format: 'xyz'"));
    }

    #[test]
    fn test_ambiguous_merge_display() {
        let error = XlsxToHtmlError::AmbiguousMerge {
            sheet: "Ventas".to_string(),
            cell: "B1".to_string(),
            regions: "A1:B2, B1:C1".to_string(),
        };

        let error_msg = error.to_string();
        assert!(error_msg.starts_with("Ambiguous merge"));
        assert!(error_msg.contains("Ventas"));
        assert!(error_msg.contains("B1"));
        assert!(error_msg.contains("A1:B2, B1:C1"));
    }

    #[test]
    fn test_error_conversion_with_question_mark() {
        fn io_operation() -> Result<(), XlsxToHtmlError> {
            let _file = std::fs::File::open("nonexistent_file.xlsx")?;
            Ok(())
        }

        match io_operation() {
            Err(XlsxToHtmlError::Io(_)) => {}
            _ => panic!("Expected Io error from ? operator"),
        }
    }

    #[test]
    fn test_parse_int_conversion() {
        fn parse() -> Result<u32, XlsxToHtmlError> {
            Ok("12x".parse::<u32>()?)
        }

        assert!(matches!(parse(), Err(XlsxToHtmlError::ParseInt(_))));
    }
}

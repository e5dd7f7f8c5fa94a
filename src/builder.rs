//! Builder Module
//!
//! Fluent Builder APIを提供し、`Converter`インスタンスを段階的に構築する。

use chrono::NaiveDate;
use rayon::prelude::*;
use std::io::{BufWriter, Read, Write};

use crate::api::{DateFormat, SheetSelector, Thresholds};
use crate::document::WorkbookDocument;
use crate::error::XlsxToHtmlError;
use crate::formatter::CellFormatter;
use crate::grid::SheetGrid;
use crate::parser::WorkbookParser;
use crate::security::SecurityConfig;
use crate::segment::{SheetBody, SheetSegmenter};

/// デフォルトで変換対象から除外するシート名
const DEFAULT_SKIPPED_SHEETS: [&str; 2] = ["índice", "datoscbox"];

/// シートページのデフォルトのスタイルシート
const DEFAULT_STYLESHEET: &str = "../css/styles.css";

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ConversionConfig {
    /// シート選択方式
    pub sheet_selector: SheetSelector,

    /// 日付形式
    pub date_format: DateFormat,

    /// 非表示要素を含めるか
    pub include_hidden: bool,

    /// 行分類・見出し判定のしきい値
    pub thresholds: Thresholds,

    /// 変換対象から除外するシート名
    pub skipped_sheets: Vec<String>,

    /// シートページのスタイルシートURL
    pub stylesheet: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            sheet_selector: SheetSelector::All,
            date_format: DateFormat::Iso8601,
            include_hidden: true,
            thresholds: Thresholds::default(),
            skipped_sheets: DEFAULT_SKIPPED_SHEETS.iter().map(|s| s.to_string()).collect(),
            stylesheet: DEFAULT_STYLESHEET.to_string(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Converter`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxhtml::{ConverterBuilder, SheetSelector};
///
/// # fn main() -> Result<(), xlsxhtml::XlsxToHtmlError> {
/// let converter = ConverterBuilder::new()
///     .with_sheet_selector(SheetSelector::Index(0))
///     .with_banner_min_len(12)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConverterBuilder {
    /// 内部設定（構築中）
    config: ConversionConfig,
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - シート選択: すべてのシート（`índice` と `datoscbox` を除く）
    /// - 日付形式: ISO 8601 (YYYY-MM-DD)
    /// - 非表示要素: 出力に含める
    /// - しきい値: `Thresholds::default()`
    /// - スタイルシート: `../css/styles.css`
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
        }
    }

    /// 変換対象のシートを選択する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxhtml::{ConverterBuilder, SheetSelector};
    ///
    /// let builder = ConverterBuilder::new()
    ///     .with_sheet_selector(SheetSelector::Name("Resumen".to_string()));
    /// ```
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.config.sheet_selector = selector;
        self
    }

    /// 日付の出力形式を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxhtml::{ConverterBuilder, DateFormat};
    ///
    /// let builder = ConverterBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%d/%m/%Y".to_string()));
    /// ```
    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.config.date_format = format;
        self
    }

    /// 非表示要素（非表示シート、行、列）を出力に含めるかを指定する
    ///
    /// # 引数
    ///
    /// * `include: bool`:
    ///   * `true`: 非表示要素を含める（デフォルト）
    ///   * `false`: 非表示要素をスキップ
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.include_hidden = include;
        self
    }

    /// しきい値をまとめて指定する
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.config.thresholds = thresholds;
        self
    }

    /// テーブル行と見なすために必要な、値を持つセルの最小数（1以上）
    pub fn with_min_table_cells(mut self, cells: usize) -> Self {
        self.config.thresholds.min_table_cells = cells;
        self
    }

    /// バナー行と見なす先頭セルの大文字テキストの長さ（この値を超えるとバナー）
    pub fn with_banner_min_len(mut self, len: usize) -> Self {
        self.config.thresholds.banner_min_len = len;
        self
    }

    /// セクション見出しと見なす大文字テキストの長さ（この値を超えると見出し）
    pub fn with_heading_min_len(mut self, len: usize) -> Self {
        self.config.thresholds.heading_min_len = len;
        self
    }

    /// 変換対象から除外するシート名を指定する（デフォルトを置き換える）
    ///
    /// シート名は前後の空白を除き、大文字・小文字を区別せずに比較されます。
    /// `SheetSelector::All` の場合のみ適用されます。
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxhtml::ConverterBuilder;
    ///
    /// let builder = ConverterBuilder::new()
    ///     .with_skipped_sheets(["Portada", "Notas"]);
    /// ```
    pub fn with_skipped_sheets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.skipped_sheets = names.into_iter().map(Into::into).collect();
        self
    }

    /// シートページが参照するスタイルシートのURLを指定する
    pub fn with_stylesheet(mut self, href: impl Into<String>) -> Self {
        self.config.stylesheet = href.into();
        self
    }

    /// 設定を検証し、`Converter`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Converter)`: 設定が有効な場合、Converterインスタンス
    /// * `Err(XlsxToHtmlError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * `XlsxToHtmlError::Config(String)`: 設定の検証に失敗した場合
    ///   * `min_table_cells` が0
    ///   * カスタム日付形式が不正な書式文字列
    pub fn build(self) -> Result<Converter, XlsxToHtmlError> {
        // 1. しきい値の検証
        if self.config.thresholds.min_table_cells == 0 {
            return Err(XlsxToHtmlError::Config(
                "Invalid threshold: min_table_cells must be at least 1".to_string(),
            ));
        }

        // 2. カスタム日付形式の検証
        if let DateFormat::Custom(ref format_str) = self.config.date_format {
            let test_date = NaiveDate::from_ymd_opt(2025, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| XlsxToHtmlError::Config("Failed to create test date".to_string()))?;

            // chronoは不正な書式指定子をDisplay時のエラーとして報告する
            let mut formatted = String::new();
            let valid = std::fmt::Write::write_fmt(
                &mut formatted,
                format_args!("{}", test_date.format(format_str)),
            )
            .is_ok();
            if !valid || formatted.is_empty() {
                return Err(XlsxToHtmlError::Config(format!(
                    "Invalid date format string: '{}'",
                    format_str
                )));
            }
        }

        Ok(Converter::new(self.config))
    }
}

/// 変換処理のファサード
///
/// Excelファイルを意味的なHTML断片に変換するためのメインエントリーポイントです。
/// `ConverterBuilder`を使用して構築された設定に基づいて変換処理を実行します。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxhtml::ConverterBuilder;
/// use std::fs::File;
///
/// # fn main() -> Result<(), xlsxhtml::XlsxToHtmlError> {
/// let converter = ConverterBuilder::new().build()?;
/// let input = File::open("informe.xlsx")?;
/// let workbook = converter.convert_workbook(input, "informe")?;
/// for sheet in workbook.sheets() {
///     println!("{} -> {}", sheet.title(), sheet.file_name());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Converter {
    /// 変換設定
    config: ConversionConfig,

    /// セルフォーマッター
    formatter: CellFormatter,
}

impl Converter {
    pub(crate) fn new(config: ConversionConfig) -> Self {
        Self {
            formatter: CellFormatter::new(config.date_format.clone()),
            config,
        }
    }

    /// 有効なしきい値
    pub fn thresholds(&self) -> &Thresholds {
        &self.config.thresholds
    }

    /// シートページのスタイルシートURL
    pub fn stylesheet(&self) -> &str {
        &self.config.stylesheet
    }

    /// Excelファイルをワークブック文書に変換
    ///
    /// # 引数
    ///
    /// * `input` - Excelファイルを読み込むためのリーダー
    /// * `name` - ワークブック名（索引ページとレポートに使用）
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookDocument)` - 選択されたシートの文書（ワークブック内の順序）
    /// * `Err(XlsxToHtmlError)` - 読み込みまたは解析に失敗した場合
    pub fn convert_workbook<R: Read>(
        &self,
        input: R,
        name: &str,
    ) -> Result<WorkbookDocument, XlsxToHtmlError> {
        let sheets = self.segment_workbook(input)?;
        Ok(WorkbookDocument::new(name, sheets))
    }

    /// Excelファイルを変換し、各シートの本文HTMLを書き込む
    ///
    /// 各シートの本文の前に `<!-- Sheet: {name} -->` を出力します。
    ///
    /// # 処理フロー
    ///
    /// 1. 入力データをメモリに読み込む（サイズ制限あり）
    /// 2. シート選択
    /// 3. 各シートを並列にパース・セグメント分割
    /// 4. シート順に出力
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxhtml::ConverterBuilder;
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), xlsxhtml::XlsxToHtmlError> {
    /// let converter = ConverterBuilder::new().build()?;
    /// let input = File::open("informe.xlsx")?;
    /// converter.convert(input, std::io::stdout())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert<R: Read, W: Write>(&self, input: R, mut output: W) -> Result<(), XlsxToHtmlError> {
        let sheets = self.segment_workbook(input)?;

        let mut writer = BufWriter::new(&mut output);
        for (sheet_idx, (sheet_name, body)) in sheets.iter().enumerate() {
            if sheet_idx > 0 {
                writeln!(writer)?;
            }
            writeln!(writer, "<!-- Sheet: {} -->", html_escape::encode_text(sheet_name))?;
            body.write_html(&mut writer)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Excelファイルを変換し、本文HTMLを文字列として返す
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use std::fs::File;
    /// use xlsxhtml::ConverterBuilder;
    ///
    /// # fn main() -> Result<(), xlsxhtml::XlsxToHtmlError> {
    /// let converter = ConverterBuilder::new().build()?;
    /// let html = converter.convert_to_string(File::open("informe.xlsx")?)?;
    /// println!("{}", html);
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert_to_string<R: Read>(&self, input: R) -> Result<String, XlsxToHtmlError> {
        let mut buffer = Vec::new();
        self.convert(input, &mut buffer)?;

        String::from_utf8(buffer)
            .map_err(|e| XlsxToHtmlError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    /// 入力を読み込み、選択されたシートをセグメント分割する
    fn segment_workbook<R: Read>(
        &self,
        input: R,
    ) -> Result<Vec<(String, SheetBody)>, XlsxToHtmlError> {
        // 1. 入力データをメモリに読み込む（並列処理のため）
        let buffer = SecurityConfig::default().read_input(input)?;

        // 2. シート選択（メタデータは1回だけ解析して再利用）
        let parser = WorkbookParser::open_with_metadata(&buffer)?;
        let sheet_names = parser.select_sheets(
            &self.config.sheet_selector,
            self.config.include_hidden,
            &self.config.skipped_sheets,
        )?;
        let metadata = parser.metadata().clone();

        // 3. 各シートの処理を並列化
        let results: Result<Vec<(usize, String, SheetBody)>, XlsxToHtmlError> = sheet_names
            .par_iter()
            .enumerate()
            .map(|(sheet_idx, sheet_name)| {
                let mut parser =
                    WorkbookParser::open_with_existing_metadata(&buffer, metadata.clone())?;
                let body = self.segment_sheet(&mut parser, sheet_name)?;
                Ok((sheet_idx, sheet_name.clone(), body))
            })
            .collect();

        let mut results = results?;

        // 結果をインデックス順にソート（並列処理の順序を保証）
        results.sort_by_key(|(idx, _, _)| *idx);

        Ok(results
            .into_iter()
            .map(|(_, sheet_name, body)| (sheet_name, body))
            .collect())
    }

    /// 1シートをパースしてセグメント分割する
    fn segment_sheet(
        &self,
        parser: &mut WorkbookParser,
        sheet_name: &str,
    ) -> Result<SheetBody, XlsxToHtmlError> {
        let (metadata, raw_cells) = parser.parse_sheet(sheet_name, &self.config)?;

        log::debug!(
            "sheet #{} '{}': {} cells, {} merged regions",
            metadata.index,
            metadata.name,
            raw_cells.len(),
            metadata.merged_regions.len()
        );

        let grid = SheetGrid::new(metadata.name, raw_cells, metadata.merged_regions)
            .with_hidden_rows(metadata.hidden_rows)
            .with_hidden_cols(metadata.hidden_cols);

        Ok(SheetSegmenter::new(&grid, self.config.thresholds, self.formatter.clone()).run())
    }
}

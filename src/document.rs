//! Document Assembly
//!
//! セグメント分割済みのシート本文から、シートページ・ワークブック索引・ライブラリ索引の
//! HTML文書を組み立てるモジュール。ここではI/Oを行わず、文字列のみを生成します。

use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write as _;

use crate::error::XlsxToHtmlError;
use crate::output::FragmentKind;
use crate::segment::{DataQualityIssue, SheetBody};

/// スラッグが空になった場合に使用するファイル名の基底
const FALLBACK_SLUG: &str = "hoja";

/// ワークブック索引のファイル名
pub const INDEX_FILE_NAME: &str = "index.html";

/// テキストをファイル名に使えるスラッグに変換する
///
/// 小文字化し、単語構成文字・空白・`-` 以外を除去したうえで、空白と `-` の連続を
/// 1つの `-` にまとめ、前後の `-` と `_` を取り除きます。Unicodeの文字はそのまま残ります。
///
/// # 使用例
///
/// ```rust
/// use xlsxhtml::slugify;
///
/// assert_eq!(slugify("Planes de Remediación"), "planes-de-remediación");
/// assert_eq!(slugify("  Ventas -- 2024 (Q1) "), "ventas-2024-q1");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for ch in text.to_lowercase().chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_dash = true;
        } else if ch.is_alphanumeric() || ch == '_' {
            if pending_dash {
                slug.push('-');
                pending_dash = false;
            }
            slug.push(ch);
        }
    }

    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// 1シート分の文書
#[derive(Debug, Clone)]
pub struct SheetDocument {
    sheet_name: String,
    file_name: String,
    body: SheetBody,
}

impl SheetDocument {
    /// シート名
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// シートタイトル
    pub fn title(&self) -> &str {
        self.body.title()
    }

    /// 出力ファイル名（例: `"resumen-general.html"`）
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// セグメント分割結果
    pub fn body(&self) -> &SheetBody {
        &self.body
    }

    /// 完全なHTMLページを生成する
    ///
    /// # 引数
    ///
    /// * `workbook_name` - ワークブック名（`<title>` に使用）
    /// * `stylesheet` - スタイルシートのURL
    pub fn render_page(&self, workbook_name: &str, stylesheet: &str) -> String {
        let title = encode_text(self.title());
        let mut html = String::new();

        let _ = writeln!(html, "<!DOCTYPE html>\n<html>\n<head>");
        let _ = writeln!(html, "    <meta charset=\"UTF-8\">");
        let _ = writeln!(html, "    <title>{} - {}</title>", title, encode_text(workbook_name));
        let _ = writeln!(
            html,
            "    <link rel=\"stylesheet\" href=\"{}\">",
            encode_double_quoted_attribute(stylesheet)
        );
        let _ = writeln!(html, "</head>\n<body>\n    <header>");
        let _ = writeln!(html, "        <h1>{}</h1>", title);
        let _ = writeln!(
            html,
            "        <a href=\"{}\" class=\"btn-volver\">Volver al índice</a>",
            INDEX_FILE_NAME
        );
        let _ = writeln!(html, "    </header>\n    <div class=\"contenido-hoja\">");
        html.push_str(&self.body.html());
        let _ = writeln!(html, "    </div>\n</body>\n</html>");

        html
    }
}

/// ワークブック1冊分の文書
#[derive(Debug, Clone)]
pub struct WorkbookDocument {
    name: String,
    sheets: Vec<SheetDocument>,
}

impl WorkbookDocument {
    /// シートの本文からワークブック文書を組み立てる
    ///
    /// ファイル名はシート名のスラッグから生成し、重複する場合は `-2`, `-3`, ... を付けて
    /// ワークブック内で一意にします。
    ///
    /// # 引数
    ///
    /// * `name` - ワークブック名（通常は拡張子を除いたファイル名）
    /// * `sheets` - (シート名, 本文) のリスト（出力順）
    pub fn new(name: impl Into<String>, sheets: Vec<(String, SheetBody)>) -> Self {
        let mut used = HashSet::new();
        let sheets = sheets
            .into_iter()
            .map(|(sheet_name, body)| {
                let mut base = slugify(&sheet_name);
                if base.is_empty() {
                    base = FALLBACK_SLUG.to_string();
                }

                let mut file_name = format!("{}.html", base);
                let mut n = 2;
                while !used.insert(file_name.clone()) || file_name == INDEX_FILE_NAME {
                    file_name = format!("{}-{}.html", base, n);
                    n += 1;
                }

                SheetDocument {
                    sheet_name,
                    file_name,
                    body,
                }
            })
            .collect();

        Self {
            name: name.into(),
            sheets,
        }
    }

    /// ワークブック名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// シート文書（出力順）
    pub fn sheets(&self) -> &[SheetDocument] {
        &self.sheets
    }

    /// すべてのシートのデータ品質の問題
    pub fn issues(&self) -> impl Iterator<Item = &DataQualityIssue> {
        self.sheets.iter().flat_map(|s| s.body.issues())
    }

    /// ワークブック索引ページを生成する
    ///
    /// 各シートのタイトルをそのシートのファイルへのリンクとして列挙し、
    /// ライブラリ索引（`../index.html`）への戻りリンクを含めます。
    pub fn render_index(&self, stylesheet: &str) -> String {
        let name = encode_text(&self.name);
        let mut html = String::new();

        let _ = writeln!(html, "<!DOCTYPE html>\n<html>\n<head>");
        let _ = writeln!(html, "    <meta charset=\"UTF-8\">");
        let _ = writeln!(html, "    <title>Indice - {}</title>", name);
        let _ = writeln!(
            html,
            "    <link rel=\"stylesheet\" href=\"{}\">",
            encode_double_quoted_attribute(stylesheet)
        );
        let _ = writeln!(html, "</head>\n<body>\n    <header>");
        let _ = writeln!(html, "        <h1>{}</h1>", name);
        let _ = writeln!(
            html,
            "        <a href=\"../{}\" class=\"btn-volver\">Volver al índice de Libros</a>",
            INDEX_FILE_NAME
        );
        let _ = writeln!(html, "    </header>");
        write_link_list(
            &mut html,
            self.sheets
                .iter()
                .map(|s| (s.file_name.to_string(), s.title())),
        );
        let _ = writeln!(html, "</body>\n</html>");

        html
    }

    /// 変換結果のJSONレポートを生成する
    pub fn report_json(&self) -> Result<String, XlsxToHtmlError> {
        #[derive(Serialize)]
        struct SheetReport<'a> {
            sheet: &'a str,
            title: &'a str,
            file: &'a str,
            headings: usize,
            texts: usize,
            tables: usize,
            issues: &'a [DataQualityIssue],
        }

        #[derive(Serialize)]
        struct WorkbookReport<'a> {
            workbook: &'a str,
            sheets: Vec<SheetReport<'a>>,
        }

        let count = |body: &SheetBody, kind: FragmentKind| {
            body.fragments().iter().filter(|f| f.kind() == kind).count()
        };

        let report = WorkbookReport {
            workbook: &self.name,
            sheets: self
                .sheets
                .iter()
                .map(|s| SheetReport {
                    sheet: &s.sheet_name,
                    title: s.title(),
                    file: &s.file_name,
                    headings: count(&s.body, FragmentKind::SectionHeading),
                    texts: count(&s.body, FragmentKind::TextContent),
                    tables: count(&s.body, FragmentKind::Table),
                    issues: s.body.issues(),
                })
                .collect(),
        };

        Ok(serde_json::to_string_pretty(&report)?)
    }
}

/// ライブラリ索引ページを生成する
///
/// 各ワークブックを `{name}/index.html` へのリンクとして列挙します。
pub fn render_library_index(workbooks: &[WorkbookDocument], stylesheet: &str) -> String {
    let mut html = String::new();

    let _ = writeln!(html, "<!DOCTYPE html>\n<html>\n<head>");
    let _ = writeln!(html, "    <meta charset=\"UTF-8\">");
    let _ = writeln!(html, "    <title>Libros</title>");
    let _ = writeln!(
        html,
        "    <link rel=\"stylesheet\" href=\"{}\">",
        encode_double_quoted_attribute(stylesheet)
    );
    let _ = writeln!(html, "</head>\n<body>\n    <header><h1>Libros</h1></header>");
    write_link_list(
        &mut html,
        workbooks
            .iter()
            .map(|w| (format!("{}/{}", w.name, INDEX_FILE_NAME), w.name.as_str())),
    );
    let _ = writeln!(html, "</body>\n</html>");

    html
}

fn write_link_list<'a>(html: &mut String, links: impl Iterator<Item = (String, &'a str)>) {
    let _ = writeln!(html, "    <div class=\"contenedor-indice\">");
    let _ = writeln!(html, "        <h2>Indice de Contenidos</h2>");
    let _ = writeln!(html, "        <ul class=\"lista-indice\">");
    for (href, label) in links {
        let _ = writeln!(
            html,
            "            <li><a href=\"{}\">{}</a></li>",
            encode_double_quoted_attribute(&href),
            encode_text(label)
        );
    }
    let _ = writeln!(html, "        </ul>\n    </div>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Thresholds;
    use crate::grid::SheetGrid;
    use crate::segment::segment_sheet;
    use crate::types::{CellValue, RawCellData};

    fn body(title: &str) -> SheetBody {
        let cells = vec![
            RawCellData::new(0, 0, CellValue::String(title.to_string())),
            RawCellData::new(2, 0, CellValue::String("Region".to_string())),
            RawCellData::new(2, 1, CellValue::String("Total".to_string())),
            RawCellData::new(3, 0, CellValue::String("Norte".to_string())),
            RawCellData::new(3, 1, CellValue::Number(10.0)),
        ];
        segment_sheet(&SheetGrid::new("x", cells, vec![]), &Thresholds::default())
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Planes de Remediación"), "planes-de-remediación");
        assert_eq!(slugify("Hoja 1"), "hoja-1");
        assert_eq!(slugify("--A & B__"), "a-b");
        assert_eq!(slugify("snake_case name"), "snake_case-name");
        assert_eq!(slugify("%%%"), "");
    }

    #[test]
    fn test_file_names_are_unique() {
        let doc = WorkbookDocument::new(
            "libro",
            vec![
                ("Resumen".to_string(), body("A")),
                ("resumen".to_string(), body("B")),
                ("???".to_string(), body("C")),
                ("Index".to_string(), body("D")),
            ],
        );
        let names: Vec<&str> = doc.sheets().iter().map(|s| s.file_name()).collect();
        assert_eq!(names, vec!["resumen.html", "resumen-2.html", "hoja.html", "index-2.html"]);
    }

    #[test]
    fn test_render_page() {
        let doc = WorkbookDocument::new("Informe <2024>", vec![("Ventas".to_string(), body("Ventas & Costos"))]);
        let page = doc.sheets()[0].render_page(doc.name(), "../css/styles.css");

        assert!(page.contains("<title>Ventas &amp; Costos - Informe &lt;2024&gt;</title>"));
        assert!(page.contains("<link rel=\"stylesheet\" href=\"../css/styles.css\">"));
        assert!(page.contains("<h1>Ventas &amp; Costos</h1>"));
        assert!(page.contains("<a href=\"index.html\" class=\"btn-volver\">"));
        assert!(page.contains("<div class=\"contenido-hoja\">\n<div class=\"tabla-contenedor\">"));
        assert!(page.ends_with("</html>\n"));
    }

    #[test]
    fn test_render_index_lists_sheet_titles() {
        let doc = WorkbookDocument::new(
            "libro",
            vec![
                ("Hoja1".to_string(), body("Resumen General")),
                ("Hoja2".to_string(), body("Detalle")),
            ],
        );
        let index = doc.render_index("../css/styles.css");

        assert!(index.contains("<li><a href=\"hoja1.html\">Resumen General</a></li>"));
        assert!(index.contains("<li><a href=\"hoja2.html\">Detalle</a></li>"));
        assert!(index.contains("href=\"../index.html\""));
    }

    #[test]
    fn test_render_library_index() {
        let docs = vec![
            WorkbookDocument::new("dominio-a", vec![]),
            WorkbookDocument::new("dominio-b", vec![]),
        ];
        let index = render_library_index(&docs, "css/styles.css");
        assert!(index.contains("<li><a href=\"dominio-a/index.html\">dominio-a</a></li>"));
        assert!(index.contains("<li><a href=\"dominio-b/index.html\">dominio-b</a></li>"));
    }

    #[test]
    fn test_report_json() {
        let doc = WorkbookDocument::new("libro", vec![("Hoja1".to_string(), body("Resumen"))]);
        let report: serde_json::Value = serde_json::from_str(&doc.report_json().unwrap()).unwrap();

        assert_eq!(report["workbook"], "libro");
        assert_eq!(report["sheets"][0]["title"], "Resumen");
        assert_eq!(report["sheets"][0]["file"], "hoja1.html");
        assert_eq!(report["sheets"][0]["tables"], 1);
        assert_eq!(report["sheets"][0]["issues"].as_array().map(Vec::len), Some(0));
    }
}

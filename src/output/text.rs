//! Text Block Rendering

use std::io::Write;

use super::write_escaped;
use crate::api::Thresholds;
use crate::error::XlsxToHtmlError;
use crate::segment::is_upper_case;

/// 独立テキスト行を見出しまたはテキストブロックとして描画する
///
/// 値を持つセルを半角スペースで連結します。連結結果がシートタイトルと一致する場合は
/// 何も書き込みません（タイトルはページヘッダーとして別途出力されるため）。
///
/// # 戻り値
///
/// * `Ok(true)` - 見出しを書き込んだ場合
/// * `Ok(false)` - テキストブロックを書き込んだ、または何も書き込まなかった場合
pub(crate) fn render_text<W: Write>(
    values: &[Option<String>],
    sheet_title: &str,
    thresholds: &Thresholds,
    writer: &mut W,
) -> Result<bool, XlsxToHtmlError> {
    let text = values
        .iter()
        .flatten()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() || text == sheet_title.trim() {
        return Ok(false);
    }

    let heading = is_upper_case(&text) && text.chars().count() > thresholds.heading_min_len;
    if heading {
        write!(writer, "<h2 class=\"titulo-seccion\">")?;
        write_escaped(writer, &text)?;
        writeln!(writer, "</h2>")?;
    } else {
        write!(writer, "<div class=\"texto-contenido\">")?;
        write_escaped(writer, &text)?;
        writeln!(writer, "</div>")?;
    }

    Ok(heading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::render_to_string;

    fn render(values: &[Option<String>], title: &str) -> String {
        render_to_string(|w| render_text(values, title, &Thresholds::default(), w).map(|_| ()))
            .unwrap()
    }

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn test_render_heading() {
        assert_eq!(
            render(&[s("RESUMEN ANUAL"), None], "Informe"),
            "<h2 class=\"titulo-seccion\">RESUMEN ANUAL</h2>\n"
        );
    }

    #[test]
    fn test_render_short_uppercase_is_text() {
        // 7文字以下の大文字テキストは見出しにならない
        assert_eq!(
            render(&[s("NOTAS")], "Informe"),
            "<div class=\"texto-contenido\">NOTAS</div>\n"
        );
    }

    #[test]
    fn test_render_joins_values() {
        assert_eq!(
            render(&[s("Fuente:"), None, s(" elaboración propia ")], "Informe"),
            "<div class=\"texto-contenido\">Fuente: elaboración propia</div>\n"
        );
    }

    #[test]
    fn test_render_suppresses_sheet_title() {
        assert_eq!(render(&[s("Informe de Ventas")], " Informe de Ventas "), "");
    }

    #[test]
    fn test_heading_threshold_is_configurable() {
        let thresholds = Thresholds {
            heading_min_len: 3,
            ..Thresholds::default()
        };
        let html = render_to_string(|w| render_text(&[s("NOTAS")], "", &thresholds, w).map(|_| ()))
            .unwrap();
        assert!(html.starts_with("<h2"));
    }
}

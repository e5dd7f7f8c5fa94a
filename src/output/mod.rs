//! Output Fragment Module
//!
//! セグメント分割の結果として生成されるHTML断片と、その描画関数を提供するモジュール。
//! 描画関数はすべて`Write`に書き込み、断片は不変の文字列として保持されます。

mod table;
mod text;

use serde::Serialize;
use std::io::Write;

use crate::error::XlsxToHtmlError;

pub use table::{merge_headers, HeaderCell};
pub(crate) use table::{render_table, TableBlock};
pub(crate) use text::render_text;

/// 断片の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// セクション見出し（`<h2 class="titulo-seccion">`）
    SectionHeading,
    /// テキスト（`<div class="texto-contenido">`）
    TextContent,
    /// テーブルコンテナ（`<div class="tabla-contenedor">`）
    Table,
    /// 空の断片（シートタイトルの重複行など）
    Empty,
}

/// HTML断片
///
/// 生成後は変更されません。シートの本文は断片をスキャン順に連結したものです。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    kind: FragmentKind,
    html: String,
}

impl Fragment {
    pub(crate) fn new(kind: FragmentKind, html: String) -> Self {
        Self { kind, html }
    }

    /// 空の断片
    pub fn empty() -> Self {
        Self::new(FragmentKind::Empty, String::new())
    }

    /// 断片の種類
    pub fn kind(&self) -> FragmentKind {
        self.kind
    }

    /// HTML文字列
    pub fn html(&self) -> &str {
        &self.html
    }

    /// 空の断片かどうか
    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }
}

/// `Write`ベースの描画関数を実行し、結果を文字列として受け取る
pub(crate) fn render_to_string<F>(render: F) -> Result<String, XlsxToHtmlError>
where
    F: FnOnce(&mut Vec<u8>) -> Result<(), XlsxToHtmlError>,
{
    let mut buffer = Vec::new();
    render(&mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| XlsxToHtmlError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// テキストをHTMLエスケープして書き込む
pub(crate) fn write_escaped<W: Write>(writer: &mut W, text: &str) -> Result<(), XlsxToHtmlError> {
    write!(writer, "{}", html_escape::encode_text(text))?;
    Ok(())
}

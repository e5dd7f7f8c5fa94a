//! XML Metadata Parser Module
//!
//! XLSX内部のXMLファイルから、calamineで取得不可能な情報を抽出するモジュール。
//! セルごとの数値書式、非表示行/列、非表示シート、1904年エポック判定を提供します。

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};
use zip::ZipArchive;

use crate::error::XlsxToHtmlError;
use crate::security::SecurityConfig;

/// セルスタイル情報（cellXfs要素）
#[derive(Debug, Clone)]
struct CellXf {
    num_fmt_id: u32,
}

/// workbook.xml の `<sheet>` 要素
#[derive(Debug, Clone)]
struct SheetEntry {
    name: String,
    hidden: bool,
    /// ワークシートXMLのパス（例: "xl/worksheets/sheet1.xml"）
    part: Option<String>,
}

/// ワークシートXMLから抽出した情報
#[derive(Debug, Clone, Default)]
struct WorksheetInfo {
    hidden_rows: HashSet<u32>,
    hidden_cols: HashSet<u32>,
    /// (row, col) -> スタイルID（0以外のみ）
    cell_styles: HashMap<(u32, u32), u32>,
}

/// XLSXメタデータパーサー
///
/// XLSXファイル（ZIPアーカイブ）からXMLを直接解析し、
/// calamineで取得できない情報を抽出します。
#[derive(Debug, Clone)]
pub(crate) struct XlsxMetadataParser {
    /// numFmtId -> formatCode のマッピング
    num_formats: HashMap<u32, String>,
    /// styleId -> CellXf のマッピング
    cell_xfs: Vec<CellXf>,
    /// ワークブック内のシート（定義順）
    sheets: Vec<SheetEntry>,
    /// シート名 -> ワークシート情報
    worksheets: HashMap<String, WorksheetInfo>,
    /// 1904年エポックを使用するかどうか
    is_1904: bool,
}

impl XlsxMetadataParser {
    /// XLSXファイル（ZIPアーカイブ）からメタデータを解析
    ///
    /// XMLを読む前に、アーカイブ全体に対してセキュリティ制限を検証します。
    ///
    /// # 戻り値
    ///
    /// * `Ok(XlsxMetadataParser)` - メタデータの解析に成功した場合
    /// * `Err(XlsxToHtmlError::SecurityViolation)` - セキュリティ制限に違反した場合
    /// * `Err(XlsxToHtmlError)` - その他の解析エラー
    pub fn new<R: Read + Seek>(xlsx_reader: R) -> Result<Self, XlsxToHtmlError> {
        let mut archive =
            ZipArchive::new(xlsx_reader).map_err(|e| XlsxToHtmlError::Zip(format!("{}", e)))?;

        SecurityConfig::default().check_archive(&mut archive)?;

        // 1. xl/styles.xml
        let (num_formats, cell_xfs) = match read_part(&mut archive, "xl/styles.xml")? {
            Some(xml) => Self::parse_styles(&xml)?,
            None => (HashMap::new(), Vec::new()),
        };

        // 2. xl/workbook.xml（1904年エポック、シート一覧）
        let (is_1904, raw_sheets) = match read_part(&mut archive, "xl/workbook.xml")? {
            Some(xml) => Self::parse_workbook(&xml)?,
            None => (false, Vec::new()),
        };

        // 3. xl/_rels/workbook.xml.rels（rId -> ワークシートパス）
        let relationships = match read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
            Some(xml) => Self::parse_relationships(&xml)?,
            None => HashMap::new(),
        };

        let sheets: Vec<SheetEntry> = raw_sheets
            .into_iter()
            .map(|(name, hidden, rel_id)| SheetEntry {
                part: rel_id
                    .and_then(|id| relationships.get(&id))
                    .map(|target| resolve_target(target)),
                name,
                hidden,
            })
            .collect();

        // 4. 各ワークシートXML
        let mut worksheets = HashMap::new();
        for sheet in &sheets {
            let Some(part) = &sheet.part else { continue };
            if let Some(xml) = read_part(&mut archive, part)? {
                worksheets.insert(sheet.name.clone(), Self::parse_worksheet_xml(&xml)?);
            }
        }

        Ok(Self {
            num_formats,
            cell_xfs,
            sheets,
            worksheets,
            is_1904,
        })
    }

    /// styleIdからNumber Format Stringを取得
    ///
    /// # 戻り値
    ///
    /// * `Some(&str)` - フォーマット文字列が見つかった場合
    /// * `None` - スタイルIDが範囲外、またはフォーマットが見つからない場合
    pub fn get_format_string(&self, style_id: u32) -> Option<&str> {
        self.cell_xfs.get(style_id as usize).and_then(|xf| {
            // カスタム定義はビルトインIDの上書きにも使われるため先に参照する
            self.num_formats
                .get(&xf.num_fmt_id)
                .map(|s| s.as_str())
                .or_else(|| get_builtin_format(xf.num_fmt_id))
        })
    }

    /// セルの数値書式を取得
    ///
    /// # 引数
    ///
    /// * `sheet_name` - シート名
    /// * `row`, `col` - セル座標（0始まり）
    pub fn cell_format(&self, sheet_name: &str, row: u32, col: u32) -> Option<&str> {
        let style_id = self
            .worksheets
            .get(sheet_name)
            .and_then(|ws| ws.cell_styles.get(&(row, col)))
            .copied()
            .unwrap_or(0);
        self.get_format_string(style_id)
    }

    /// 非表示行のインデックス（0始まり、昇順）
    pub fn hidden_rows(&self, sheet_name: &str) -> Vec<u32> {
        self.worksheets
            .get(sheet_name)
            .map(|ws| sorted(&ws.hidden_rows))
            .unwrap_or_default()
    }

    /// 非表示列のインデックス（0始まり、昇順）
    pub fn hidden_cols(&self, sheet_name: &str) -> Vec<u32> {
        self.worksheets
            .get(sheet_name)
            .map(|ws| sorted(&ws.hidden_cols))
            .unwrap_or_default()
    }

    /// シートが非表示（hidden / veryHidden）かどうか
    pub fn is_sheet_hidden(&self, sheet_name: &str) -> bool {
        self.sheets
            .iter()
            .any(|s| s.name == sheet_name && s.hidden)
    }

    /// 1904年エポックを使用するかどうか
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    /// xl/styles.xml の解析
    ///
    /// `<numFmts>` と `<cellXfs>` を解析します。`<cellStyleXfs>` 内の `<xf>` は対象外です。
    fn parse_styles(xml: &[u8]) -> Result<(HashMap<u32, String>, Vec<CellXf>), XlsxToHtmlError> {
        let mut num_formats = HashMap::new();
        let mut cell_xfs = Vec::new();

        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut in_cell_xfs = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"numFmt" => {
                        // <numFmt numFmtId="165" formatCode="0.000%"/>
                        let mut id: Option<u32> = None;
                        let mut code: Option<String> = None;
                        for attr in e.attributes() {
                            let attr = attr.map_err(xml_attr_error)?;
                            match attr.key.as_ref() {
                                b"numFmtId" => id = Some(std::str::from_utf8(&attr.value)?.parse()?),
                                b"formatCode" => {
                                    let value = attr
                                        .decode_and_unescape_value(&reader)
                                        .map_err(xml_error)?;
                                    code = Some(value.into_owned());
                                }
                                _ => {}
                            }
                        }
                        if let (Some(id), Some(code)) = (id, code) {
                            num_formats.insert(id, code);
                        }
                    }
                    b"cellXfs" => in_cell_xfs = true,
                    b"xf" if in_cell_xfs => {
                        // <xf numFmtId="10" fontId="0" fillId="0" borderId="0" applyNumberFormat="1"/>
                        let num_fmt_id = match attribute(&e, b"numFmtId")? {
                            Some(v) => v.parse()?,
                            None => 0,
                        };
                        cell_xfs.push(CellXf { num_fmt_id });
                    }
                    _ => {}
                },
                Ok(Event::End(e)) => {
                    if e.name().as_ref() == b"cellXfs" {
                        in_cell_xfs = false;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok((num_formats, cell_xfs))
    }

    /// xl/workbook.xml の解析
    ///
    /// `<workbookPr date1904="1"/>` と `<sheet name=".." state="hidden" r:id=".."/>` を読み取ります。
    #[allow(clippy::type_complexity)]
    fn parse_workbook(
        xml: &[u8],
    ) -> Result<(bool, Vec<(String, bool, Option<String>)>), XlsxToHtmlError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut is_1904 = false;
        let mut sheets = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"workbookPr" => {
                        if let Some(value) = attribute(&e, b"date1904")? {
                            is_1904 = value == "1" || value == "true";
                        }
                    }
                    b"sheet" => {
                        let mut name = None;
                        let mut hidden = false;
                        let mut rel_id = None;
                        for attr in e.attributes() {
                            let attr = attr.map_err(xml_attr_error)?;
                            match attr.key.as_ref() {
                                b"name" => {
                                    name = Some(
                                        attr.decode_and_unescape_value(&reader)
                                            .map_err(xml_error)?
                                            .into_owned(),
                                    )
                                }
                                b"state" => {
                                    let state = std::str::from_utf8(&attr.value)?;
                                    hidden = state == "hidden" || state == "veryHidden";
                                }
                                b"r:id" => rel_id = Some(std::str::from_utf8(&attr.value)?.to_string()),
                                _ => {}
                            }
                        }
                        if let Some(name) = name {
                            sheets.push((name, hidden, rel_id));
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok((is_1904, sheets))
    }

    /// リレーションシップファイルを解析（Id -> Target）
    fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, XlsxToHtmlError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut relationships = HashMap::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    if e.name().as_ref() == b"Relationship" {
                        let id = attribute(&e, b"Id")?;
                        let target = attribute(&e, b"Target")?;
                        if let (Some(id), Some(target)) = (id, target) {
                            relationships.insert(id, target);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(relationships)
    }

    /// ワークシートXMLから非表示行・列とセルのスタイルIDを解析
    fn parse_worksheet_xml(xml: &[u8]) -> Result<WorksheetInfo, XlsxToHtmlError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut info = WorksheetInfo::default();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"col" => {
                        // <col min="3" max="4" width="0" hidden="1"/>（1始まり）
                        if is_true(attribute(&e, b"hidden")?.as_deref()) {
                            let min: u32 = attribute(&e, b"min")?.unwrap_or_default().parse()?;
                            let max: u32 = attribute(&e, b"max")?.unwrap_or_default().parse()?;
                            let (min, max) = (min.saturating_sub(1), max.saturating_sub(1));
                            // 範囲が列の上限（16384列）を超えることはない
                            info.hidden_cols.extend(min..=max.min(16_383));
                        }
                    }
                    b"row" => {
                        // <row r="15" hidden="1">
                        if is_true(attribute(&e, b"hidden")?.as_deref()) {
                            if let Some(r) = attribute(&e, b"r")? {
                                let r: u32 = r.parse()?;
                                info.hidden_rows.insert(r.saturating_sub(1));
                            }
                        }
                    }
                    b"c" => {
                        // <c r="B2" s="3" t="n">
                        let cell_ref = attribute(&e, b"r")?;
                        let style = attribute(&e, b"s")?;
                        if let (Some(cell_ref), Some(style)) = (cell_ref, style) {
                            let style: u32 = style.parse()?;
                            if style != 0 {
                                if let Some(coord) = parse_cell_ref(&cell_ref) {
                                    info.cell_styles.insert(coord, style);
                                }
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(info)
    }
}

/// アーカイブ内のファイルを読み込む（存在しない場合は`None`）
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, XlsxToHtmlError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(XlsxToHtmlError::Zip(format!("{}", e))),
    };
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    Ok(Some(content))
}

/// 要素の属性値を文字列として取得
fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, XlsxToHtmlError> {
    for attr in element.attributes() {
        let attr = attr.map_err(xml_attr_error)?;
        if attr.key.as_ref() == key {
            return Ok(Some(std::str::from_utf8(&attr.value)?.to_string()));
        }
    }
    Ok(None)
}

fn is_true(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true"))
}

fn xml_error(e: quick_xml::Error) -> XlsxToHtmlError {
    XlsxToHtmlError::Config(format!("XML parse error: {}", e))
}

fn xml_attr_error(e: quick_xml::events::attributes::AttrError) -> XlsxToHtmlError {
    XlsxToHtmlError::Config(format!("XML attribute error: {}", e))
}

fn sorted(set: &HashSet<u32>) -> Vec<u32> {
    let mut values: Vec<u32> = set.iter().copied().collect();
    values.sort_unstable();
    values
}

/// workbook.xml.rels の Target をアーカイブ内のパスに変換
///
/// "worksheets/sheet1.xml" -> "xl/worksheets/sheet1.xml"、
/// "/xl/worksheets/sheet1.xml" -> "xl/worksheets/sheet1.xml"
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

/// セル参照文字列を座標に変換（例: "A1" -> (0, 0)）
fn parse_cell_ref(ref_str: &str) -> Option<(u32, u32)> {
    let split = ref_str.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = ref_str.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let col = letters
        .chars()
        .try_fold(0u32, |acc, ch| {
            let val = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
            acc.checked_mul(26)?.checked_add(val)
        })?
        .checked_sub(1)?;
    let row = digits.parse::<u32>().ok()?.checked_sub(1)?;

    Some((row, col))
}

/// ビルトイン書式ID（0-163）のマッピング
///
/// Excelの標準書式IDとフォーマット文字列の対応表です。
fn get_builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        5 => Some("$#,##0_);($#,##0)"),
        6 => Some("$#,##0_);[Red]($#,##0)"),
        7 => Some("$#,##0.00_);($#,##0.00)"),
        8 => Some("$#,##0.00_);[Red]($#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0_);(#,##0)"),
        38 => Some("#,##0_);[Red](#,##0)"),
        39 => Some("#,##0.00_);(#,##0.00)"),
        40 => Some("#,##0.00_);[Red](#,##0.00)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mm:ss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}

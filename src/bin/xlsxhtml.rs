//! xlsxhtml CLI - convert workbooks into a browsable set of HTML pages

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use xlsxhtml::{
    render_library_index, Converter, ConverterBuilder, SheetSelector, WorkbookDocument,
    INDEX_FILE_NAME,
};

#[derive(Parser)]
#[command(name = "xlsxhtml")]
#[command(
    author,
    version,
    about = "Convert spreadsheets into semantic HTML pages (headings, text blocks, tables)"
)]
struct Cli {
    /// Input workbooks (.xlsx)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "html_output")]
    output: PathBuf,

    /// Convert only the named sheet
    #[arg(long)]
    sheet_name: Option<String>,

    /// Leave out hidden sheets, rows and columns
    #[arg(long)]
    skip_hidden: bool,

    /// Upper-case first cells longer than this make a row a banner
    #[arg(long, default_value_t = xlsxhtml::BANNER_LENGTH_THRESHOLD)]
    banner_min_len: usize,

    /// Upper-case text longer than this is rendered as a section heading
    #[arg(long, default_value_t = xlsxhtml::HEADING_LENGTH_THRESHOLD)]
    heading_min_len: usize,

    /// Stylesheet linked from sheet pages and workbook indexes
    #[arg(long, default_value = "../css/styles.css")]
    stylesheet: String,

    /// Print a JSON report for each workbook to stdout
    #[arg(long)]
    report: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    run(&Cli::parse())
}

/// 入力を順に変換し、ページと索引を書き出す
///
/// 変換できないブックは警告を出してスキップし、残りのブックと索引は出力する。
fn run(cli: &Cli) -> Result<()> {
    let mut builder = ConverterBuilder::new()
        .include_hidden(!cli.skip_hidden)
        .with_banner_min_len(cli.banner_min_len)
        .with_heading_min_len(cli.heading_min_len)
        .with_stylesheet(cli.stylesheet.as_str());
    if let Some(name) = &cli.sheet_name {
        builder = builder.with_sheet_selector(SheetSelector::Name(name.clone()));
    }
    let converter = builder.build().context("Invalid options")?;
    fs::create_dir_all(&cli.output)
        .with_context(|| format!("Failed to create '{}'", cli.output.display()))?;

    let mut workbooks = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        let name = workbook_name(input)?;
        if workbooks.iter().any(|w: &WorkbookDocument| w.name() == name) {
            bail!("Two inputs share the output directory name '{}'", name);
        }

        let workbook = match convert_input(&converter, input, &name) {
            Ok(workbook) => workbook,
            Err(e) => {
                log::warn!("Skipping '{}': {:#}", input.display(), e);
                continue;
            }
        };

        write_workbook(&cli.output, &workbook, converter.stylesheet())?;
        log::info!(
            "{}: {} sheets -> {}",
            input.display(),
            workbook.sheets().len(),
            cli.output.join(&name).display()
        );

        if cli.report {
            println!("{}", workbook.report_json()?);
        }
        workbooks.push(workbook);
    }

    // ライブラリ索引は出力ディレクトリ直下にあるため、1階層上を指す相対パスを外す
    let library_stylesheet = converter
        .stylesheet()
        .strip_prefix("../")
        .unwrap_or(converter.stylesheet());
    let index_path = cli.output.join(INDEX_FILE_NAME);
    fs::write(&index_path, render_library_index(&workbooks, library_stylesheet))
        .with_context(|| format!("Failed to write '{}'", index_path.display()))?;
    log::info!("library index: {}", index_path.display());

    Ok(())
}

fn workbook_name(input: &Path) -> Result<String> {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .with_context(|| format!("Cannot derive a workbook name from '{}'", input.display()))
}

fn convert_input(converter: &Converter, input: &Path, name: &str) -> Result<WorkbookDocument> {
    let file = File::open(input).with_context(|| format!("Failed to open '{}'", input.display()))?;
    converter
        .convert_workbook(file, name)
        .with_context(|| format!("Failed to convert '{}'", input.display()))
}

fn write_workbook(output: &Path, workbook: &WorkbookDocument, stylesheet: &str) -> Result<()> {
    let dir = output.join(workbook.name());
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create '{}'", dir.display()))?;

    for sheet in workbook.sheets() {
        let path = dir.join(sheet.file_name());
        fs::write(&path, sheet.render_page(workbook.name(), stylesheet))
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
    }

    let index_path = dir.join(INDEX_FILE_NAME);
    fs::write(&index_path, workbook.render_index(stylesheet))
        .with_context(|| format!("Failed to write '{}'", index_path.display()))?;

    Ok(())
}

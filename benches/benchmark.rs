//! パフォーマンスベンチマーク
//!
//! rust_xlsxwriterでメモリ上に生成した報告形式のワークブックを使い、
//! 変換全体（読み込み + セグメント分割）と、セグメント分割のみの速度を測定します。

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_xlsxwriter::{Format, Workbook};
use std::io::Cursor;
use xlsxhtml::{segment_sheet, CellValue, ConverterBuilder, RawCellData, SheetGrid, Thresholds};

/// セクション数
const SECTIONS: u32 = 20;

/// 1セクションのデータ行数
const ROWS_PER_SECTION: u32 = 50;

/// 列数
const COLUMNS: u16 = 8;

/// セクション見出しとヘッダー行のラベルを返す
fn section_layout(section: u32) -> (String, Vec<String>) {
    let heading = format!("SECCION NUMERO {}", section + 1);
    let headers = (0..COLUMNS).map(|c| format!("Columna {}", c + 1)).collect();
    (heading, headers)
}

/// 報告形式のワークブックを生成する
fn generate_workbook(sheets: usize) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let percent = Format::new().set_num_format("0.00%");

    for s in 0..sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(format!("Hoja {}", s + 1)).unwrap();
        worksheet.write_string(0, 0, "Informe de rendimiento").unwrap();

        let mut row = 2;
        for section in 0..SECTIONS {
            let (heading, headers) = section_layout(section);
            worksheet.write_string(row, 0, &heading).unwrap();
            worksheet.write_string(row, 1, "2024").unwrap();
            row += 1;

            worksheet
                .merge_range(row, 0, row, 1, &headers[0], &Format::new())
                .unwrap();
            for (c, header) in headers.iter().enumerate().skip(2) {
                worksheet.write_string(row, c as u16, header).unwrap();
            }
            row += 1;

            for r in 0..ROWS_PER_SECTION {
                worksheet.write_string(row, 0, &format!("Fila {}", r + 1)).unwrap();
                for c in 1..COLUMNS - 1 {
                    worksheet.write_number(row, c, f64::from(r * c as u32)).unwrap();
                }
                worksheet
                    .write_number_with_format(row, COLUMNS - 1, f64::from(r) / 100.0, &percent)
                    .unwrap();
                row += 1;
            }

            worksheet.write_string(row, 0, "Nota: cifras preliminares").unwrap();
            row += 2;
        }
    }

    workbook.save_to_buffer().unwrap()
}

/// 同じ構造のグリッドをメモリ上に直接構築する
fn generate_grid() -> SheetGrid {
    let mut cells = vec![RawCellData::new(
        0,
        0,
        CellValue::String("Informe de rendimiento".to_string()),
    )];

    let mut row = 2;
    for section in 0..SECTIONS {
        let (heading, headers) = section_layout(section);
        cells.push(RawCellData::new(row, 0, CellValue::String(heading)));
        cells.push(RawCellData::new(row, 1, CellValue::Number(2024.0)));
        row += 1;

        for (c, header) in headers.into_iter().enumerate() {
            cells.push(RawCellData::new(row, c as u32, CellValue::String(header)));
        }
        row += 1;

        for r in 0..ROWS_PER_SECTION {
            cells.push(RawCellData::new(row, 0, CellValue::String(format!("Fila {}", r + 1))));
            for c in 1..u32::from(COLUMNS) - 1 {
                cells.push(RawCellData::new(row, c, CellValue::Number(f64::from(r * c))));
            }
            cells.push(
                RawCellData::new(row, u32::from(COLUMNS) - 1, CellValue::Number(f64::from(r) / 100.0))
                    .with_format("0.00%"),
            );
            row += 1;
        }

        cells.push(RawCellData::new(
            row,
            0,
            CellValue::String("Nota: cifras preliminares".to_string()),
        ));
        row += 2;
    }

    SheetGrid::new("Hoja", cells, vec![])
}

/// 読み込みからHTML出力までの変換全体
fn benchmark_convert(c: &mut Criterion) {
    let converter = ConverterBuilder::new().build().unwrap();

    let mut group = c.benchmark_group("convert");
    group.sample_size(10);

    for sheets in [1usize, 4] {
        let data = generate_workbook(sheets);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(sheets), &data, |b, data| {
            b.iter(|| {
                let mut output = Vec::new();
                converter
                    .convert(Cursor::new(black_box(data)), black_box(&mut output))
                    .unwrap();
                black_box(output)
            });
        });
    }

    group.finish();
}

/// セグメント分割のみ（XLSXの読み込みを含まない）
fn benchmark_segment(c: &mut Criterion) {
    let grid = generate_grid();
    let thresholds = Thresholds::default();

    let mut group = c.benchmark_group("segment");
    group.throughput(Throughput::Elements(u64::from(grid.row_count())));
    group.bench_function("segment_sheet", |b| {
        b.iter(|| black_box(segment_sheet(black_box(&grid), &thresholds)));
    });
    group.finish();
}

criterion_group!(benches, benchmark_convert, benchmark_segment);
criterion_main!(benches);

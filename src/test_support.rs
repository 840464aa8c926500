//! Fixtures shared by the unit tests.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use rust_xlsxwriter::Workbook;

use crate::models::{CellValue, Table};
use crate::services::excel::loader::workbook_from_bytes;
use crate::services::explore::DistributionSettings;
use crate::AppState;

fn text(value: &str) -> CellValue {
    CellValue::from(value)
}

/// Six rows with a `Stage` column holding two larvae, three nymphs and one
/// missing value.
pub fn stage_table() -> Table {
    let stages = [Some("Larva"), Some("Larva"), Some("Nymph"), None, Some("Nymph"), Some("Nymph")];
    Table::new(
        vec!["Id".into(), "Stage".into()],
        stages
            .iter()
            .enumerate()
            .map(|(i, stage)| vec![CellValue::Number(i as f64 + 1.0), CellValue::from(*stage)])
            .collect(),
    )
}

/// Shaped like the article/variable sheet, with the untidy labels the
/// explorer cleans up.
pub fn articles_table() -> Table {
    let rows = [
        ("Climate", " ALL ", "temperature", 2019.0),
        ("Climate", "Nymph", "Temperature", 2020.0),
        ("Host", "ALL", "Deer density", 2020.0),
        ("Landscape ", "Adult", "Forest cover", 2021.0),
        ("Climate", "Larva", " temperature", 2021.0),
    ];
    Table::new(
        vec!["Article".into(), "Category".into(), "Life_stage".into(), "Variable_real".into(), "Year".into()],
        rows.iter()
            .enumerate()
            .map(|(i, (category, stage, variable, year))| {
                vec![
                    text(&format!("A{}", i + 1)),
                    text(category),
                    text(stage),
                    text(variable),
                    CellValue::Number(*year),
                ]
            })
            .collect(),
    )
}

pub fn xlsx_bytes(sheets: &[(&str, &Table)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    for (name, table) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).unwrap();
        for (col, header) in table.columns().iter().enumerate() {
            worksheet.write_string(0, col as u16, header).unwrap();
        }
        for (row, cells) in table.rows().iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                match cell {
                    CellValue::Null => {}
                    CellValue::Number(n) => {
                        worksheet.write_number(row as u32 + 1, col as u16, *n).unwrap();
                    }
                    CellValue::Text(s) => {
                        worksheet.write_string(row as u32 + 1, col as u16, s).unwrap();
                    }
                }
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

/// Copies an `.xlsx` package without the named part, e.g.
/// `xl/worksheets/sheet2.xml` for the second sheet.
pub fn without_part(bytes: &[u8], part: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for idx in 0..archive.len() {
        let file = archive.by_index(idx).unwrap();
        if file.name() != part {
            writer.raw_copy_file(file).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// State over `bytes`, with `Final_articles_and_variables` as the article
/// sheet.
pub fn state_from_bytes(bytes: Vec<u8>) -> Arc<AppState> {
    let workbook = Arc::new(workbook_from_bytes(Bytes::from(bytes)).unwrap());
    Arc::new(AppState::new(workbook, "Final_articles_and_variables", DistributionSettings::default()).unwrap())
}

/// State over a workbook holding a `Summary` sheet (the stage table) and
/// `table` as the article sheet.
pub fn state_with(table: &Table) -> Arc<AppState> {
    state_from_bytes(xlsx_bytes(&[("Summary", &stage_table()), ("Final_articles_and_variables", table)]))
}

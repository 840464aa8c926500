use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
use moka::sync::Cache;

use super::utils::{cell_value, header_names};
use crate::error::AppError;
use crate::models::{SheetFailure, Table, Workbook};

const CACHED_WORKBOOKS: u64 = 8;

/// Reads workbooks once per path and hands out the same shared copy
/// afterwards. The files are not expected to change while the process runs.
pub struct WorkbookLoader {
    cache: Cache<PathBuf, Arc<Workbook>>,
}

impl WorkbookLoader {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().max_capacity(CACHED_WORKBOOKS).build(),
        }
    }

    pub fn load(&self, path: &Path) -> Result<Arc<Workbook>, AppError> {
        self.cache
            .try_get_with(path.to_path_buf(), || read_workbook(path).map(Arc::new))
            .map_err(|e| (*e).clone())
    }
}

impl Default for WorkbookLoader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn read_workbook(path: &Path) -> Result<Workbook, AppError> {
    let start = std::time::Instant::now();
    tracing::info!("Reading workbook {}", path.display());

    let data = std::fs::read(path).map_err(|e| {
        tracing::error!("Failed to read workbook {}: {}", path.display(), e);
        AppError::Io(format!("Failed to read workbook {}: {}", path.display(), e))
    })?;

    let workbook = workbook_from_bytes(Bytes::from(data))?;
    tracing::info!(
        "Workbook {} loaded in {:?}: {} sheets usable, {} failed",
        path.display(),
        start.elapsed(),
        workbook.sheet_names.len(),
        workbook.failures.len()
    );
    Ok(workbook)
}

/// Parses every sheet independently. A sheet that cannot be read is recorded
/// as a failure and left out; the load only fails when nothing is usable.
pub fn workbook_from_bytes(source: Bytes) -> Result<Workbook, AppError> {
    let cursor = Cursor::new(source.clone());
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor).map_err(|e| {
        tracing::error!("Failed to open workbook: {}", e);
        AppError::Io(format!("Not a valid workbook: {}", e))
    })?;

    let all_sheets = workbook.sheet_names().to_vec();
    tracing::debug!("Found {} sheets: {:?}", all_sheets.len(), all_sheets);

    let mut sheet_names = Vec::with_capacity(all_sheets.len());
    let mut tables = HashMap::with_capacity(all_sheets.len());
    let mut failures = Vec::new();

    for sheet_name in all_sheets {
        match workbook.worksheet_range(&sheet_name) {
            Ok(range) => {
                let table = table_from_range(&range);
                tracing::debug!(
                    "Sheet {}: {} rows x {} columns",
                    sheet_name,
                    table.row_count(),
                    table.columns().len()
                );
                tables.insert(sheet_name.clone(), table);
                sheet_names.push(sheet_name);
            }
            Err(e) => {
                let err = AppError::from(e);
                tracing::warn!("Skipping sheet {}: {}", sheet_name, err);
                failures.push(SheetFailure {
                    sheet: sheet_name,
                    reason: err.to_string(),
                });
            }
        }
    }

    if sheet_names.is_empty() {
        return Err(AppError::Format(match failures.first() {
            Some(failure) => format!("No readable sheet in workbook, first failure: {}", failure.reason),
            None => "Workbook contains no sheets".to_string(),
        }));
    }

    Ok(Workbook {
        sheet_names,
        tables,
        failures,
        source,
    })
}

/// First row is the header, every following row becomes a table row.
fn table_from_range(range: &Range<Data>) -> Table {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Table::default();
    };

    // the used range may start right of column A
    let first_column = range.start().map_or(0, |(_, col)| col as usize);
    let columns = header_names(header, first_column);
    let body = rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    Table::new(columns, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;
    use crate::test_support::{stage_table, without_part, xlsx_bytes};

    #[test]
    fn reads_sheets_in_workbook_order() {
        let other = Table::new(vec!["id".into()], vec![vec![CellValue::Number(1.0)]]);
        let bytes = xlsx_bytes(&[("Stages", &stage_table()), ("Other", &other)]);

        let workbook = workbook_from_bytes(Bytes::from(bytes)).unwrap();

        assert_eq!(workbook.sheet_names, vec!["Stages", "Other"]);
        assert_eq!(workbook.sheet("Stages"), Some(&stage_table()));
        assert_eq!(workbook.sheet("Other"), Some(&other));
        assert!(workbook.failures.is_empty());
    }

    #[test]
    fn broken_sheet_is_recorded_and_the_rest_stays_usable() {
        let other = Table::new(vec!["id".into()], vec![vec![CellValue::Number(1.0)]]);
        let bytes = xlsx_bytes(&[("Stages", &stage_table()), ("Other", &other)]);
        let broken = without_part(&bytes, "xl/worksheets/sheet2.xml");

        let workbook = workbook_from_bytes(Bytes::from(broken)).unwrap();

        assert_eq!(workbook.sheet_names, vec!["Stages"]);
        assert_eq!(workbook.sheet("Stages"), Some(&stage_table()));
        assert_eq!(workbook.sheet("Other"), None);
        assert_eq!(workbook.failures.len(), 1);
        assert_eq!(workbook.failures[0].sheet, "Other");
        assert!(workbook.failures[0].reason.starts_with("Format error"));
    }

    #[test]
    fn no_readable_sheet_is_a_format_error() {
        let bytes = xlsx_bytes(&[("Stages", &stage_table()), ("Other", &stage_table())]);
        let broken = without_part(&bytes, "xl/worksheets/sheet1.xml");
        let broken = without_part(&broken, "xl/worksheets/sheet2.xml");

        let err = workbook_from_bytes(Bytes::from(broken)).unwrap_err();
        assert!(matches!(err, AppError::Format(_)));
    }

    #[test]
    fn blank_header_is_named_after_its_sheet_column() {
        let mut range: Range<Data> = Range::new((0, 1), (1, 3));
        range.set_value((0, 1), Data::String("Stage".into()));
        range.set_value((0, 3), Data::String("Year".into()));
        range.set_value((1, 1), Data::String("Larva".into()));
        range.set_value((1, 3), Data::Float(2020.0));

        let table = table_from_range(&range);
        assert_eq!(table.columns(), ["Stage", "Unnamed: 2", "Year"]);
        assert_eq!(
            table.rows()[0],
            vec![CellValue::from("Larva"), CellValue::Null, CellValue::Number(2020.0)]
        );
    }

    #[test]
    fn keeps_source_bytes_for_passthrough() {
        let bytes = xlsx_bytes(&[("Stages", &stage_table())]);
        let workbook = workbook_from_bytes(Bytes::from(bytes.clone())).unwrap();
        assert_eq!(workbook.source.as_ref(), bytes.as_slice());
    }

    #[test]
    fn empty_sheet_loads_as_empty_table() {
        let bytes = xlsx_bytes(&[("Blank", &Table::default())]);
        let workbook = workbook_from_bytes(Bytes::from(bytes)).unwrap();
        let table = workbook.sheet("Blank").unwrap();
        assert!(table.columns().is_empty());
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn garbage_is_an_io_error() {
        let err = workbook_from_bytes(Bytes::from_static(b"not a workbook")).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = WorkbookLoader::new()
            .load(&dir.path().join("absent.xlsx"))
            .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn loading_twice_is_deterministic_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review.xlsx");
        let other = Table::new(vec!["id".into()], vec![vec![CellValue::Number(7.0)]]);
        std::fs::write(&path, xlsx_bytes(&[("Stages", &stage_table()), ("Other", &other)])).unwrap();

        let loader = WorkbookLoader::new();
        let first = tokio_test::assert_ok!(loader.load(&path));
        let second = tokio_test::assert_ok!(loader.load(&path));
        assert!(Arc::ptr_eq(&first, &second));

        let fresh = read_workbook(&path).unwrap();
        assert_eq!(fresh.sheet_names, first.sheet_names);
        assert_eq!(fresh.tables, first.tables);
    }
}

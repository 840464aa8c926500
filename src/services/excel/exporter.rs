use rust_xlsxwriter::{Workbook, Worksheet};

use super::utils::sheet_name;
use crate::error::AppError;
use crate::models::{CellValue, Table};

/// Writes `table` as the only sheet of a new workbook: header row first,
/// no index column, nulls left as blank cells.
pub fn export_table(table: &Table, name: &str) -> Result<Vec<u8>, AppError> {
    let start = std::time::Instant::now();
    let sheet = sheet_name(name);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&sheet)?;

    for (col_idx, header) in table.columns().iter().enumerate() {
        worksheet.write_string(0, column_number(col_idx)?, header)?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let row_number = u32::try_from(row_idx + 1)
            .map_err(|_| AppError::Serialization(format!("Row {} is out of range", row_idx + 1)))?;
        for (col_idx, cell) in row.iter().enumerate() {
            write_cell(worksheet, row_number, column_number(col_idx)?, cell)?;
        }
    }

    let buffer = workbook.save_to_buffer().map_err(|e| {
        tracing::error!("Failed to serialize sheet {}: {}", sheet, e);
        AppError::Serialization(e.to_string())
    })?;

    tracing::info!(
        "Exported {} rows to sheet {} ({}KB) in {:?}",
        table.row_count(),
        sheet,
        buffer.len() / 1024,
        start.elapsed()
    );
    Ok(buffer)
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &CellValue) -> Result<(), AppError> {
    match cell {
        CellValue::Null => {}
        CellValue::Number(n) if !n.is_finite() => {
            return Err(AppError::Serialization(format!(
                "Cannot write non-finite number {} at row {}, column {}",
                n,
                row + 1,
                col + 1
            )));
        }
        CellValue::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        CellValue::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
    }
    Ok(())
}

fn column_number(idx: usize) -> Result<u16, AppError> {
    u16::try_from(idx).map_err(|_| AppError::Serialization(format!("Column {} is out of range", idx + 1)))
}

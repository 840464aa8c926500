use crate::models::{CellValue, Table};

pub const LIFE_STAGE_COLUMN: &str = "Life_stage";
pub const VARIABLE_COLUMN: &str = "Variable_real";

// (column, exact value, replacement)
const LABEL_REWRITES: [(&str, &str, &str); 2] = [
    (LIFE_STAGE_COLUMN, "ALL", "All"),
    (VARIABLE_COLUMN, "temperature", "Temperature"),
];

/// Trims every text cell, then harmonizes the known label variants.
/// Running it on its own output changes nothing.
pub fn normalize(table: &Table) -> Table {
    let mut table = table.clone();

    table.map_cells(|cell| {
        if let CellValue::Text(s) = cell {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                *s = trimmed.to_string();
            }
        }
    });

    for (column, from, to) in LABEL_REWRITES {
        if let Some(idx) = table.column_index(column) {
            table.map_column(idx, |cell| {
                if cell.as_text() == Some(from) {
                    *cell = CellValue::from(to);
                }
            });
        }
    }

    table
}

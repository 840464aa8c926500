use std::collections::HashSet;

use calamine::Data;
use chrono::{NaiveDateTime, Timelike};

use crate::models::CellValue;

/// Excel refuses sheet names longer than this.
pub const MAX_SHEET_NAME_LEN: usize = 31;
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Turns a header row into unique column names. Blank headers become
/// `Unnamed: <sheet column index>`, repeated names get a `.1`, `.2`, ...
/// suffix. `first_column` is the sheet column of `row[0]`.
pub fn header_names(row: &[Data], first_column: usize) -> Vec<String> {
    let mut existing_names = HashSet::new();
    row.iter()
        .enumerate()
        .map(|(idx, cell)| {
            let name = match cell {
                Data::Empty => format!("Unnamed: {}", first_column + idx),
                other => other.to_string(),
            };
            unique_name(name, &mut existing_names)
        })
        .collect()
}

fn unique_name(name: String, existing_names: &mut HashSet<String>) -> String {
    let mut cleaned = name.clone();
    let mut counter = 1;
    while !existing_names.insert(cleaned.clone()) {
        cleaned = format!("{}.{}", name, counter);
        counter += 1;
    }
    cleaned
}

pub fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::from(if *b { "TRUE" } else { "FALSE" }),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::Text(format_datetime(&value)),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn format_datetime(value: &NaiveDateTime) -> String {
    if value.num_seconds_from_midnight() == 0 {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Makes `name` acceptable as a worksheet name.
pub fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_SHEET_NAME_LEN)
        .collect();

    let cleaned = cleaned.trim_matches('\'');
    if cleaned.is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Reduces a download name to characters that are safe inside a
/// Content-Disposition header.
pub fn download_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

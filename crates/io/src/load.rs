//! Spreadsheet → [`Grid`] loading.
//!
//! Only the first sheet is read. Values keep their type: numbers stay
//! numbers, text stays text, blanks become [`Cell::Empty`]. Coordinates are
//! absolute, so a used range starting at C4 still puts that cell at (3, 2).

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_from_rs, Data, Range, Reader, Xlsx};
use log::debug;

use confronto_recon::{Cell, Grid, ReconError};

/// Load the first sheet of any workbook calamine understands
/// (xlsx, xlsm, xlsb, xls, ods).
pub fn load_grid(path: &Path) -> Result<Grid, ReconError> {
    let unreadable = |reason: String| ReconError::UnreadableFile {
        input: None,
        path: path.display().to_string(),
        reason,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(e.to_string()))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| unreadable(e.to_string()))?,
        None => return Err(unreadable("workbook contains no sheets".into())),
    };

    let grid = range_to_grid(&range);
    debug!("loaded {} row(s) from {}", grid.len(), path.display());
    Ok(grid)
}

/// Load the first sheet of an in-memory xlsx file. `name` only appears in
/// error messages.
pub fn load_grid_from_bytes(name: &str, bytes: &[u8]) -> Result<Grid, ReconError> {
    let unreadable = |reason: String| ReconError::UnreadableFile {
        input: None,
        path: name.to_string(),
        reason,
    };

    let mut workbook: Xlsx<Cursor<&[u8]>> =
        open_workbook_from_rs(Cursor::new(bytes)).map_err(|e: calamine::XlsxError| unreadable(e.to_string()))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| unreadable(e.to_string()))?,
        None => return Err(unreadable("workbook contains no sheets".into())),
    };
    Ok(range_to_grid(&range))
}

fn range_to_grid(range: &Range<Data>) -> Grid {
    let Some((start_row, start_col)) = range.start() else {
        return Grid::default();
    };

    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
    for source in range.rows() {
        let mut row: Vec<Cell> = vec![Cell::Empty; start_col as usize];
        row.extend(source.iter().map(to_cell));

        // Ragged rows: width reflects the last non-empty cell
        while row.last().is_some_and(Cell::is_empty) {
            row.pop();
        }
        rows.push(row);
    }
    Grid::new(rows)
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        // Excel serial; no date semantics are needed downstream
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.into()),
    }
}

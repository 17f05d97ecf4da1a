//! Generic cell grid: the only thing validators and extractors ever see.
//!
//! A grid is a list of ragged rows in absolute sheet coordinates (row 0 is
//! sheet row 1, column 0 is column A). Reading a cell past the end of a row
//! yields [`Cell::Empty`], so callers never have to bounds-check.

use std::borrow::Cow;

/// A single cell value, as read from the sheet without coercion.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

static EMPTY_CELL: Cell = Cell::Empty;

/// Largest magnitude treated as an exact integer (Excel keeps 15 digits).
const MAX_EXACT_INTEGER: f64 = 1e15;

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Trimmed textual rendering used for label comparisons.
    ///
    /// Integral numbers render without a decimal part so that a numeric
    /// office code such as `42` compares equal to the text `"42"`.
    pub fn label(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Text(s) => Cow::Borrowed(s.trim()),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER {
                    Cow::Owned(format!("{}", *n as i64))
                } else {
                    Cow::Owned(format!("{}", n))
                }
            }
        }
    }

    /// Numeric value of the cell. Text is parsed after trimming; anything
    /// that does not yield a finite number is `None`.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Cell::Empty => return None,
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }

    /// Integer value of the cell, if it holds a whole number.
    pub fn as_integer(&self) -> Option<i64> {
        let n = self.as_number()?;
        if n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER {
            Some(n as i64)
        } else {
            None
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}

impl From<i32> for Cell {
    fn from(n: i32) -> Self {
        Cell::Number(n as f64)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// Immutable grid of ragged rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Number of rows, including blank ones.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Row `r`, or an empty slice if out of range.
    pub fn row(&self, r: usize) -> &[Cell] {
        self.rows.get(r).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cell at `(r, c)`; out-of-range reads are empty.
    pub fn cell(&self, r: usize, c: usize) -> &Cell {
        self.rows.get(r).and_then(|row| row.get(c)).unwrap_or(&EMPTY_CELL)
    }

    /// Width of the widest row among the first `limit` rows.
    pub fn max_width(&self, limit: usize) -> usize {
        self.rows.iter().take(limit).map(Vec::len).max().unwrap_or(0)
    }

    /// First row whose `col` label equals `literal` exactly (after trimming).
    pub fn find_row(&self, col: usize, literal: &str) -> Option<usize> {
        self.find_row_by(col, |label| label == literal)
    }

    /// First row whose `col` label satisfies `pred`.
    pub fn find_row_by(&self, col: usize, pred: impl Fn(&str) -> bool) -> Option<usize> {
        (0..self.rows.len()).find(|&r| pred(&self.cell(r, col).label()))
    }
}

/// ASCII case-insensitive prefix test.
pub fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.len() >= prefix.len()
        && value.is_char_boundary(prefix.len())
        && value[..prefix.len()].eq_ignore_ascii_case(prefix)
}

impl From<()> for Cell {
    fn from(_: ()) -> Self {
        Cell::Empty
    }
}

/// Build a grid from literal rows; `()` stands for an empty cell.
///
/// ```
/// use confronto_recon::grid;
/// let g = grid![["Sezione", 1], [(), "x"]];
/// assert_eq!(g.len(), 2);
/// ```
#[macro_export]
macro_rules! grid {
    ($([$($cell:expr),* $(,)?]),* $(,)?) => {
        $crate::grid::Grid::new(vec![
            $(vec![$($crate::grid::Cell::from($cell)),*]),*
        ])
    };
}

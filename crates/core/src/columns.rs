//! Fixed column layout of the grades sheet.
//!
//! The positions below are a contract with whoever maintains the sheet. They
//! are never inferred from the header row: if the sheet's columns move, this
//! mapping has to be updated by hand or every decoded field shifts.
//!
//! ```text
//! A  student id
//! B  birth date (exact text, e.g. 2005-03-15)
//! C  student name
//! D  subject
//! E  grade (0-20)
//! F… answer sheet: an http(s) URL, or a base64 data uri sharded over F, G, H, …
//! ```

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub student_id: usize,
    pub birth_date: usize,
    pub student_name: usize,
    pub subject: usize,
    pub grade: usize,
    pub image_start: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            student_id: 0,
            birth_date: 1,
            student_name: 2,
            subject: 3,
            grade: 4,
            image_start: 5,
        }
    }
}

impl ColumnMap {
    /// Whole-column range covering the id and birth date columns, e.g. `A:B`.
    pub fn index_range(&self) -> String {
        let (first, last) = self.index_span();
        format!("{}:{}", column_letter(first), column_letter(last))
    }

    /// Leftmost column of the index range; offsets into index rows are relative to it.
    pub fn index_span(&self) -> (usize, usize) {
        let first = self.student_id.min(self.birth_date);
        let last = self.student_id.max(self.birth_date);
        (first, last)
    }

    /// The image shards run to the end of the row, so every scalar field has
    /// to sit left of `image_start` and no two fields may share a column.
    pub fn is_consistent(&self) -> bool {
        let scalars = [
            self.student_id,
            self.birth_date,
            self.student_name,
            self.subject,
            self.grade,
        ];
        for (idx, column) in scalars.iter().enumerate() {
            if *column >= self.image_start {
                return false;
            }
            if scalars[idx + 1..].contains(column) {
                return false;
            }
        }
        true
    }
}

/// Single whole-row range in A1 notation, e.g. `5:5`.
pub fn row_range(position: usize) -> String {
    format!("{position}:{position}")
}

/// Zero-based column index to its A1 letters: 0 → `A`, 25 → `Z`, 26 → `AA`.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Quote a sheet (tab) name for A1 notation, doubling embedded quotes.
pub fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

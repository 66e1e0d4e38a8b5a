use crate::domain::model::TransformedUser;
use crate::utils::error::{EtlError, Result};
use std::fmt;

/// A small column-labelled table of string cells with a 0-based row index.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Frame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(EtlError::ProcessingError {
                message: format!(
                    "Row {} has {} cells but the frame has {} columns",
                    index,
                    row.len(),
                    columns.len()
                ),
            });
        }
        Ok(Self { columns, rows })
    }

    pub fn from_users(users: &[TransformedUser]) -> Self {
        Self {
            columns: TransformedUser::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: users.iter().map(TransformedUser::row).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Plain-text table, right-aligned, one line per row plus a header line.
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return format!(
                "Empty DataFrame\nColumns: [{}]\nIndex: []",
                self.columns.join(", ")
            );
        }

        let index_width = (self.rows.len() - 1).to_string().len();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                self.rows
                    .iter()
                    .map(|row| display_width(&row[i]))
                    .chain(std::iter::once(display_width(column)))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut lines = Vec::with_capacity(self.rows.len() + 1);

        let mut header = " ".repeat(index_width);
        for (column, width) in self.columns.iter().zip(&widths) {
            header.push_str("  ");
            header.push_str(&pad_left(column, *width));
        }
        lines.push(header);

        for (index, row) in self.rows.iter().enumerate() {
            let mut line = pad_left(&index.to_string(), index_width);
            for (cell, width) in row.iter().zip(&widths) {
                line.push_str("  ");
                line.push_str(&pad_left(cell, *width));
            }
            lines.push(line);
        }

        lines.join("\n")
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| EtlError::IoError(e.into_error()))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn display_width(s: &str) -> usize {
    s.chars().count()
}

fn pad_left(s: &str, width: usize) -> String {
    let padding = width.saturating_sub(display_width(s));
    format!("{}{}", " ".repeat(padding), s)
}

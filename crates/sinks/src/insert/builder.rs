//! Statement sequence over a contiguous record share

use tally_protocol::{InsertableRecord, ProtocolError, SqlValue};

use super::template::InsertTemplate;
use crate::sink::Statement;

/// Turns a contiguous slice of records into bounded INSERT statements
///
/// The sequence is lazy, finite and not restartable: each call to
/// [`next_statement`](Self::next_statement) consumes up to `insert_size`
/// records. Every statement but the last covers exactly `insert_size` rows
/// and reuses the template's cached text; the last one covers the rest.
///
/// The parameter array is allocated once at `insert_size * columns` and
/// overwritten for every statement; each statement only exposes the prefix
/// it filled.
pub struct BatchInsertBuilder<'t, 'r, R> {
    template: &'t InsertTemplate,
    records: &'r [R],
    position: usize,
    params: Vec<SqlValue<'r>>,
    partial_text: String,
}

impl<'t, 'r, R: InsertableRecord> BatchInsertBuilder<'t, 'r, R> {
    /// Create a builder over `records`
    pub fn new(template: &'t InsertTemplate, records: &'r [R]) -> Self {
        Self {
            template,
            records,
            position: 0,
            params: vec![SqlValue::Null; template.max_params()],
            partial_text: String::new(),
        }
    }

    /// Records not yet turned into statements
    #[inline]
    pub fn remaining(&self) -> usize {
        self.records.len() - self.position
    }

    /// Statements left in the sequence: `ceil(remaining / insert_size)`
    #[inline]
    pub fn statement_count(&self) -> usize {
        self.remaining().div_ceil(self.template.insert_size())
    }

    /// Produce the next statement, or `None` when the share is exhausted
    ///
    /// A record that writes the wrong number of values yields an error and
    /// ends the sequence.
    pub fn next_statement(&mut self) -> Option<Result<Statement<'_>, ProtocolError>> {
        if self.position >= self.records.len() {
            return None;
        }

        let width = self.template.columns();
        let rows = self.remaining().min(self.template.insert_size());
        let records: &'r [R] = self.records;
        let chunk = &records[self.position..self.position + rows];

        for (row, record) in chunk.iter().enumerate() {
            let offset = row * width;
            let written = record.fill_values(&mut self.params[offset..offset + width]);
            if written != width {
                self.position = self.records.len();
                return Some(Err(ProtocolError::shape_mismatch(width, written)));
            }
        }
        self.position += rows;

        let text = if rows == self.template.insert_size() {
            self.template.full_text()
        } else {
            self.template.render_into(rows, &mut self.partial_text);
            self.partial_text.as_str()
        };

        Some(Ok(Statement::new(
            self.template.table(),
            text,
            &self.params[..rows * width],
            rows,
        )))
    }
}

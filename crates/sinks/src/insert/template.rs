//! Per-shape statement text

use std::borrow::Cow;
use std::fmt::Write;

/// Reusable INSERT text for one destination table
///
/// ```text
/// INSERT INTO "public"."events_flow" (parameter_name, event_time, ...) VALUES ($1, $2, ...), ($5, $6, ...)
/// ```
///
/// Placeholders are numbered row-major starting at `$1`, so row `r`,
/// column `c` binds parameter `r * columns + c + 1`.
#[derive(Debug, Clone)]
pub struct InsertTemplate {
    table: String,
    columns: usize,
    insert_size: usize,
    head: String,
    row_groups: Vec<String>,
    full: String,
}

impl InsertTemplate {
    /// Build the template for `table` with up to `insert_size` rows per statement
    ///
    /// `table` is used verbatim in the SQL text; the sink is responsible for
    /// quoting it.
    pub fn new(table: impl Into<String>, columns: &[&str], insert_size: usize) -> Self {
        let table = table.into();
        let insert_size = insert_size.max(1);
        let width = columns.len();

        let head = format!("INSERT INTO {} ({}) VALUES ", table, columns.join(", "));

        let row_groups = (0..insert_size)
            .map(|row| {
                let mut group = String::with_capacity(width * 6 + 2);
                group.push('(');
                for col in 0..width {
                    if col > 0 {
                        group.push_str(", ");
                    }
                    // Writing to a String cannot fail
                    let _ = write!(group, "${}", row * width + col + 1);
                }
                group.push(')');
                group
            })
            .collect::<Vec<_>>();

        let mut template = Self {
            table,
            columns: width,
            insert_size,
            head,
            row_groups,
            full: String::new(),
        };
        template.full = template.render(insert_size);
        template
    }

    /// Destination table as used in the text
    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Values per row
    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Maximum rows per statement
    #[inline]
    pub fn insert_size(&self) -> usize {
        self.insert_size
    }

    /// Parameters in a full-size statement
    #[inline]
    pub fn max_params(&self) -> usize {
        self.insert_size * self.columns
    }

    /// Cached full-size statement text
    #[inline]
    pub fn full_text(&self) -> &str {
        &self.full
    }

    /// Statement text for `rows` rows (clamped to `1..=insert_size`)
    ///
    /// The full-size shape is borrowed from the cache; smaller shapes are
    /// rendered on demand.
    pub fn text_for(&self, rows: usize) -> Cow<'_, str> {
        let rows = rows.clamp(1, self.insert_size);
        if rows == self.insert_size {
            Cow::Borrowed(&self.full)
        } else {
            Cow::Owned(self.render(rows))
        }
    }

    /// Render the text for `rows` rows into a new string
    pub(crate) fn render(&self, rows: usize) -> String {
        let mut text = String::new();
        self.render_into(rows, &mut text);
        text
    }

    /// Render the text for `rows` rows into `out`, replacing its contents
    pub(crate) fn render_into(&self, rows: usize, out: &mut String) {
        let rows = rows.clamp(1, self.insert_size);
        let groups = &self.row_groups[..rows];

        out.clear();
        out.reserve(self.head.len() + groups.iter().map(|g| g.len() + 2).sum::<usize>());
        out.push_str(&self.head);
        for (i, group) in groups.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(group);
        }
    }
}

//! Batch INSERT construction
//!
//! A contiguous share of records is written as a sequence of multi-row
//! INSERT statements, each covering at most `insert_size` rows:
//!
//! ```text
//! records[0..N] → stmt(K rows) → stmt(K rows) → ... → stmt(N - K*(S-1) rows)
//!                                                     S = ceil(N / K)
//! ```
//!
//! - **`InsertTemplate`**: placeholder groups and the full-size statement text
//!   are rendered once per (table, insert size) and shared by every worker
//! - **`BatchInsertBuilder`**: walks the share, filling one pre-sized
//!   parameter array that is reused for every statement

mod builder;
mod template;

pub use builder::BatchInsertBuilder;
pub use template::InsertTemplate;

#[cfg(test)]
#[path = "insert_test.rs"]
mod insert_test;

//! Engine configuration
//!
//! The fee schedule book is the only configurable input: an immutable lookup
//! built once at process start, either from the built-in table or a YAML
//! file.

pub mod fee_book;

pub use fee_book::{FeeScheduleBook, FeeScheduleTemplate};

//! Trial recording schema
//!
//! This module describes the tabular layout written by the recording rig and
//! parses trial files against it. The layout is validated once per row at parse
//! time so downstream stages never index into missing columns.

mod columns;
mod parser;

pub use columns::*;
pub use parser::*;

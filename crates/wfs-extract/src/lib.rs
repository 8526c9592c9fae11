//! Word frequency extraction over a pull-based HTML token stream.
//!
//! The [`Scanner`] trait is the seam between tokenization and counting:
//! [`extract`] consumes any scanner, and [`HtmlScanner`] provides the
//! html5ever-backed implementation used in production.

mod extract;
mod scanner;

pub use extract::{extract, ScanError, WordCount, WordFrequencyTable};
pub use scanner::{HtmlScanner, Scanner, Token};

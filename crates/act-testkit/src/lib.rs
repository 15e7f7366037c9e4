//! Test Session accumulator, Baseline Store, and Image Comparator: the
//! testing-surface building blocks composed by the assertion and
//! visual-compare tools.

mod baseline;
mod comparator;
mod error;
mod session;

pub use baseline::{BaselineStore, validate_name as validate_baseline_name};
pub use comparator::{CompareResult, compare};
pub use error::{Error, Result};
pub use session::{Assertion, SessionSummary, TestSession};

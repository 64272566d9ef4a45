//! Core domain types
//!
//! Pure data structures and parsers - no I/O or automation calls.

pub mod amount;
mod element;
pub mod record;
pub mod result;
mod transaction;

pub use amount::{AmountParser, ParseFailure};
pub use element::{DetailView, Rect, Swipe, Viewport};
pub use record::{RecordParser, RecordRejection};
pub use transaction::{Transaction, TransactionKey};

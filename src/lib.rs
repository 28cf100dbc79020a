//! Copy text from an input stream to an output stream as slowly as possible.
//!
//! Each character is written and flushed on its own, and then followed by a
//! delay computed from the low-order bits of its code point.

#![deny(missing_docs)]

mod char_reader;
mod copy;
mod error;
mod output;
mod params;
mod patience;

pub use char_reader::{CharReader, Decoded, MAX_UTF8_SIZE, REPL};
pub use copy::{
    copy_chars_with_patience, copy_chars_with_patience_and_sleep, Sleep, ThreadSleep,
};
pub use error::Error;
#[cfg(unix)]
pub use output::FdWriter;
pub use output::{flush_action, Flushing, Output, Unflushed};
pub use params::{Params, DEFAULT_BASE, DEFAULT_BITS, DEFAULT_STEP, MAX_BITS};
pub use patience::{be_patient, BePatient, Patience, PrintImpatiently};

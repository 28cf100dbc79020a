use std::io;
use thiserror::Error;

/// Everything that can stop a patient copy.
///
/// Flush and sync failures are not represented here; they only affect when
/// bytes become visible, never which bytes are written.
#[derive(Debug, Error)]
pub enum Error {
    /// The mask would need more than the seven low-order bits a single
    /// byte-sized mask word can hold.
    #[error("too many bits: {0} (at most 7 are allowed)")]
    TooManyBits(u32),

    /// Reading from the input stream failed.
    #[error("failed to read input")]
    Read(#[source] io::Error),

    /// Writing a character to the output stream failed.
    #[error("failed to write output")]
    Write(#[source] io::Error),
}

impl Error {
    /// Return the underlying I/O error, if there is one.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::TooManyBits(_) => None,
            Self::Read(e) | Self::Write(e) => Some(e),
        }
    }
}

#[test]
fn test_display() {
    assert_eq!(
        Error::TooManyBits(8).to_string(),
        "too many bits: 8 (at most 7 are allowed)"
    );
    let e = Error::Write(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
    assert_eq!(e.to_string(), "failed to write output");
    assert_eq!(e.io_error().map(io::Error::kind), Some(io::ErrorKind::BrokenPipe));
}

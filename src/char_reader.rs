use std::{io, str};

/// The largest number of bytes a single `char` occupies in UTF-8.
pub const MAX_UTF8_SIZE: usize = 4;

/// U+FFFD, the REPLACEMENT CHARACTER.
pub const REPL: char = '\u{fffd}';

/// How many bytes `CharReader` asks the underlying stream for at a time.
const BUFFER_SIZE: usize = 4096;

/// One character decoded from an input stream, along with the bytes which
/// should be written to represent it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Decoded {
    c: char,
    bytes: [u8; MAX_UTF8_SIZE],
    len: usize,
    consumed: usize,
}

impl Decoded {
    fn new(c: char, consumed: usize) -> Self {
        let mut bytes = [0_u8; MAX_UTF8_SIZE];
        let len = c.encode_utf8(&mut bytes).len();
        Self {
            c,
            bytes,
            len,
            consumed,
        }
    }

    /// The decoded character. Invalid input decodes as [`REPL`].
    #[inline]
    pub fn char(&self) -> char {
        self.c
    }

    /// The UTF-8 encoding of [`Decoded::char`].
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// The number of bytes of input this character advanced over. This is
    /// the same as `as_bytes().len()` except for invalid input, where it is
    /// always 1.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// True if this character replaces an invalid or truncated input byte.
    #[inline]
    pub fn is_replacement(&self) -> bool {
        self.c == REPL && self.consumed != self.len
    }
}

/// Adapts an [`io::Read`] producing an arbitrary byte sequence into a
/// sequence of `char`s.
///
/// A multi-byte encoding is only ever produced whole, even when it arrives
/// split across several reads of the underlying stream. A byte which doesn't
/// begin a valid encoding, or a truncated encoding at the end of the stream,
/// decodes as one [`REPL`] per byte.
pub struct CharReader<Inner: io::Read> {
    inner: Inner,
    buf: Box<[u8]>,
    start: usize,
    end: usize,
    ended: bool,
}

impl<Inner: io::Read> CharReader<Inner> {
    /// Construct a new instance of `CharReader` wrapping `inner`.
    pub fn new(inner: Inner) -> Self {
        Self {
            inner,
            buf: vec![0_u8; BUFFER_SIZE].into_boxed_slice(),
            start: 0,
            end: 0,
            ended: false,
        }
    }

    /// Gets a reference to the underlying reader.
    pub fn get_ref(&self) -> &Inner {
        &self.inner
    }

    /// Return the underlying reader. Any bytes which have been read from it
    /// but not yet decoded are discarded.
    pub fn into_inner(self) -> Inner {
        self.inner
    }

    /// Read the next character, or `None` at the end of the stream.
    pub fn read_char(&mut self) -> io::Result<Option<Decoded>> {
        loop {
            if let Some(decoded) = decode(&self.buf[self.start..self.end], self.ended) {
                self.start += decoded.consumed;
                return Ok(Some(decoded));
            }
            if self.ended {
                return Ok(None);
            }
            self.fill()?;
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        if self.start != 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        loop {
            match self.inner.read(&mut self.buf[self.end..]) {
                Ok(0) => {
                    self.ended = true;
                    return Ok(());
                }
                Ok(size) => {
                    self.end += size;
                    return Ok(());
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

impl<Inner: io::Read> Iterator for CharReader<Inner> {
    type Item = io::Result<Decoded>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.read_char().transpose()
    }
}

/// Decode the first character of `bytes`. Returns `None` if `bytes` is
/// empty, or if it holds only the start of an encoding and more input may
/// still arrive.
fn decode(bytes: &[u8], ended: bool) -> Option<Decoded> {
    let window = &bytes[..bytes.len().min(MAX_UTF8_SIZE)];
    let valid = match str::from_utf8(window) {
        Ok(s) => s,
        Err(error) if error.valid_up_to() != 0 => {
            // Re-slicing at `valid_up_to` can't fail.
            str::from_utf8(&window[..error.valid_up_to()]).unwrap_or_default()
        }
        Err(error) if error.error_len().is_none() && !ended => return None,
        Err(_) => return Some(Decoded::new(REPL, 1)),
    };
    valid.chars().next().map(|c| Decoded::new(c, c.len_utf8()))
}

#[cfg(test)]
struct Trickle<'a> {
    chunks: std::slice::Iter<'a, io::Result<&'a [u8]>>,
}

#[cfg(test)]
impl<'a> io::Read for Trickle<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.chunks.next() {
            None => Ok(0),
            Some(Ok(chunk)) => {
                buf[..chunk.len()].copy_from_slice(chunk);
                Ok(chunk.len())
            }
            Some(Err(e)) => Err(io::Error::new(e.kind(), e.to_string())),
        }
    }
}

#[cfg(test)]
fn chars(input: &[u8]) -> Vec<(char, usize)> {
    CharReader::new(input)
        .map(|d| d.map(|d| (d.char(), d.consumed())))
        .collect::<io::Result<_>>()
        .unwrap()
}

#[test]
fn test_ascii() {
    assert!(chars(b"").is_empty());
    assert_eq!(chars(b"AB"), vec![('A', 1), ('B', 1)]);
}

#[test]
fn test_multibyte() {
    assert_eq!(
        chars("é€\u{1f600}a".as_bytes()),
        vec![('é', 2), ('€', 3), ('\u{1f600}', 4), ('a', 1)]
    );
}

#[test]
fn test_invalid() {
    // A lone continuation byte, a lead byte followed by ASCII, and an
    // encoded surrogate.
    assert_eq!(chars(b"\x80A"), vec![(REPL, 1), ('A', 1)]);
    assert_eq!(chars(b"\xe2\x82A"), vec![(REPL, 1), (REPL, 1), ('A', 1)]);
    assert_eq!(
        chars(b"\xed\xa0\x80"),
        vec![(REPL, 1), (REPL, 1), (REPL, 1)]
    );
    assert_eq!(chars(b"\xff"), vec![(REPL, 1)]);
}

#[test]
fn test_truncated_at_end() {
    assert_eq!(chars(b"A\xe2\x82"), vec![('A', 1), (REPL, 1), (REPL, 1)]);
}

#[test]
fn test_replacement_bytes() {
    let mut reader = CharReader::new(&b"\x80"[..]);
    let decoded = reader.read_char().unwrap().unwrap();
    assert_eq!(decoded.as_bytes(), "\u{fffd}".as_bytes());
    assert!(decoded.is_replacement());
    assert!(reader.read_char().unwrap().is_none());

    // A genuine U+FFFD in the input isn't a replacement.
    let mut reader = CharReader::new("\u{fffd}".as_bytes());
    assert!(!reader.read_char().unwrap().unwrap().is_replacement());
}

#[test]
fn test_split_across_reads() {
    let chunks = [
        Ok(&b"x\xe2"[..]),
        Ok(&b"\x82"[..]),
        Ok(&b"\xacy\xf0\x9f"[..]),
        Ok(&b"\x98\x80"[..]),
    ];
    let reader = CharReader::new(Trickle {
        chunks: chunks.iter(),
    });
    let decoded = reader.collect::<io::Result<Vec<_>>>().unwrap();
    let got = decoded
        .iter()
        .map(|d| (d.char(), d.as_bytes().len()))
        .collect::<Vec<_>>();
    assert_eq!(got, vec![('x', 1), ('€', 3), ('y', 1), ('\u{1f600}', 4)]);
}

#[test]
fn test_interrupted() {
    let chunks = [
        Ok(&b"a"[..]),
        Err(io::Error::new(io::ErrorKind::Interrupted, "signal")),
        Ok(&b"b"[..]),
    ];
    let reader = CharReader::new(Trickle {
        chunks: chunks.iter(),
    });
    let got = reader
        .map(|d| d.map(|d| d.char()))
        .collect::<io::Result<String>>()
        .unwrap();
    assert_eq!(got, "ab");
}

#[test]
fn test_read_error() {
    let chunks = [
        Ok(&b"a"[..]),
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "nope")),
    ];
    let mut reader = CharReader::new(Trickle {
        chunks: chunks.iter(),
    });
    assert_eq!(reader.read_char().unwrap().unwrap().char(), 'a');
    let error = reader.read_char().unwrap_err();
    assert_eq!(error.kind(), io::ErrorKind::PermissionDenied);
}

#[test]
fn test_larger_than_buffer() {
    let input = "ab€".repeat(BUFFER_SIZE);
    let got = CharReader::new(input.as_bytes())
        .map(|d| d.map(|d| d.char()))
        .collect::<io::Result<String>>()
        .unwrap();
    assert_eq!(got, input);
}

#[test]
fn test_into_inner() {
    let input = b"ab";
    let mut reader = CharReader::new(io::Cursor::new(&input[..]));
    assert_eq!(reader.get_ref().position(), 0);
    assert_eq!(reader.read_char().unwrap().unwrap().char(), 'a');
    // The whole input was buffered by the first read.
    assert_eq!(reader.into_inner().position(), 2);
}

use crate::{flush_action, CharReader, Error, Output, Patience};
use std::{io, thread, time::Duration};
use tracing::{debug, trace};

/// Something that can wait for a while.
pub trait Sleep {
    /// Block the calling thread for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// [`Sleep`] using [`std::thread::sleep`].
#[derive(Copy, Clone, Debug, Default)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    #[inline]
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration)
    }
}

/// Copy the characters of `input` to `output` one at a time, flushing after
/// each one and then waiting as long as `patience` says before moving on.
///
/// Returns when `input` is exhausted. A failure to write a character stops
/// the copy immediately, before the character is flushed or waited for.
/// Flush failures are ignored.
pub fn copy_chars_with_patience<O, R, P>(
    output: &mut O,
    input: &mut R,
    patience: &mut P,
) -> Result<(), Error>
where
    O: Output + ?Sized,
    R: io::Read + ?Sized,
    P: Patience + ?Sized,
{
    copy_chars_with_patience_and_sleep(output, input, patience, &mut ThreadSleep)
}

/// Like [`copy_chars_with_patience`], but waits using `sleeper`.
pub fn copy_chars_with_patience_and_sleep<O, R, P, S>(
    output: &mut O,
    input: &mut R,
    patience: &mut P,
    sleeper: &mut S,
) -> Result<(), Error>
where
    O: Output + ?Sized,
    R: io::Read + ?Sized,
    P: Patience + ?Sized,
    S: Sleep + ?Sized,
{
    let (flushing, flush) = flush_action(output);
    debug!(?flushing, "copying patiently");

    let mut count = 0_u64;
    for decoded in CharReader::new(input) {
        let decoded = decoded.map_err(Error::Read)?;
        output.write_all(decoded.as_bytes()).map_err(Error::Write)?;
        flush(output);

        let delay = patience.delay(decoded.char());
        trace!(c = ?decoded.char(), ?delay, "wrote character");
        sleeper.sleep(delay);
        count += 1;
    }

    debug!(count, "input exhausted");
    Ok(())
}

#[cfg(test)]
use crate::{BePatient, Flushing, Params, PrintImpatiently, Unflushed};

#[cfg(test)]
#[derive(Default)]
struct Recorder {
    delays: Vec<Duration>,
}

#[cfg(test)]
impl Sleep for Recorder {
    fn sleep(&mut self, duration: Duration) {
        self.delays.push(duration);
    }
}

/// An output which records each write and flush separately.
#[cfg(test)]
#[derive(Default)]
struct Log {
    events: Vec<Event>,
    fail_on: Option<u8>,
}

#[cfg(test)]
#[derive(Debug, Eq, PartialEq)]
enum Event {
    Write(Vec<u8>),
    Flush,
}

#[cfg(test)]
impl io::Write for Log {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.first() == self.fail_on.as_ref() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        }
        self.events.push(Event::Write(buf.to_vec()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.events.push(Event::Flush);
        Ok(())
    }
}

#[cfg(test)]
impl Output for Log {
    fn flushing(&self) -> Flushing {
        Flushing::Fallible
    }
}

/// An output which only knows how to sync, and counts how often it does.
#[cfg(test)]
#[derive(Default)]
struct Synced {
    bytes: Vec<u8>,
    syncs: usize,
    broken: bool,
}

#[cfg(test)]
impl io::Write for Synced {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        panic!("a syncing output must not be flushed");
    }
}

#[cfg(test)]
impl Output for Synced {
    fn flushing(&self) -> Flushing {
        Flushing::Sync
    }

    fn sync(&mut self) -> io::Result<()> {
        self.syncs += 1;
        if self.broken {
            Err(io::Error::new(io::ErrorKind::InvalidInput, "can't sync a pipe"))
        } else {
            Ok(())
        }
    }
}


#[cfg(test)]
fn zero() -> BePatient {
    BePatient::new(Params::new(Duration::ZERO, Duration::ZERO, 3).unwrap())
}

#[test]
fn test_lossless() {
    let mut output: Vec<u8> = Vec::new();
    copy_chars_with_patience(&mut output, &mut &b"AB"[..], &mut zero()).unwrap();
    assert_eq!(output, b"AB");
}

#[test]
fn test_delays() {
    let mut output: Vec<u8> = Vec::new();
    let mut sleeper = Recorder::default();
    let mut patience = BePatient::new(Params::default());
    copy_chars_with_patience_and_sleep(
        &mut output,
        &mut "AH€".as_bytes(),
        &mut patience,
        &mut sleeper,
    )
    .unwrap();
    assert_eq!(output, "AH€".as_bytes());
    assert_eq!(
        sleeper.delays,
        vec![
            Duration::from_millis(1100),
            Duration::from_millis(1000),
            Duration::from_millis(1400),
        ]
    );
}

#[test]
fn test_multibyte_is_one_write() {
    let mut output = Log::default();
    copy_chars_with_patience_and_sleep(
        &mut output,
        &mut "€A".as_bytes(),
        &mut zero(),
        &mut Recorder::default(),
    )
    .unwrap();
    assert_eq!(
        output.events,
        vec![
            Event::Write("€".as_bytes().to_vec()),
            Event::Flush,
            Event::Write(b"A".to_vec()),
            Event::Flush,
        ]
    );
}

#[test]
fn test_syncs_once_per_char() {
    let mut output = Synced::default();
    let mut sleeper = Recorder::default();
    copy_chars_with_patience_and_sleep(
        &mut output,
        &mut "a€b".as_bytes(),
        &mut zero(),
        &mut sleeper,
    )
    .unwrap();
    assert_eq!(output.bytes, "a€b".as_bytes());
    assert_eq!(output.syncs, 3);
    assert_eq!(sleeper.delays.len(), 3);
}

#[test]
fn test_sync_failure_is_ignored() {
    let mut output = Synced {
        broken: true,
        ..Synced::default()
    };
    copy_chars_with_patience_and_sleep(
        &mut output,
        &mut &b"xyz"[..],
        &mut zero(),
        &mut Recorder::default(),
    )
    .unwrap();
    assert_eq!(output.bytes, b"xyz");
    assert_eq!(output.syncs, 3);
}

#[test]
fn test_unflushed_writer() {
    // A writer with no `Output` impl of its own, which would record a flush.
    struct Plain(Log);
    impl io::Write for Plain {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            io::Write::write(&mut self.0, buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            io::Write::flush(&mut self.0)
        }
    }

    let mut output = Unflushed::new(Plain(Log::default()));
    copy_chars_with_patience_and_sleep(
        &mut output,
        &mut "h€".as_bytes(),
        &mut zero(),
        &mut Recorder::default(),
    )
    .unwrap();
    assert_eq!(
        output.into_inner().0.events,
        vec![
            Event::Write(b"h".to_vec()),
            Event::Write("€".as_bytes().to_vec()),
        ]
    );
}

#[test]
fn test_cursor_output() {
    let mut output = io::Cursor::new(Vec::<u8>::new());
    copy_chars_with_patience_and_sleep(
        &mut output,
        &mut &b"AB"[..],
        &mut zero(),
        &mut Recorder::default(),
    )
    .unwrap();
    assert_eq!(output.into_inner(), b"AB");
}

#[test]
fn test_invalid_input() {
    let mut output: Vec<u8> = Vec::new();
    let mut sleeper = Recorder::default();
    copy_chars_with_patience_and_sleep(
        &mut output,
        &mut &b"a\xffb"[..],
        &mut zero(),
        &mut sleeper,
    )
    .unwrap();
    assert_eq!(output, "a\u{fffd}b".as_bytes());
    assert_eq!(sleeper.delays.len(), 3);
}

#[test]
fn test_write_failure_stops() {
    let mut output = Log {
        events: Vec::new(),
        fail_on: Some(b'C'),
    };
    let mut sleeper = Recorder::default();
    let mut seen = Vec::new();
    let mut patience = |c: char| {
        seen.push(c);
        Duration::from_millis(1)
    };
    let result = copy_chars_with_patience_and_sleep(
        &mut output,
        &mut &b"ABCDE"[..],
        &mut patience,
        &mut sleeper,
    );
    match result {
        Err(Error::Write(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(
        output.events,
        vec![
            Event::Write(b"A".to_vec()),
            Event::Flush,
            Event::Write(b"B".to_vec()),
            Event::Flush,
        ]
    );
    assert_eq!(sleeper.delays.len(), 2);
    assert_eq!(seen, vec!['A', 'B']);
}

#[test]
fn test_read_failure() {
    struct Failing(bool);
    impl io::Read for Failing {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0 {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "bad disk"));
            }
            self.0 = true;
            buf[0] = b'x';
            Ok(1)
        }
    }

    let mut output: Vec<u8> = Vec::new();
    let result = copy_chars_with_patience_and_sleep(
        &mut output,
        &mut Failing(false),
        &mut zero(),
        &mut Recorder::default(),
    );
    match result {
        Err(Error::Read(e)) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(output, b"x");
}

#[test]
fn test_debug_mode() {
    let plain = BePatient::new(Params::default());
    let mut printing = PrintImpatiently::new(plain, Vec::<u8>::new());
    let mut sleeper = Recorder::default();
    copy_chars_with_patience_and_sleep(
        &mut io::sink(),
        &mut &b"A"[..],
        &mut printing,
        &mut sleeper,
    )
    .unwrap();
    let (_, diagnostics) = printing.into_inner();
    assert_eq!(String::from_utf8(diagnostics).unwrap(), "\"A\" U+0041 1.1s\n");
    assert_eq!(sleeper.delays, vec![plain.delay_for('A')]);
}

#[test]
fn test_thread_sleep() {
    let mut output: Vec<u8> = Vec::new();
    copy_chars_with_patience(&mut output, &mut "héllo\n".as_bytes(), &mut zero()).unwrap();
    assert_eq!(output, "héllo\n".as_bytes());
}

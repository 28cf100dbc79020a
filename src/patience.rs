use crate::{Error, Params};
use std::{
    fmt,
    io::{self, Write},
    time::Duration,
};
use tracing::warn;

/// Something that decides how long to wait after writing a character.
///
/// Any `FnMut(char) -> Duration` closure is a `Patience`, so decorators can
/// be written either as types, like [`PrintImpatiently`], or as closures.
pub trait Patience {
    /// Return the delay to observe after `c` has been written.
    fn delay(&mut self, c: char) -> Duration;
}

impl<F: FnMut(char) -> Duration> Patience for F {
    #[inline]
    fn delay(&mut self, c: char) -> Duration {
        self(c)
    }
}

/// The plain delay function: `base + step * (mask & c)`.
///
/// The mask applies to the whole code point, so characters beyond Latin-1
/// still select one of the `1 << bits` evenly spaced delays.
#[derive(Copy, Clone, Debug)]
pub struct BePatient {
    params: Params,
}

impl BePatient {
    /// Construct a new instance of `BePatient` from validated parameters.
    #[inline]
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// The parameters this delay function was constructed with.
    #[inline]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Compute the delay for `c`. Unlike [`Patience::delay`] this doesn't
    /// need `&mut self`.
    #[inline]
    pub fn delay_for(&self, c: char) -> Duration {
        let k = self.params.mask() & u32::from(c);
        self.params
            .base()
            .saturating_add(self.params.step().saturating_mul(k))
    }
}

impl Patience for BePatient {
    #[inline]
    fn delay(&mut self, c: char) -> Duration {
        self.delay_for(c)
    }
}

/// Construct a [`BePatient`] directly from its three parameters.
///
/// Fails with [`Error::TooManyBits`] if `bits` is 8 or more.
pub fn be_patient(bits: u32, base: Duration, step: Duration) -> Result<BePatient, Error> {
    Params::new(base, step, bits).map(BePatient::new)
}

/// A `Patience` decorator which prints each character, its code point, and
/// the delay chosen for it to `dst`, and returns exactly the delay the
/// wrapped `Patience` chose.
///
/// Records look like `"A" U+0041 1.1s`, one per line. Delays are spelled
/// the way Go spells durations: `0s`, `1ns`, `1.5ms`, `1m30s`.
pub struct PrintImpatiently<Inner: Patience, Dst: io::Write> {
    inner: Inner,
    dst: Dst,
}

impl<Inner: Patience, Dst: io::Write> PrintImpatiently<Inner, Dst> {
    /// Construct a new instance of `PrintImpatiently` wrapping `inner` and
    /// printing to `dst`.
    #[inline]
    pub fn new(inner: Inner, dst: Dst) -> Self {
        Self { inner, dst }
    }

    /// Gets a mutable reference to the diagnostic destination.
    pub fn get_mut(&mut self) -> &mut Dst {
        &mut self.dst
    }

    /// Return the wrapped `Patience` and the diagnostic destination.
    pub fn into_inner(self) -> (Inner, Dst) {
        (self.inner, self.dst)
    }
}

impl<Inner: Patience, Dst: io::Write> Patience for PrintImpatiently<Inner, Dst> {
    fn delay(&mut self, c: char) -> Duration {
        let delay = self.inner.delay(c);

        let mut buf = [0_u8; 4];
        let quoted: &str = c.encode_utf8(&mut buf);
        let record = writeln!(
            self.dst,
            "{:?} U+{:04X} {}",
            quoted,
            u32::from(c),
            GoDuration(delay)
        );
        if let Err(error) = record {
            // The record is lost, but the pacing isn't.
            warn!(%error, "failed to print delay for {:?}", c);
        }

        delay
    }
}

/// Displays a `Duration` in Go's notation.
struct GoDuration(Duration);

impl fmt::Display for GoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NANOS_PER_SEC: u128 = 1_000_000_000;

        let nanos = self.0.as_nanos();
        if nanos == 0 {
            return f.write_str("0s");
        }
        if nanos < NANOS_PER_SEC {
            let (unit, scale, digits) = if nanos < 1_000 {
                ("ns", 1, 0)
            } else if nanos < 1_000_000 {
                ("\u{b5}s", 1_000, 3)
            } else {
                ("ms", 1_000_000, 6)
            };
            write!(f, "{}", nanos / scale)?;
            write_fraction(f, nanos % scale, digits)?;
            return f.write_str(unit);
        }

        let secs = nanos / NANOS_PER_SEC;
        let (hours, minutes, secs) = (secs / 3600, secs / 60 % 60, secs % 60);
        if hours != 0 {
            write!(f, "{}h", hours)?;
        }
        if hours != 0 || minutes != 0 {
            write!(f, "{}m", minutes)?;
        }
        write!(f, "{}", secs)?;
        write_fraction(f, nanos % NANOS_PER_SEC, 9)?;
        f.write_str("s")
    }
}

/// Write `.fraction` zero-padded to `digits` digits, without trailing zeros.
fn write_fraction(f: &mut fmt::Formatter<'_>, fraction: u128, digits: usize) -> fmt::Result {
    if fraction == 0 {
        return Ok(());
    }
    let padded = format!("{:0width$}", fraction, width = digits);
    write!(f, ".{}", padded.trim_end_matches('0'))
}

#[cfg(test)]
fn params(base_ms: u64, step_ms: u64, bits: u32) -> Params {
    Params::new(
        Duration::from_millis(base_ms),
        Duration::from_millis(step_ms),
        bits,
    )
    .unwrap()
}

#[test]
fn test_formula() {
    let mut p = BePatient::new(Params::default());
    assert_eq!(p.delay('A'), Duration::from_millis(1100)); // 0x41 & 7 == 1
    assert_eq!(p.delay('G'), Duration::from_millis(1700)); // 0x47 & 7 == 7
    assert_eq!(p.delay('H'), Duration::from_secs(1)); // 0x48 & 7 == 0
    assert_eq!(p.delay('\n'), Duration::from_millis(1200)); // 0x0a & 7 == 2
}

#[test]
fn test_distinct_delays() {
    for bits in 0..=crate::MAX_BITS {
        let p = BePatient::new(params(10, 3, bits));
        let mut seen = std::collections::BTreeSet::new();
        // Every value of the low byte, in both the ASCII plane and well
        // beyond Latin-1.
        for base in &[0_u32, 0x1f600] {
            for low in 0..=0xff {
                seen.insert(p.delay_for(char::from_u32(base + low).unwrap()));
            }
        }
        let expected = (0..(1_u32 << bits))
            .map(|k| Duration::from_millis(10) + Duration::from_millis(3) * k)
            .collect::<std::collections::BTreeSet<_>>();
        assert_eq!(seen, expected, "bits = {}", bits);
    }
}

#[test]
fn test_beyond_latin1() {
    let p = BePatient::new(params(0, 1, 3));
    // U+20AC EURO SIGN: 0x20ac & 7 == 4.
    assert_eq!(p.delay_for('€'), Duration::from_millis(4));
    // U+1F600: 0x1f600 & 7 == 0.
    assert_eq!(p.delay_for('\u{1f600}'), Duration::ZERO);
    assert_eq!(p.delay_for(char::MAX), Duration::from_millis(7));
}

#[test]
fn test_pure() {
    let mut p = BePatient::new(params(5, 7, 5));
    for c in "hello, wörld ✓".chars() {
        assert_eq!(p.delay(c), p.delay(c));
    }
}

#[test]
fn test_saturates() {
    let p = BePatient::new(Params::new(Duration::MAX, Duration::MAX, 7).unwrap());
    assert_eq!(p.delay_for('\x7f'), Duration::MAX);
    assert_eq!(p.delay_for('\0'), Duration::MAX);
}

#[test]
fn test_be_patient() {
    assert!(be_patient(7, Duration::ZERO, Duration::ZERO).is_ok());
    assert!(matches!(
        be_patient(8, Duration::ZERO, Duration::ZERO),
        Err(Error::TooManyBits(8))
    ));
}

#[test]
fn test_closure() {
    let mut calls = Vec::new();
    let mut p = |c: char| {
        calls.push(c);
        Duration::from_millis(u64::from(u32::from(c)))
    };
    assert_eq!(Patience::delay(&mut p, 'a'), Duration::from_millis(97));
    assert_eq!(calls, vec!['a']);
}

#[test]
fn test_print_impatiently_is_transparent() {
    let plain = BePatient::new(Params::default());
    let mut printing = PrintImpatiently::new(plain, Vec::<u8>::new());
    for c in "AB\u{e9}\u{20ac}\n\u{1f600}".chars() {
        assert_eq!(printing.delay(c), plain.delay_for(c));
    }
}

#[test]
fn test_print_impatiently_record() {
    let mut printing = PrintImpatiently::new(BePatient::new(Params::default()), Vec::<u8>::new());
    printing.delay('A');
    printing.delay('\n');
    printing.delay('\u{1f600}');
    let (_, out) = printing.into_inner();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "\"A\" U+0041 1.1s\n\"\\n\" U+000A 1.2s\n\"\u{1f600}\" U+1F600 1s\n"
    );
}

#[test]
fn test_go_duration() {
    let cases = [
        (Duration::ZERO, "0s"),
        (Duration::from_nanos(1), "1ns"),
        (Duration::from_micros(4), "4\u{b5}s"),
        (Duration::from_nanos(1_500), "1.5\u{b5}s"),
        (Duration::from_micros(1_500), "1.5ms"),
        (Duration::from_millis(100), "100ms"),
        (Duration::from_secs(1), "1s"),
        (Duration::from_millis(1_100), "1.1s"),
        (Duration::from_secs(90), "1m30s"),
        (Duration::from_secs(3600), "1h0m0s"),
        (Duration::new(3723, 4_000_000), "1h2m3.004s"),
    ];
    for (duration, expected) in &cases {
        assert_eq!(GoDuration(*duration).to_string(), *expected);
    }
}

#[test]
fn test_print_impatiently_zero_delay() {
    let zero = BePatient::new(params(0, 0, 3));
    let mut printing = PrintImpatiently::new(zero, Vec::<u8>::new());
    printing.delay('A');
    assert_eq!(printing.get_mut().as_slice(), b"\"A\" U+0041 0s\n");
    assert_eq!(printing.into_inner().0.params(), &params(0, 0, 3));
}

#[test]
fn test_print_impatiently_write_failure() {
    struct Broken;
    impl io::Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "broken"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let mut printing = PrintImpatiently::new(BePatient::new(Params::default()), Broken);
    assert_eq!(printing.delay('A'), Duration::from_millis(1100));
}

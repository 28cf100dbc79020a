use crate::Error;
use std::time::Duration;

/// The largest number of low-order code point bits a mask may select.
pub const MAX_BITS: u32 = 7;

/// The default minimum delay per character.
pub const DEFAULT_BASE: Duration = Duration::from_secs(1);

/// The default delay added per unit of masked code point.
pub const DEFAULT_STEP: Duration = Duration::from_millis(100);

/// The default number of code point bits used to scale the delay.
pub const DEFAULT_BITS: u32 = 3;

/// The immutable parameters of a delay function.
///
/// Construct with [`Params::new`], which rejects bit widths the mask can't
/// represent, so every `Params` value is valid.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Params {
    base: Duration,
    step: Duration,
    bits: u32,
    mask: u32,
}

impl Params {
    /// Validate and construct a new `Params`.
    ///
    /// Fails with [`Error::TooManyBits`] if `bits` is greater than
    /// [`MAX_BITS`].
    pub fn new(base: Duration, step: Duration, bits: u32) -> Result<Self, Error> {
        if bits > MAX_BITS {
            return Err(Error::TooManyBits(bits));
        }
        Ok(Self {
            base,
            step,
            bits,
            mask: (1 << bits) - 1,
        })
    }

    /// The minimum per-character delay.
    #[inline]
    pub fn base(&self) -> Duration {
        self.base
    }

    /// The delay added per unit of masked code point.
    #[inline]
    pub fn step(&self) -> Duration {
        self.step
    }

    /// The number of low-order code point bits used.
    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// `(1 << bits) - 1`.
    #[inline]
    pub fn mask(&self) -> u32 {
        self.mask
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE,
            step: DEFAULT_STEP,
            bits: DEFAULT_BITS,
            mask: (1 << DEFAULT_BITS) - 1,
        }
    }
}

#[test]
fn test_mask() {
    for bits in 0..=MAX_BITS {
        let params = Params::new(Duration::ZERO, Duration::ZERO, bits).unwrap();
        assert_eq!(params.mask(), (1_u32 << bits) - 1);
        assert_eq!(params.bits(), bits);
    }
    assert_eq!(
        Params::new(Duration::ZERO, Duration::ZERO, 0).unwrap().mask(),
        0
    );
    assert_eq!(
        Params::new(Duration::ZERO, Duration::ZERO, 7).unwrap().mask(),
        0x7f
    );
}

#[test]
fn test_too_many_bits() {
    for bits in &[8, 9, 31, 32, u32::MAX] {
        match Params::new(DEFAULT_BASE, DEFAULT_STEP, *bits) {
            Err(Error::TooManyBits(b)) => assert_eq!(b, *bits),
            other => panic!("unexpected result for {} bits: {:?}", bits, other),
        }
    }
}

#[test]
fn test_default() {
    let params = Params::default();
    assert_eq!(
        params,
        Params::new(DEFAULT_BASE, DEFAULT_STEP, DEFAULT_BITS).unwrap()
    );
    assert_eq!(params.base(), Duration::from_secs(1));
    assert_eq!(params.step(), Duration::from_millis(100));
    assert_eq!(params.mask(), 7);
}

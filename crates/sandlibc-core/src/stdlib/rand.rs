//! `rand`/`srand` over a splitmix32 generator.

/// Largest value [`Rand::next`] returns.
pub const RAND_MAX: i32 = 0x7fff_ffff;

const GOLDEN_GAMMA: u32 = 0x9e37_79b9;
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Seedable pseudo-random sequence. Not for cryptographic use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rand {
    state: u32,
}

impl Rand {
    /// Generator in the state `srand(seed)` leaves it in.
    #[must_use]
    pub const fn with_seed(seed: u32) -> Self {
        Self { state: seed }
    }

    /// `srand`.
    pub fn seed(&mut self, seed: u32) {
        self.state = seed;
    }

    /// `rand`: next value in `0..=RAND_MAX`.
    ///
    /// The mixed word is read as a fraction of 2^32 and scaled to
    /// `RAND_MAX`, truncating.
    pub fn next(&mut self) -> i32 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 16)).wrapping_mul(0x21f0_aaad);
        z = (z ^ (z >> 15)).wrapping_mul(0x735a_2d97);
        z ^= z >> 15;
        (f64::from(z) / TWO_POW_32 * f64::from(RAND_MAX)) as i32
    }
}

impl Default for Rand {
    /// Unseeded programs behave as if `srand(1)` had been called.
    fn default() -> Self {
        Self::with_seed(1)
    }
}

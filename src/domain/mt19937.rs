//! Legacy Mersenne Twister (MT19937)
//!
//! Seeding (`init_genrand`), 53-bit uniform doubles built from two 32-bit
//! outputs, and polar-method normal draws with a cached second value.
//! The published reference traffic figures were generated with exactly
//! this stream, so every step here is bit-for-bit significant.

use rand::{Error, RngCore, SeedableRng};

const N: usize = 624;
const M: usize = 397;
const MATRIX_A: u32 = 0x9908_b0df;
const UPPER_MASK: u32 = 0x8000_0000;
const LOWER_MASK: u32 = 0x7fff_ffff;

/// Mersenne Twister state with the polar-method gaussian cache
#[derive(Clone)]
pub struct Mt19937 {
    key: [u32; N],
    pos: usize,
    cached_gauss: Option<f64>,
}

impl Mt19937 {
    /// Seed the generator with a 32-bit value (`init_genrand`)
    pub fn new(seed: u32) -> Self {
        let mut key = [0u32; N];
        key[0] = seed;
        for i in 1..N {
            let prev = key[i - 1];
            key[i] = 1_812_433_253u32.wrapping_mul(prev ^ (prev >> 30)).wrapping_add(i as u32);
        }
        Self { key, pos: N, cached_gauss: None }
    }

    fn reload(&mut self) {
        for i in 0..N {
            let y = (self.key[i] & UPPER_MASK) | (self.key[(i + 1) % N] & LOWER_MASK);
            let mut next = self.key[(i + M) % N] ^ (y >> 1);
            if y & 1 != 0 {
                next ^= MATRIX_A;
            }
            self.key[i] = next;
        }
        self.pos = 0;
    }

    /// Next tempered 32-bit output
    pub fn next_word(&mut self) -> u32 {
        if self.pos >= N {
            self.reload();
        }
        let mut y = self.key[self.pos];
        self.pos += 1;

        y ^= y >> 11;
        y ^= (y << 7) & 0x9d2c_5680;
        y ^= (y << 15) & 0xefc6_0000;
        y ^= y >> 18;
        y
    }

    /// Uniform double in [0, 1) with 53 bits of precision
    pub fn next_f64(&mut self) -> f64 {
        let a = self.next_word() >> 5;
        let b = self.next_word() >> 6;
        (f64::from(a) * 67_108_864.0 + f64::from(b)) / 9_007_199_254_740_992.0
    }

    /// Standard normal draw (Marsaglia polar method)
    ///
    /// Each accepted pair yields two values: the second is cached and
    /// returned by the following call without consuming the stream.
    pub fn next_gauss(&mut self) -> f64 {
        if let Some(cached) = self.cached_gauss.take() {
            return cached;
        }

        let (x1, x2, r2) = loop {
            let x1 = 2.0 * self.next_f64() - 1.0;
            let x2 = 2.0 * self.next_f64() - 1.0;
            let r2 = x1 * x1 + x2 * x2;
            if r2 < 1.0 && r2 != 0.0 {
                break (x1, x2, r2);
            }
        };

        let f = (-2.0 * r2.ln() / r2).sqrt();
        self.cached_gauss = Some(f * x1);
        f * x2
    }

    /// Normal draw with the given mean and standard deviation
    pub fn next_normal(&mut self, loc: f64, scale: f64) -> f64 {
        loc + scale * self.next_gauss()
    }
}

impl RngCore for Mt19937 {
    fn next_u32(&mut self) -> u32 {
        self.next_word()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = u64::from(self.next_word());
        let hi = u64::from(self.next_word());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_word().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Mt19937 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

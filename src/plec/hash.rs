//! Deterministic 32-bit hashing and folding.
//!
//! Fingerprints must be identical across runs, threads and platforms, so the
//! std `Hasher` (randomly seeded) is not an option.

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a over little-endian words with a murmur3 finalizer.
#[derive(Clone, Copy, Debug)]
pub struct Hasher32(u32);

impl Default for Hasher32 {
    fn default() -> Self {
        Self(FNV_OFFSET)
    }
}

impl Hasher32 {
    /// Hasher in its initial state
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one word
    pub fn write_u32(&mut self, value: u32) {
        for byte in value.to_le_bytes() {
            self.0 ^= u32::from(byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    /// Feed one signed word, bit for bit
    pub fn write_i32(&mut self, value: i32) {
        self.write_u32(value as u32);
    }

    /// Final mixed hash of everything written so far
    pub fn finish(&self) -> u32 {
        let mut h = self.0;
        h ^= h >> 16;
        h = h.wrapping_mul(0x85eb_ca6b);
        h ^= h >> 13;
        h = h.wrapping_mul(0xc2b2_ae35);
        h ^= h >> 16;
        h
    }
}

/// Hash an ordered sequence of words.
pub fn hash_u32s(values: &[u32]) -> u32 {
    let mut hasher = Hasher32::new();
    values.iter().for_each(|&v| hasher.write_u32(v));
    hasher.finish()
}

/// Map a 32-bit hash onto `[0, size)` by scaling, `floor(hash * size / 2^32)`.
///
/// `size` must not exceed `u32::MAX`, as enforced by `PlecSettings::validate`.
pub fn fold(hash: u32, size: usize) -> usize {
    ((u64::from(hash) * size as u64) >> 32) as usize
}

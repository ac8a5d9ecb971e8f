use hmac::{Hmac, Mac};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use sha2::Sha256;
use std::collections::VecDeque;

pub type HmacSha256 = Hmac<Sha256>;

/// A source of uniformly distributed integers.
///
/// Every reel draw asks for one value in `[0, bound)`; `bound` is always
/// positive. Implementations carry whatever state they need, but the
/// generator consuming them keeps none between draws.
pub trait UniformSource: Send {
    fn next_below(&mut self, bound: u64) -> u64;
}

impl<S: UniformSource + ?Sized> UniformSource for Box<S> {
    fn next_below(&mut self, bound: u64) -> u64 {
        (**self).next_below(bound)
    }
}

/// Adapter for any `rand` generator.
#[derive(Debug, Clone)]
pub struct RandSource<R>(pub R);

impl RandSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore + Send> UniformSource for RandSource<R> {
    fn next_below(&mut self, bound: u64) -> u64 {
        debug_assert!(bound > 0);
        self.0.gen_range(0..bound)
    }
}

pub fn derive_hash_hex(input: &[u8]) -> String {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// Reproducible stream keyed by a secret seed.
///
/// Block `k` is `HMAC-SHA256(seed, "nonce:k")`; each block yields four
/// big-endian `u64` words, scaled into the requested range with a
/// multiply-shift. The same seed and nonce always replay the same draws.
pub struct HmacSource {
    seed: String,
    nonce: u64,
    counter: u64,
    block: [u8; 32],
    offset: usize,
}

impl HmacSource {
    pub fn new(seed: impl Into<String>, nonce: u64) -> Self {
        let seed = seed.into();
        let block = hmac_block(&seed, nonce, 0);
        Self {
            seed,
            nonce,
            counter: 0,
            block,
            offset: 0,
        }
    }

    /// Hex SHA-256 of the seed, safe to publish before the seed is revealed.
    pub fn seed_hash_hex(&self) -> String {
        derive_hash_hex(self.seed.as_bytes())
    }

    fn next_word(&mut self) -> u64 {
        if self.offset + 8 > self.block.len() {
            self.counter += 1;
            self.block = hmac_block(&self.seed, self.nonce, self.counter);
            self.offset = 0;
        }
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.block[self.offset..self.offset + 8]);
        self.offset += 8;
        u64::from_be_bytes(word)
    }
}

fn hmac_block(seed: &str, nonce: u64, counter: u64) -> [u8; 32] {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = HmacSha256::new_from_slice(seed.as_bytes()).expect("HMAC key");
    mac.update(format!("{nonce}:{counter}").as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

impl UniformSource for HmacSource {
    fn next_below(&mut self, bound: u64) -> u64 {
        debug_assert!(bound > 0);
        let word = self.next_word();
        ((word as u128 * bound as u128) >> 64) as u64
    }
}

/// Replays a fixed list of values, cycling when exhausted. Each value is
/// reduced modulo the requested bound.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    values: VecDeque<u64>,
}

impl ScriptedSource {
    pub fn new(values: impl IntoIterator<Item = u64>) -> Self {
        let values: VecDeque<u64> = values.into_iter().collect();
        assert!(!values.is_empty(), "scripted source needs at least one value");
        Self { values }
    }
}

impl UniformSource for ScriptedSource {
    fn next_below(&mut self, bound: u64) -> u64 {
        debug_assert!(bound > 0);
        let v = self.values.pop_front().unwrap_or_default();
        self.values.push_back(v);
        v % bound
    }
}
